//! Remembered location operations

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{millis_column, Database};
use crate::error::Result;
use crate::models::{LocationPatch, NewRememberedLocation, RememberedLocation};
use crate::store::LocationStore;

const LOCATION_COLUMNS: &str =
    "id, owner, latitude, longitude, amount, category_id, name, visit_count, created_at";

fn row_to_location(row: &rusqlite::Row<'_>) -> rusqlite::Result<RememberedLocation> {
    Ok(RememberedLocation {
        id: row.get(0)?,
        owner: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        amount: row.get(4)?,
        category_id: row.get(5)?,
        name: row.get(6)?,
        visit_count: row.get(7)?,
        created_at: millis_column(row, 8)?,
    })
}

impl LocationStore for Database {
    fn owner_locations(&self, owner: &str) -> Result<Vec<RememberedLocation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM remembered_locations WHERE owner = ? ORDER BY id",
            LOCATION_COLUMNS
        ))?;

        let locations = stmt
            .query_map(params![owner], row_to_location)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(locations)
    }

    fn fetch_location(&self, id: i64) -> Result<Option<RememberedLocation>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM remembered_locations WHERE id = ?",
                LOCATION_COLUMNS
            ),
            params![id],
            row_to_location,
        )
        .optional()
        .map_err(Into::into)
    }

    fn insert_location(&self, location: &NewRememberedLocation) -> Result<i64> {
        let conn = self.conn()?;
        insert_location_on(&conn, location)
    }

    fn patch_location(
        &self,
        id: i64,
        expected_visit_count: i64,
        patch: &LocationPatch,
    ) -> Result<bool> {
        let conn = self.conn()?;
        patch_location_on(&conn, id, expected_visit_count, patch)
    }
}

pub(super) fn insert_location_on(conn: &Connection, location: &NewRememberedLocation) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO remembered_locations
            (owner, latitude, longitude, amount, category_id, name, visit_count, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?)
        "#,
        params![
            location.owner,
            location.latitude,
            location.longitude,
            location.amount,
            location.category_id,
            location.name,
            Utc::now().timestamp_millis(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Conditional update; false when the visit count no longer matches
pub(super) fn patch_location_on(
    conn: &Connection,
    id: i64,
    expected_visit_count: i64,
    patch: &LocationPatch,
) -> Result<bool> {
    let updated = conn.execute(
        r#"
        UPDATE remembered_locations
        SET latitude = ?, longitude = ?, amount = ?, category_id = ?, name = ?, visit_count = ?
        WHERE id = ? AND visit_count = ?
        "#,
        params![
            patch.latitude,
            patch.longitude,
            patch.amount,
            patch.category_id,
            patch.name,
            patch.visit_count,
            id,
            expected_visit_count,
        ],
    )?;
    Ok(updated == 1)
}

impl Database {
    /// List `owner`'s remembered locations, most visited first
    pub fn list_locations(&self, owner: &str) -> Result<Vec<RememberedLocation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM remembered_locations WHERE owner = ? ORDER BY visit_count DESC, id",
            LOCATION_COLUMNS
        ))?;

        let locations = stmt
            .query_map(params![owner], row_to_location)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(locations)
    }

    /// Delete one of `owner`'s remembered locations.
    /// Returns false if no such location exists for that owner.
    pub fn delete_location(&self, owner: &str, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM remembered_locations WHERE id = ? AND owner = ?",
            params![id, owner],
        )?;
        Ok(deleted > 0)
    }
}
