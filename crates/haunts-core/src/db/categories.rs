//! Category operations

use chrono::Utc;
use rusqlite::{params, ErrorCode, OptionalExtension};

use super::{millis_column, Database};
use crate::error::{Error, Result};
use crate::models::Category;

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        created_at: millis_column(row, 3)?,
    })
}

impl Database {
    /// Create a category for `owner`; names are unique per owner
    pub fn create_category(&self, owner: &str, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Category name cannot be empty".to_string()));
        }

        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO categories (owner, name, created_at) VALUES (?, ?, ?)",
            params![owner, name, Utc::now().timestamp_millis()],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(Error::Validation(format!("Category already exists: {}", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a category by ID
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, owner, name, created_at FROM categories WHERE id = ?",
            params![id],
            row_to_category,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Look up one of `owner`'s categories by exact name
    pub fn get_category_by_name(&self, owner: &str, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, owner, name, created_at FROM categories WHERE owner = ? AND name = ?",
            params![owner, name.trim()],
            row_to_category,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List `owner`'s categories by name
    pub fn list_categories(&self, owner: &str) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner, name, created_at FROM categories WHERE owner = ? ORDER BY name",
        )?;

        let categories = stmt
            .query_map(params![owner], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Delete one of `owner`'s categories. References to it become uncategorized.
    /// Returns false if no such category exists for that owner.
    pub fn delete_category(&self, owner: &str, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM categories WHERE id = ? AND owner = ?",
            params![id, owner],
        )?;
        Ok(deleted > 0)
    }
}
