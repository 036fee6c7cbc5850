//! Transaction operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{millis_column, Database};
use crate::error::{Error, Result};
use crate::models::{Category, NewTransaction, Transaction, TransactionSource};
use crate::store::TransactionStore;

const TRANSACTION_COLUMNS: &str =
    "id, owner, amount, category_id, name, latitude, longitude, source, created_at";

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let source: String = row.get(7)?;
    Ok(Transaction {
        id: row.get(0)?,
        owner: row.get(1)?,
        amount: row.get(2)?,
        category_id: row.get(3)?,
        name: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        source: source.parse().unwrap_or_default(),
        created_at: millis_column(row, 8)?,
    })
}

impl TransactionStore for Database {
    fn owner_transactions(
        &self,
        owner: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        // Build dynamic WHERE clause
        let mut conditions = vec!["owner = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner.to_string())];

        if let Some(from) = from {
            conditions.push("created_at >= ?".to_string());
            // Rows are stored at millisecond resolution; round a finer bound up
            let rounding = i64::from(from.timestamp_subsec_nanos() % 1_000_000 != 0);
            params.push(Box::new(from.timestamp_millis() + rounding));
        }
        if let Some(to) = to {
            conditions.push("created_at <= ?".to_string());
            params.push(Box::new(to.timestamp_millis()));
        }

        let sql = format!(
            "SELECT {} FROM transactions WHERE {} ORDER BY created_at, id",
            TRANSACTION_COLUMNS,
            conditions.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let transactions = stmt
            .query_map(param_refs.as_slice(), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    fn owner_categories(&self, owner: &str) -> Result<Vec<Category>> {
        self.list_categories(owner)
    }

    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;
        insert_transaction_on(&conn, tx)
    }
}

pub(super) fn insert_transaction_on(conn: &Connection, tx: &NewTransaction) -> Result<i64> {
    if tx.latitude.is_some() != tx.longitude.is_some() {
        return Err(Error::Validation(
            "latitude and longitude must be given together".to_string(),
        ));
    }

    let created_at = tx.created_at.unwrap_or_else(Utc::now);
    conn.execute(
        r#"
        INSERT INTO transactions (owner, amount, category_id, name, latitude, longitude, source, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            tx.owner,
            tx.amount,
            tx.category_id,
            tx.name,
            tx.latitude,
            tx.longitude,
            tx.source.as_str(),
            created_at.timestamp_millis(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
            params![id],
            row_to_transaction,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List `owner`'s transactions, newest first
    pub fn list_transactions(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE owner = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![owner, limit, offset], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count `owner`'s transactions by source
    pub fn count_transactions(&self, owner: &str, source: Option<TransactionSource>) -> Result<i64> {
        let conn = self.conn()?;
        let count = match source {
            Some(source) => conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE owner = ? AND source = ?",
                params![owner, source.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE owner = ?",
                params![owner],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }

    /// Delete one of `owner`'s transactions.
    /// Returns false if no such transaction exists for that owner.
    pub fn delete_transaction(&self, owner: &str, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND owner = ?",
            params![id, owner],
        )?;
        Ok(deleted > 0)
    }
}
