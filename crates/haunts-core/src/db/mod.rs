//! SQLite record store with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `categories` - Category CRUD
//! - `ledger` - Transaction + location writes in one SQL transaction (`LedgerStore`)
//! - `locations` - Remembered locations (`LocationStore`)
//! - `transactions` - Transaction CRUD (`TransactionStore`)
//!
//! Timestamps are stored as epoch milliseconds (INTEGER columns).

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::debug;

use crate::error::Result;

mod categories;
mod ledger;
mod locations;
mod transactions;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Read an epoch-millisecond column into a `DateTime<Utc>`
pub(crate) fn millis_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) the database at `path` and bring its schema up to date
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "haunts_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().into_owned();

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the single writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Categories (user-owned labels)
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (owner, name)
            );

            CREATE INDEX IF NOT EXISTS idx_categories_owner ON categories(owner);

            -- Transactions (spend events)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                name TEXT,
                latitude REAL,
                longitude REAL,
                source TEXT NOT NULL DEFAULT 'web',
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_owner_created
                ON transactions(owner, created_at);

            -- Remembered locations (running centroid of repeat visits)
            CREATE TABLE IF NOT EXISTS remembered_locations (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                latitude REAL NOT NULL CHECK (latitude BETWEEN -90 AND 90),
                longitude REAL NOT NULL CHECK (longitude BETWEEN -180 AND 180),
                amount REAL NOT NULL,
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                name TEXT,
                visit_count INTEGER NOT NULL DEFAULT 1 CHECK (visit_count >= 1),
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_remembered_locations_owner
                ON remembered_locations(owner);
            "#,
        )?;

        debug!("Database ready at {}", self.db_path);
        Ok(())
    }
}
