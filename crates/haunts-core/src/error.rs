//! Error types for Haunts

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input rejected before touching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing record, or a record owned by someone else
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conditional update lost against a concurrent writer
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
