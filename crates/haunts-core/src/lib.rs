//! Haunts Core Library
//!
//! Shared functionality for the Haunts spending tracker:
//! - Geo distance and bounding-box prefiltering
//! - Location memory: nearest-place lookup and incremental visit merging
//! - Spend aggregation by category and calendar month
//! - Transaction recording that feeds the location memory
//! - Record store interface with a SQLite implementation
//! - Configuration (search radii, report calendar)

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod ledger;
pub mod locations;
pub mod models;
pub mod reports;
pub mod store;

pub use config::{EngineConfig, RadiusConfig};
pub use db::Database;
pub use error::{Error, Result};
pub use ledger::{Ledger, Prefill, RecordedTransaction, Suggestion};
pub use locations::LocationMemory;
pub use reports::{ReportTimeZone, SpendReports};
pub use store::{LedgerStore, LocationStore, TransactionStore};
