//! Record store interface consumed by the location memory and the reports
//!
//! Each method is expected to execute atomically. `Database` is the SQLite
//! implementation shipped with this crate.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Category, LocationPatch, LocationWrite, NewRememberedLocation, NewTransaction,
    RememberedLocation, Transaction,
};

/// Storage for remembered locations
pub trait LocationStore {
    /// All locations owned by `owner`, in a stable (insertion) order
    fn owner_locations(&self, owner: &str) -> Result<Vec<RememberedLocation>>;

    fn fetch_location(&self, id: i64) -> Result<Option<RememberedLocation>>;

    /// Insert with a visit count of 1, returning the new ID
    fn insert_location(&self, location: &NewRememberedLocation) -> Result<i64>;

    /// Apply `patch` only if the stored visit count still equals
    /// `expected_visit_count`. Returns false when nothing was updated.
    fn patch_location(
        &self,
        id: i64,
        expected_visit_count: i64,
        patch: &LocationPatch,
    ) -> Result<bool>;
}

/// Storage for transactions and the categories that label them
pub trait TransactionStore {
    /// Owner's transactions created within `[from, to]` (either bound optional),
    /// oldest first
    fn owner_transactions(
        &self,
        owner: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>>;

    fn owner_categories(&self, owner: &str) -> Result<Vec<Category>>;

    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64>;
}

/// Storage that records a transaction and its location write as one unit
pub trait LedgerStore: LocationStore + TransactionStore {
    /// Insert `tx` and apply `location` together, returning the transaction ID
    /// and the ID of the location written. When a patch's expected visit count
    /// no longer matches, fails with `Error::Conflict` and writes nothing.
    fn record_visit(&self, tx: &NewTransaction, location: &LocationWrite) -> Result<(i64, i64)>;
}
