//! Recording a transaction together with its location write

use super::locations::{insert_location_on, patch_location_on};
use super::transactions::insert_transaction_on;
use super::Database;
use crate::error::Result;
use crate::locations::merge_conflict;
use crate::models::{LocationWrite, NewTransaction};
use crate::store::LedgerStore;

impl LedgerStore for Database {
    fn record_visit(&self, tx: &NewTransaction, location: &LocationWrite) -> Result<(i64, i64)> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let transaction_id = insert_transaction_on(&db_tx, tx)?;
        let location_id = match location {
            LocationWrite::Insert(new) => insert_location_on(&db_tx, new)?,
            LocationWrite::Patch {
                id,
                expected_visit_count,
                patch,
            } => {
                if !patch_location_on(&db_tx, *id, *expected_visit_count, patch)? {
                    // Dropping `db_tx` rolls the transaction insert back
                    return Err(merge_conflict(*id, *expected_visit_count));
                }
                *id
            }
        };

        db_tx.commit()?;
        Ok((transaction_id, location_id))
    }
}
