//! Transaction recording with location memory
//!
//! `Ledger::record` stores a transaction and, when it carries a coordinate,
//! folds the visit into the location memory. `Ledger::suggest` answers the
//! "have I been here before?" question asked before a transaction is entered.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RadiusConfig;
use crate::error::{Error, Result};
use crate::geo;
use crate::locations::LocationMemory;
use crate::models::{LocationVisit, MergeOutcome, NearbyLocation, NewTransaction};
use crate::store::{LedgerStore, LocationStore, TransactionStore};

/// Result of recording a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedTransaction {
    pub transaction_id: i64,
    /// Present when the transaction carried a coordinate
    pub location: Option<MergeOutcome>,
}

/// Values to pre-fill from the closest remembered place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefill {
    pub location_id: i64,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub name: Option<String>,
}

/// Remembered places near a coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Closest first
    pub nearby: Vec<NearbyLocation>,
    pub prefill: Option<Prefill>,
}

pub struct Ledger<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    memory: LocationMemory<'a, S>,
}

impl<'a, S: LedgerStore + ?Sized> Ledger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_radii(store, RadiusConfig::default())
    }

    pub fn with_radii(store: &'a S, radius: RadiusConfig) -> Self {
        Self {
            store,
            memory: LocationMemory::with_radii(store, radius),
        }
    }

    /// Record `tx`, merging its coordinate into the location memory
    ///
    /// `place` picks an explicit remembered location to merge into (one the
    /// user chose from [`suggest`](Self::suggest)); it requires a coordinate.
    /// All checks run before anything is written, and the transaction and its
    /// location write land together or not at all.
    pub fn record(&self, tx: &NewTransaction, place: Option<i64>) -> Result<RecordedTransaction> {
        self.validate(tx, place)?;

        let (transaction_id, location) = match tx.coordinate() {
            Some((latitude, longitude)) => {
                let visit = LocationVisit {
                    latitude,
                    longitude,
                    amount: tx.amount,
                    category_id: tx.category_id,
                    name: tx.name.clone(),
                };
                let write = self.memory.plan_visit(&tx.owner, &visit, place)?;
                let (transaction_id, location_id) = self.store.record_visit(tx, &write)?;
                (transaction_id, Some(write.outcome(location_id)))
            }
            None => (self.store.insert_transaction(tx)?, None),
        };
        info!(
            "Recorded transaction {} ({:.2}) for {}",
            transaction_id, tx.amount, tx.owner
        );

        Ok(RecordedTransaction {
            transaction_id,
            location,
        })
    }

    /// Remembered places within the suggestion radius, with a pre-fill hint
    /// taken from the closest one
    pub fn suggest(&self, owner: &str, lat: f64, lon: f64) -> Result<Suggestion> {
        let nearby = self.memory.suggestions(owner, lat, lon)?;
        let prefill = nearby.first().map(|n| Prefill {
            location_id: n.location.id,
            amount: n.location.amount,
            category_id: n.location.category_id,
            name: n.location.name.clone(),
        });
        debug!("{} remembered places near ({}, {})", nearby.len(), lat, lon);

        Ok(Suggestion { nearby, prefill })
    }

    fn validate(&self, tx: &NewTransaction, place: Option<i64>) -> Result<()> {
        if !tx.amount.is_finite() || tx.amount <= 0.0 {
            return Err(Error::Validation(format!(
                "amount must be a positive number, got {}",
                tx.amount
            )));
        }

        match (tx.latitude, tx.longitude) {
            (Some(lat), Some(lon)) => geo::validate_coordinate(lat, lon)?,
            (None, None) => {
                if place.is_some() {
                    return Err(Error::Validation(
                        "a place can only be chosen for a transaction with a coordinate"
                            .to_string(),
                    ));
                }
            }
            _ => {
                return Err(Error::Validation(
                    "latitude and longitude must be given together".to_string(),
                ))
            }
        }

        if let Some(category_id) = tx.category_id {
            let owned = self
                .store
                .owner_categories(&tx.owner)?
                .iter()
                .any(|c| c.id == category_id);
            if !owned {
                return Err(Error::NotFound(format!("Category {} not found", category_id)));
            }
        }

        if let Some(id) = place {
            match self.store.fetch_location(id)? {
                Some(location) if location.owner == tx.owner => {}
                _ => return Err(Error::NotFound(format!("Location {} not found", id))),
            }
        }

        Ok(())
    }
}
