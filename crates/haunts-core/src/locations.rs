//! Location memory: recognize places the user has spent at before
//!
//! Remembered locations are matched by great-circle distance:
//! - `find_nearest` / `find_all_within`: read-only proximity queries
//! - `merge_or_create`: fold a new visit into the closest remembered place, or
//!   remember a new one
//!
//! A merge moves the stored coordinate toward the visit by an incremental mean
//! (`lat' = lat + (lat_in - lat) / n'`), bumps the visit count, and takes the
//! visit's amount and category. The write is conditional on the visit count
//! read beforehand, so two concurrent merges into the same place cannot both
//! succeed; the loser gets [`Error::Conflict`].

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::config::RadiusConfig;
use crate::error::{Error, Result};
use crate::geo::{self, distance_meters, wrap_longitude};
use crate::models::{
    LocationPatch, LocationVisit, LocationWrite, MergeOutcome, NearbyLocation,
    NewRememberedLocation, RememberedLocation,
};
use crate::store::LocationStore;

/// Proximity queries and merges over a [`LocationStore`]
pub struct LocationMemory<'a, S: LocationStore + ?Sized> {
    store: &'a S,
    radius: RadiusConfig,
}

impl<'a, S: LocationStore + ?Sized> LocationMemory<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            radius: RadiusConfig::default(),
        }
    }

    pub fn with_radii(store: &'a S, radius: RadiusConfig) -> Self {
        Self { store, radius }
    }

    pub fn radii(&self) -> RadiusConfig {
        self.radius
    }

    /// Closest of `owner`'s locations within `radius_meters`, if any
    pub fn find_nearest(
        &self,
        owner: &str,
        lat: f64,
        lon: f64,
        radius_meters: f64,
    ) -> Result<Option<NearbyLocation>> {
        geo::validate_coordinate(lat, lon)?;
        geo::validate_radius(radius_meters)?;

        let candidates = self.store.owner_locations(owner)?;
        Ok(nearest(&candidates, lat, lon, radius_meters))
    }

    /// All of `owner`'s locations within `radius_meters`, closest first
    pub fn find_all_within(
        &self,
        owner: &str,
        lat: f64,
        lon: f64,
        radius_meters: f64,
    ) -> Result<Vec<NearbyLocation>> {
        geo::validate_coordinate(lat, lon)?;
        geo::validate_radius(radius_meters)?;

        let candidates = self.store.owner_locations(owner)?;
        Ok(within(&candidates, lat, lon, radius_meters))
    }

    /// Places to offer the user at this coordinate (suggestion radius)
    pub fn suggestions(&self, owner: &str, lat: f64, lon: f64) -> Result<Vec<NearbyLocation>> {
        self.find_all_within(owner, lat, lon, self.radius.suggest_meters)
    }

    /// The place a visit here would merge into implicitly (merge radius)
    pub fn merge_target(&self, owner: &str, lat: f64, lon: f64) -> Result<Option<NearbyLocation>> {
        self.find_nearest(owner, lat, lon, self.radius.merge_meters)
    }

    /// Fold `visit` into a remembered location, or remember a new one
    ///
    /// With `explicit_target`, that location must exist and belong to `owner`;
    /// it is merged into regardless of distance. Without one, the nearest
    /// location within the merge radius is used, and a new location is
    /// created when there is none.
    pub fn merge_or_create(
        &self,
        owner: &str,
        visit: &LocationVisit,
        explicit_target: Option<i64>,
    ) -> Result<MergeOutcome> {
        let write = self.plan_visit(owner, visit, explicit_target)?;

        let id = match &write {
            LocationWrite::Insert(location) => self.store.insert_location(location)?,
            LocationWrite::Patch {
                id,
                expected_visit_count,
                patch,
            } => {
                if !self.store.patch_location(*id, *expected_visit_count, patch)? {
                    return Err(merge_conflict(*id, *expected_visit_count));
                }
                *id
            }
        };

        let outcome = write.outcome(id);
        debug!("Location {} for {}: {:?}", id, owner, outcome);
        Ok(outcome)
    }

    /// The write `merge_or_create` would make for `visit`, without making it
    pub fn plan_visit(
        &self,
        owner: &str,
        visit: &LocationVisit,
        explicit_target: Option<i64>,
    ) -> Result<LocationWrite> {
        validate_visit(visit)?;

        let target = match explicit_target {
            Some(id) => Some(self.owned_location(owner, id)?),
            None => self
                .merge_target(owner, visit.latitude, visit.longitude)?
                .map(|nearby| {
                    debug!(
                        "Visit at ({}, {}) is {:.1} m from location {}",
                        visit.latitude, visit.longitude, nearby.distance_meters, nearby.location.id
                    );
                    nearby.location
                }),
        };

        Ok(match target {
            Some(location) => LocationWrite::Patch {
                id: location.id,
                expected_visit_count: location.visit_count,
                patch: merge_patch(&location, visit),
            },
            None => LocationWrite::Insert(NewRememberedLocation {
                owner: owner.to_string(),
                latitude: visit.latitude,
                longitude: visit.longitude,
                amount: visit.amount,
                category_id: visit.category_id,
                name: visit.name.clone(),
            }),
        })
    }

    fn owned_location(&self, owner: &str, id: i64) -> Result<RememberedLocation> {
        match self.store.fetch_location(id)? {
            Some(location) if location.owner == owner => Ok(location),
            // Someone else's location is indistinguishable from a missing one
            _ => Err(Error::NotFound(format!("Location {} not found", id))),
        }
    }
}

/// Error for a conditional patch that lost to a concurrent writer
pub(crate) fn merge_conflict(id: i64, expected_visit_count: i64) -> Error {
    warn!(
        "Location {} changed while merging (expected visit count {})",
        id, expected_visit_count
    );
    Error::Conflict(format!("Location {} was modified concurrently", id))
}

fn validate_visit(visit: &LocationVisit) -> Result<()> {
    if !visit.amount.is_finite() || visit.amount <= 0.0 {
        return Err(Error::Validation(format!(
            "amount must be a positive number, got {}",
            visit.amount
        )));
    }
    geo::validate_coordinate(visit.latitude, visit.longitude)
}

/// Exact-distance pass over the prefilter survivors
fn candidates_within<'c>(
    candidates: &'c [RememberedLocation],
    lat: f64,
    lon: f64,
    radius_meters: f64,
) -> impl Iterator<Item = (&'c RememberedLocation, f64)> {
    geo::prefilter(candidates, lat, lon, radius_meters)
        .into_iter()
        .map(move |loc| (loc, distance_meters(lat, lon, loc.latitude, loc.longitude)))
        .filter(move |(_, distance)| *distance <= radius_meters)
}

/// Closest candidate within the radius; the first one wins a tie
pub fn nearest(
    candidates: &[RememberedLocation],
    lat: f64,
    lon: f64,
    radius_meters: f64,
) -> Option<NearbyLocation> {
    candidates_within(candidates, lat, lon, radius_meters)
        .fold(None::<(&RememberedLocation, f64)>, |best, (loc, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((loc, d)),
        })
        .map(|(loc, distance_meters)| NearbyLocation {
            location: loc.clone(),
            distance_meters,
        })
}

/// Every candidate within the radius, closest first (ties keep input order)
pub fn within(
    candidates: &[RememberedLocation],
    lat: f64,
    lon: f64,
    radius_meters: f64,
) -> Vec<NearbyLocation> {
    let mut found: Vec<NearbyLocation> = candidates_within(candidates, lat, lon, radius_meters)
        .map(|(loc, distance_meters)| NearbyLocation {
            location: loc.clone(),
            distance_meters,
        })
        .collect();
    found.sort_by(|a, b| {
        a.distance_meters
            .partial_cmp(&b.distance_meters)
            .unwrap_or(Ordering::Equal)
    });
    found
}

/// Coordinate after folding the `n`-th visit into a centroid of `n - 1` visits
///
/// Longitude moves the short way around the antimeridian.
pub fn merged_coordinate(
    lat: f64,
    lon: f64,
    lat_in: f64,
    lon_in: f64,
    new_count: i64,
) -> (f64, f64) {
    let n = new_count as f64;
    let lat = lat + (lat_in - lat) / n;
    let lon = wrap_longitude(lon + wrap_longitude(lon_in - lon) / n);
    (lat, lon)
}

/// The patch that folds `visit` into `location`
pub fn merge_patch(location: &RememberedLocation, visit: &LocationVisit) -> LocationPatch {
    let visit_count = location.visit_count + 1;
    let (latitude, longitude) = merged_coordinate(
        location.latitude,
        location.longitude,
        visit.latitude,
        visit.longitude,
        visit_count,
    );

    LocationPatch {
        latitude,
        longitude,
        amount: visit.amount,
        category_id: visit.category_id,
        name: location.name.clone().or_else(|| visit.name.clone()),
        visit_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Utc;

    fn visit(lat: f64, lon: f64, amount: f64) -> LocationVisit {
        LocationVisit {
            latitude: lat,
            longitude: lon,
            amount,
            category_id: None,
            name: None,
        }
    }

    fn remembered(id: i64, lat: f64, lon: f64) -> RememberedLocation {
        RememberedLocation {
            id,
            owner: "me".to_string(),
            latitude: lat,
            longitude: lon,
            amount: 10.0,
            category_id: None,
            name: None,
            visit_count: 1,
            created_at: Utc::now(),
        }
    }

    /// Store that lets another writer merge first whenever a patch is attempted
    struct RacingStore {
        inner: Database,
    }

    impl LocationStore for RacingStore {
        fn owner_locations(&self, owner: &str) -> Result<Vec<RememberedLocation>> {
            self.inner.owner_locations(owner)
        }

        fn fetch_location(&self, id: i64) -> Result<Option<RememberedLocation>> {
            self.inner.fetch_location(id)
        }

        fn insert_location(&self, location: &NewRememberedLocation) -> Result<i64> {
            self.inner.insert_location(location)
        }

        fn patch_location(
            &self,
            id: i64,
            expected_visit_count: i64,
            patch: &LocationPatch,
        ) -> Result<bool> {
            let competing = LocationPatch {
                amount: 999.0,
                ..patch.clone()
            };
            self.inner
                .patch_location(id, expected_visit_count, &competing)?;
            self.inner.patch_location(id, expected_visit_count, patch)
        }
    }

    #[test]
    fn test_create_then_merge_scenario() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::new(&db);

        let first = memory
            .merge_or_create("me", &visit(22.28, 114.15, 50.0), None)
            .unwrap();
        assert!(!first.is_merge());
        assert_eq!(first.visit_count(), 1);

        let second = memory
            .merge_or_create("me", &visit(22.2801, 114.1501, 60.0), None)
            .unwrap();
        assert_eq!(
            second,
            MergeOutcome::Merged {
                id: first.id(),
                visit_count: 2
            }
        );

        let loc = db.fetch_location(first.id()).unwrap().unwrap();
        assert_eq!(loc.visit_count, 2);
        assert!((loc.latitude - 22.28005).abs() < 1e-9);
        assert!((loc.longitude - 114.15005).abs() < 1e-9);
        assert_eq!(loc.amount, 60.0);
        assert_eq!(db.owner_locations("me").unwrap().len(), 1);
    }

    #[test]
    fn test_merge_formula_is_exact() {
        let mut loc = remembered(1, 10.0, 20.0);
        loc.visit_count = 3;

        let patch = merge_patch(&loc, &visit(14.0, 24.0, 5.0));
        assert_eq!(patch.visit_count, 4);
        assert!((patch.latitude - 11.0).abs() < 1e-9);
        assert!((patch.longitude - 21.0).abs() < 1e-9);
        assert_eq!(patch.amount, 5.0);
    }

    #[test]
    fn test_merge_name_and_category() {
        let mut loc = remembered(1, 0.0, 0.0);
        loc.category_id = Some(3);

        let named = LocationVisit {
            name: Some("Bakery".to_string()),
            category_id: Some(7),
            ..visit(0.0, 0.0, 4.0)
        };
        let patch = merge_patch(&loc, &named);
        assert_eq!(patch.name.as_deref(), Some("Bakery"));
        assert_eq!(patch.category_id, Some(7));

        // Existing name is kept
        loc.name = Some("Corner Shop".to_string());
        let patch = merge_patch(&loc, &named);
        assert_eq!(patch.name.as_deref(), Some("Corner Shop"));
    }

    #[test]
    fn test_merge_across_antimeridian() {
        let (lat, lon) = merged_coordinate(0.0, 179.9999, 0.0, -179.9999, 2);
        assert_eq!(lat, 0.0);
        assert!(lon.abs() > 179.9999 - 1e-9, "got {}", lon);
    }

    #[test]
    fn test_repeated_merges_converge() {
        let mut lat = 22.30;
        let mut lon = 114.20;
        for n in 2..=2000 {
            let merged = merged_coordinate(lat, lon, 22.28, 114.15, n);
            lat = merged.0;
            lon = merged.1;
        }
        assert!((lat - 22.28).abs() < 1e-4);
        assert!((lon - 114.15).abs() < 1e-4);

        // Merging the same coordinate into itself is a fixed point
        let (lat, lon) = merged_coordinate(22.28, 114.15, 22.28, 114.15, 7);
        assert!((lat - 22.28).abs() < 1e-12);
        assert!((lon - 114.15).abs() < 1e-12);
    }

    #[test]
    fn test_far_visit_creates_new_location() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::new(&db);

        let a = memory
            .merge_or_create("me", &visit(22.28, 114.15, 10.0), None)
            .unwrap();
        // ~1.1 km north
        let b = memory
            .merge_or_create("me", &visit(22.29, 114.15, 10.0), None)
            .unwrap();
        assert!(!b.is_merge());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_other_owners_locations_are_ignored() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::new(&db);

        let theirs = memory
            .merge_or_create("you", &visit(22.28, 114.15, 10.0), None)
            .unwrap();
        let mine = memory
            .merge_or_create("me", &visit(22.28, 114.15, 10.0), None)
            .unwrap();
        assert!(!mine.is_merge());
        assert_ne!(theirs.id(), mine.id());
    }

    #[test]
    fn test_explicit_target_merges_regardless_of_distance() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::new(&db);

        let target = memory
            .merge_or_create("me", &visit(22.28, 114.15, 10.0), None)
            .unwrap();
        let outcome = memory
            .merge_or_create("me", &visit(22.30, 114.15, 20.0), Some(target.id()))
            .unwrap();
        assert_eq!(outcome.id(), target.id());
        assert_eq!(outcome.visit_count(), 2);

        let loc = db.fetch_location(target.id()).unwrap().unwrap();
        assert!((loc.latitude - 22.29).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_target_of_other_owner_rejected() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::new(&db);

        let theirs = memory
            .merge_or_create("you", &visit(22.28, 114.15, 10.0), None)
            .unwrap();
        let err = memory
            .merge_or_create("me", &visit(22.28, 114.15, 20.0), Some(theirs.id()))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // No mutation happened
        let loc = db.fetch_location(theirs.id()).unwrap().unwrap();
        assert_eq!(loc.visit_count, 1);
        assert_eq!(loc.amount, 10.0);
        assert!(db.owner_locations("me").unwrap().is_empty());

        let err = memory
            .merge_or_create("me", &visit(22.28, 114.15, 20.0), Some(theirs.id() + 50))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_invalid_visit_rejected_before_mutation() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::new(&db);

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = memory
                .merge_or_create("me", &visit(22.28, 114.15, amount), None)
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "amount {}", amount);
        }
        assert!(matches!(
            memory.merge_or_create("me", &visit(95.0, 114.15, 5.0), None),
            Err(Error::Validation(_))
        ));
        assert!(db.owner_locations("me").unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_merge_surfaces_conflict() {
        let db = Database::in_memory().unwrap();
        let id = LocationMemory::new(&db)
            .merge_or_create("me", &visit(22.28, 114.15, 10.0), None)
            .unwrap()
            .id();

        let racing = RacingStore { inner: db.clone() };
        let memory = LocationMemory::new(&racing);
        let err = memory
            .merge_or_create("me", &visit(22.28, 114.15, 20.0), None)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Only the competing writer's merge landed
        let loc = db.fetch_location(id).unwrap().unwrap();
        assert_eq!(loc.visit_count, 2);
        assert_eq!(loc.amount, 999.0);
    }

    #[test]
    fn test_plan_visit_writes_nothing() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::new(&db);

        match memory.plan_visit("me", &visit(22.28, 114.15, 10.0), None).unwrap() {
            LocationWrite::Insert(location) => assert_eq!(location.owner, "me"),
            other => panic!("expected an insert, got {:?}", other),
        }
        assert!(db.owner_locations("me").unwrap().is_empty());

        let id = memory
            .merge_or_create("me", &visit(22.28, 114.15, 10.0), None)
            .unwrap()
            .id();
        match memory.plan_visit("me", &visit(22.2801, 114.15, 30.0), None).unwrap() {
            LocationWrite::Patch {
                id: target,
                expected_visit_count,
                patch,
            } => {
                assert_eq!(target, id);
                assert_eq!(expected_visit_count, 1);
                assert_eq!(patch.visit_count, 2);
                assert_eq!(patch.amount, 30.0);
            }
            other => panic!("expected a patch, got {:?}", other),
        }
        assert_eq!(db.fetch_location(id).unwrap().unwrap().visit_count, 1);
    }

    #[test]
    fn test_find_nearest_and_all_within() {
        let candidates = vec![
            remembered(1, 22.2810, 114.15), // ~111 m
            remembered(2, 22.2803, 114.15), // ~33 m
            remembered(3, 22.2900, 114.15), // ~1.1 km
        ];

        let best = nearest(&candidates, 22.28, 114.15, 200.0).unwrap();
        assert_eq!(best.location.id, 2);
        assert!(best.distance_meters < 40.0);

        let all = within(&candidates, 22.28, 114.15, 200.0);
        let ids: Vec<i64> = all.iter().map(|n| n.location.id).collect();
        assert_eq!(ids, vec![2, 1]);

        assert!(nearest(&candidates, 22.28, 114.15, 10.0).is_none());
        assert!(within(&[], 22.28, 114.15, 10.0).is_empty());
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        let candidates = vec![remembered(5, 1.0, 1.0), remembered(6, 1.0, 1.0)];
        assert_eq!(nearest(&candidates, 1.0, 1.0, 50.0).unwrap().location.id, 5);
        let ids: Vec<i64> = within(&candidates, 1.0, 1.0, 50.0)
            .iter()
            .map(|n| n.location.id)
            .collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn test_queries_validate_input() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::new(&db);
        assert!(matches!(
            memory.find_nearest("me", 0.0, 0.0, 0.0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            memory.find_all_within("me", f64::NAN, 0.0, 10.0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_radii_from_config() {
        let db = Database::in_memory().unwrap();
        let memory = LocationMemory::with_radii(
            &db,
            RadiusConfig {
                suggest_meters: 500.0,
                merge_meters: 20.0,
            },
        );
        memory
            .merge_or_create("me", &visit(22.28, 114.15, 10.0), None)
            .unwrap();

        // ~33 m away: suggested, but outside the merge radius
        assert_eq!(memory.suggestions("me", 22.2803, 114.15).unwrap().len(), 1);
        assert!(memory.merge_target("me", 22.2803, 114.15).unwrap().is_none());
        let outcome = memory
            .merge_or_create("me", &visit(22.2803, 114.15, 10.0), None)
            .unwrap();
        assert!(!outcome.is_merge());
    }

    #[test]
    fn test_nearest_never_beyond_radius() {
        let offsets = [-0.009, -0.004, -0.0007, 0.0, 0.0003, 0.002, 0.0085];
        let candidates: Vec<_> = offsets
            .iter()
            .flat_map(|dlat| offsets.iter().map(move |dlon| (*dlat, *dlon)))
            .enumerate()
            .map(|(i, (dlat, dlon))| remembered(i as i64, 45.0 + dlat, 7.0 + dlon))
            .collect();

        for radius in [1.0, 10.0, 50.0, 100.0, 400.0, 900.0, 2_000.0] {
            if let Some(found) = nearest(&candidates, 45.0, 7.0, radius) {
                assert!(found.distance_meters <= radius);
                for c in &candidates {
                    assert!(found.distance_meters <= distance_meters(45.0, 7.0, c.latitude, c.longitude));
                }
            }
            for n in within(&candidates, 45.0, 7.0, radius) {
                assert!(n.distance_meters <= radius);
            }
        }
    }

    #[test]
    fn test_merge_step_is_incremental_mean() {
        for (lat, lon) in [(-80.0, -170.0), (-12.5, 33.3), (0.0, 0.0), (48.85, 2.35), (79.9, 169.9)] {
            for (d_lat, d_lon) in [(-5.0, 4.9), (0.001, -0.002), (3.2, -4.7)] {
                for n in [2i64, 3, 10, 999] {
                    let (m_lat, m_lon) = merged_coordinate(lat, lon, lat + d_lat, lon + d_lon, n);
                    assert!((m_lat - (lat + d_lat / n as f64)).abs() < 1e-9);
                    assert!((m_lon - (lon + d_lon / n as f64)).abs() < 1e-9);
                }
            }
        }
    }
}
