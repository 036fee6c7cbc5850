//! Great-circle distance and the bounding-box prefilter
//!
//! The prefilter may admit points in the corners of
//! the box that lie outside the search circle, but never rejects a point
//! inside it. Callers always re-check survivors with [`distance_meters`].

use crate::error::{Error, Result};
use crate::models::RememberedLocation;

/// Mean Earth radius used by the Haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude used to size the prefilter box.
/// Slightly below the true value on a 6371 km sphere, so the box errs wide.
pub const METERS_PER_DEGREE_LAT: f64 = 111_000.0;

/// Haversine distance between two coordinates, in meters
///
/// Returns NaN for non-finite input.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points
    let a = a.min(1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Wrap a longitude (or longitude difference) into [-180, 180]
///
/// Values already in range are returned untouched.
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Axis-aligned latitude/longitude box approximating a search circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    center_lat: f64,
    center_lon: f64,
    lat_delta: f64,
    /// `None` matches every longitude (box reaches a pole or wraps the globe)
    lon_delta: Option<f64>,
}

impl BoundingBox {
    /// Box around `(lat, lon)` covering everything within `radius_meters`
    pub fn around(lat: f64, lon: f64, radius_meters: f64) -> Self {
        let lat_delta = radius_meters / METERS_PER_DEGREE_LAT;

        // Meridians converge poleward, so size the longitude span at the
        // box edge closest to the pole rather than at the center.
        let edge_lat = (lat.abs() + lat_delta).min(90.0);
        let lon_delta = radius_meters / (METERS_PER_DEGREE_LAT * edge_lat.to_radians().cos());
        let lon_delta = (edge_lat < 90.0 && lon_delta.is_finite() && lon_delta < 180.0)
            .then_some(lon_delta);

        Self {
            center_lat: lat,
            center_lon: lon,
            lat_delta,
            lon_delta,
        }
    }

    pub fn lat_delta(&self) -> f64 {
        self.lat_delta
    }

    pub fn lon_delta(&self) -> Option<f64> {
        self.lon_delta
    }

    /// Whether the box spans every longitude
    pub fn spans_all_longitudes(&self) -> bool {
        self.lon_delta.is_none()
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if (lat - self.center_lat).abs() > self.lat_delta {
            return false;
        }
        match self.lon_delta {
            None => true,
            Some(delta) => wrap_longitude(lon - self.center_lon).abs() <= delta,
        }
    }
}

/// Keep the candidates whose coordinate falls inside the box around the query
pub fn prefilter(
    candidates: &[RememberedLocation],
    lat: f64,
    lon: f64,
    radius_meters: f64,
) -> Vec<&RememberedLocation> {
    let bbox = BoundingBox::around(lat, lon, radius_meters);
    candidates
        .iter()
        .filter(|loc| bbox.contains(loc.latitude, loc.longitude))
        .collect()
}

/// Reject non-finite or out-of-range coordinates
pub fn validate_coordinate(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(Error::Validation(format!(
            "latitude must be within [-90, 90], got {}",
            lat
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::Validation(format!(
            "longitude must be within [-180, 180], got {}",
            lon
        )));
    }
    Ok(())
}

/// Reject non-finite or non-positive search radii
pub fn validate_radius(radius_meters: f64) -> Result<()> {
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(Error::Validation(format!(
            "radius must be a positive number of meters, got {}",
            radius_meters
        )));
    }
    Ok(())
}
