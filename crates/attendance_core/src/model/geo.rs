//! Coordinate and geofence value types.
//!
//! # Responsibility
//! - Carry latitude/longitude as one paired value.
//! - Describe the office geofence injected into the workflow.
//!
//! # Invariants
//! - Latitude and longitude are never used singly.
//! - `GeofenceConfig::validate()` is the only range check; distance math
//!   accepts any finite input.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default office latitude.
pub const DEFAULT_OFFICE_LATITUDE: f64 = 37.7749;
/// Default office longitude.
pub const DEFAULT_OFFICE_LONGITUDE: f64 = -122.4194;
/// Default allowed distance from the office, in meters.
pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 100.0;

/// WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns whether both components are finite and inside WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Circular office boundary used to gate attendance events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeofenceConfig {
    pub office: Coordinate,
    pub radius_m: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            office: Coordinate::new(DEFAULT_OFFICE_LATITUDE, DEFAULT_OFFICE_LONGITUDE),
            radius_m: DEFAULT_GEOFENCE_RADIUS_M,
        }
    }
}

/// Geofence configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GeofenceValidationError {
    InvalidOffice(Coordinate),
    InvalidRadius(f64),
}

impl Display for GeofenceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidOffice(coordinate) => {
                write!(f, "office coordinate {coordinate} is out of range")
            }
            Self::InvalidRadius(radius) => {
                write!(f, "geofence radius must be a positive number of meters, got {radius}")
            }
        }
    }
}

impl Error for GeofenceValidationError {}

impl GeofenceConfig {
    pub fn new(office: Coordinate, radius_m: f64) -> Self {
        Self { office, radius_m }
    }

    pub fn validate(&self) -> Result<(), GeofenceValidationError> {
        if !self.office.is_valid() {
            return Err(GeofenceValidationError::InvalidOffice(self.office));
        }
        if !self.radius_m.is_finite() || self.radius_m <= 0.0 {
            return Err(GeofenceValidationError::InvalidRadius(self.radius_m));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Coordinate, GeofenceConfig, GeofenceValidationError};

    #[test]
    fn default_geofence_is_valid() {
        GeofenceConfig::default()
            .validate()
            .expect("default geofence should validate");
    }

    #[test]
    fn validate_rejects_zero_radius_and_bad_office() {
        let zero = GeofenceConfig::new(Coordinate::new(0.0, 0.0), 0.0);
        assert!(matches!(
            zero.validate(),
            Err(GeofenceValidationError::InvalidRadius(_))
        ));

        let bad_office = GeofenceConfig::new(Coordinate::new(91.0, 0.0), 50.0);
        assert!(matches!(
            bad_office.validate(),
            Err(GeofenceValidationError::InvalidOffice(_))
        ));
    }
}
