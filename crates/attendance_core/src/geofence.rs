//! Office geofence evaluation.
//!
//! Pure functions, no state and no failure mode. Range validation of the
//! measured point is the caller's concern.

use crate::model::geo::{Coordinate, GeofenceConfig};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in meters using the haversine formula.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // Clamp: rounding can push `h` just past 1.0 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Returns `true` iff `point` is strictly closer than the configured radius.
pub fn is_within_office(point: Coordinate, config: &GeofenceConfig) -> bool {
    distance_m(point, config.office) < config.radius_m
}

#[cfg(test)]
mod tests {
    use super::{distance_m, is_within_office};
    use crate::model::geo::{Coordinate, GeofenceConfig};

    #[test]
    fn distance_to_self_is_zero() {
        let office = Coordinate::new(37.7749, -122.4194);
        assert_eq!(distance_m(office, office), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = distance_m(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
    }

    #[test]
    fn office_itself_is_inside() {
        let config = GeofenceConfig::default();
        assert!(is_within_office(config.office, &config));
    }
}
