mod common;

use attendance_core::{distance_m, is_within_office, Coordinate, GeofenceConfig};
use common::{north_of, OFFICE};

fn office_fence(radius_m: f64) -> GeofenceConfig {
    GeofenceConfig::new(OFFICE, radius_m)
}

#[test]
fn points_closer_than_radius_are_inside() {
    let config = office_fence(100.0);
    for meters in [0.0, 10.0, 50.0, 99.0] {
        assert!(
            is_within_office(north_of(OFFICE, meters), &config),
            "{meters} m should be inside"
        );
    }
}

#[test]
fn points_at_or_beyond_radius_are_outside() {
    let point = north_of(OFFICE, 500.0);
    assert!(!is_within_office(point, &office_fence(100.0)));

    // Exactly on the boundary is outside.
    let exact = distance_m(point, OFFICE);
    assert!(!is_within_office(point, &office_fence(exact)));
    assert!(is_within_office(point, &office_fence(exact + 0.001)));
}

#[test]
fn distance_is_symmetric() {
    let a = Coordinate::new(37.7749, -122.4194);
    let b = Coordinate::new(37.8044, -122.2712);
    assert!((distance_m(a, b) - distance_m(b, a)).abs() < 1e-6);
}

#[test]
fn longitude_distance_shrinks_with_latitude() {
    let at_equator = distance_m(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
    let at_sixty = distance_m(Coordinate::new(60.0, 0.0), Coordinate::new(60.0, 1.0));
    assert!((at_sixty / at_equator - 0.5).abs() < 0.01);
}

#[test]
fn evaluator_does_not_validate_ranges() {
    let bogus = Coordinate::new(200.0, 500.0);
    assert!(!bogus.is_valid());
    assert!(!is_within_office(bogus, &office_fence(100.0)));
}
