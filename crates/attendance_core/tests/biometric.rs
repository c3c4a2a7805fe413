use attendance_core::{
    BiometricAuthenticator, BiometricError, SimulatedBiometric, SimulatedBiometricSensor,
};
use std::sync::Arc;

fn authenticator(
    behavior: SimulatedBiometric,
) -> (BiometricAuthenticator, Arc<SimulatedBiometricSensor>) {
    let sensor = Arc::new(SimulatedBiometricSensor::new(behavior));
    (BiometricAuthenticator::new(sensor.clone()), sensor)
}

#[tokio::test]
async fn verify_owner_succeeds_on_match() {
    let (auth, sensor) = authenticator(SimulatedBiometric::Match);

    auth.verify_owner("Authenticate to mark attendance.").await.unwrap();
    assert_eq!(sensor.evaluations(), 1);
    assert_eq!(
        sensor.last_reason().as_deref(),
        Some("Authenticate to mark attendance.")
    );
}

#[tokio::test]
async fn verify_owner_reports_each_failure() {
    let cases = [
        (SimulatedBiometric::Mismatch, BiometricError::Mismatch),
        (SimulatedBiometric::Cancel, BiometricError::Cancelled),
        (
            SimulatedBiometric::SensorError("lockout".into()),
            BiometricError::Sensor("lockout".into()),
        ),
    ];
    for (behavior, expected) in cases {
        let (auth, _) = authenticator(behavior);
        assert_eq!(auth.verify_owner("reason").await, Err(expected));
    }
}

#[tokio::test]
async fn unavailable_sensor_resolves_without_prompting() {
    let (auth, sensor) = authenticator(SimulatedBiometric::Unavailable("no hardware".into()));

    assert_eq!(
        auth.verify_owner("reason").await,
        Err(BiometricError::Unavailable("no hardware".into()))
    );
    assert!(!auth.enroll_owner("reason").await);
    assert_eq!(sensor.evaluations(), 0);
}

#[tokio::test]
async fn enroll_owner_reports_plain_success_flag() {
    let (auth, sensor) = authenticator(SimulatedBiometric::Match);
    assert!(auth.enroll_owner("Identify yourself!").await);

    sensor.set_behavior(SimulatedBiometric::Mismatch);
    assert!(!auth.enroll_owner("Identify yourself!").await);
    assert_eq!(sensor.evaluations(), 2);
}

#[tokio::test]
async fn availability_is_checked_before_every_prompt() {
    let (auth, sensor) = authenticator(SimulatedBiometric::Match);
    assert!(auth.verify_owner("reason").await.is_ok());

    sensor.set_behavior(SimulatedBiometric::Unavailable("locked out".into()));
    assert!(matches!(
        auth.verify_owner("reason").await,
        Err(BiometricError::Unavailable(_))
    ));
    assert_eq!(sensor.evaluations(), 1);
}
