//! Biometric capability: platform sensor contract and owner checks.
//!
//! # Responsibility
//! - Define the platform biometric sensor contract.
//! - Provide `verify_owner` (per-action proof) and `enroll_owner`
//!   (one-time proof before the enrollment flag is persisted).
//!
//! # Invariants
//! - Availability is checked before every sensor prompt; an unavailable
//!   sensor resolves immediately without prompting.
//! - Results are returned to the awaiting task; nothing is delivered on a
//!   background context.
//! - Enrollment does not persist anything; the caller owns the flag.

use async_trait::async_trait;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Biometric capability errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricError {
    /// Hardware absent, nothing enrolled on the device, or locked out.
    Unavailable(String),
    /// The presented biometric did not match the device owner.
    Mismatch,
    /// The user dismissed the prompt.
    Cancelled,
    /// The sensor reported a failure while evaluating.
    Sensor(String),
}

impl Display for BiometricError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => {
                write!(f, "biometric authentication unavailable: {reason}")
            }
            Self::Mismatch => write!(f, "biometric did not match the device owner"),
            Self::Cancelled => write!(f, "biometric prompt was cancelled"),
            Self::Sensor(message) => write!(f, "biometric sensor error: {message}"),
        }
    }
}

impl Error for BiometricError {}

impl BiometricError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "biometric_unavailable",
            Self::Mismatch => "biometric_mismatch",
            Self::Cancelled => "biometric_cancelled",
            Self::Sensor(_) => "biometric_sensor",
        }
    }
}

/// Platform biometric sensor contract.
#[async_trait]
pub trait BiometricSensor: Send + Sync {
    /// Returns `Err(Unavailable)` when the sensor cannot be evaluated now.
    fn availability(&self) -> Result<(), BiometricError>;

    /// Prompts the user with `reason`. `Ok(true)` means the owner matched.
    async fn evaluate(&self, reason: &str) -> Result<bool, BiometricError>;
}

/// Owner verification and enrollment over a platform sensor.
#[derive(Clone)]
pub struct BiometricAuthenticator {
    sensor: Arc<dyn BiometricSensor>,
}

impl BiometricAuthenticator {
    pub fn new(sensor: Arc<dyn BiometricSensor>) -> Self {
        Self { sensor }
    }

    /// Proves the device user is the enrolled owner.
    pub async fn verify_owner(&self, reason: &str) -> Result<(), BiometricError> {
        let result = self.challenge(reason).await;
        match &result {
            Ok(()) => info!("event=biometric_verify module=biometric status=ok"),
            Err(err) => warn!(
                "event=biometric_verify module=biometric status=error error_code={}",
                err.code()
            ),
        }
        result
    }

    /// Proves, at call time, that the device owner can satisfy the challenge.
    pub async fn enroll_owner(&self, reason: &str) -> bool {
        match self.challenge(reason).await {
            Ok(()) => {
                info!("event=biometric_enroll module=biometric status=ok");
                true
            }
            Err(err) => {
                warn!(
                    "event=biometric_enroll module=biometric status=error error_code={}",
                    err.code()
                );
                false
            }
        }
    }

    async fn challenge(&self, reason: &str) -> Result<(), BiometricError> {
        self.sensor.availability()?;
        if self.sensor.evaluate(reason).await? {
            Ok(())
        } else {
            Err(BiometricError::Mismatch)
        }
    }
}
