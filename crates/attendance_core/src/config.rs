//! Workflow configuration.
//!
//! # Responsibility
//! - Hold the injected geofence, timeouts, enrollment policy and prompt text.
//! - Apply `ATTENDANCE_*` environment overrides on top of defaults.
//!
//! # Invariants
//! - A `WorkflowConfig` returned by `from_env`/`from_lookup` has passed
//!   `validate()`.
//! - A timeout of `None` waits indefinitely.

use crate::model::geo::{GeofenceConfig, GeofenceValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const ENV_OFFICE_LATITUDE: &str = "ATTENDANCE_OFFICE_LATITUDE";
pub const ENV_OFFICE_LONGITUDE: &str = "ATTENDANCE_OFFICE_LONGITUDE";
pub const ENV_GEOFENCE_RADIUS_M: &str = "ATTENDANCE_GEOFENCE_RADIUS_M";
pub const ENV_LOCATION_TIMEOUT_SECS: &str = "ATTENDANCE_LOCATION_TIMEOUT_SECS";
pub const ENV_BIOMETRIC_TIMEOUT_SECS: &str = "ATTENDANCE_BIOMETRIC_TIMEOUT_SECS";
pub const ENV_ENROLLMENT_POLICY: &str = "ATTENDANCE_ENROLLMENT_POLICY";

const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_BIOMETRIC_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_VERIFY_REASON: &str = "Authenticate to mark attendance.";
const DEFAULT_ENROLL_REASON: &str = "Identify yourself!";

/// What happens after a successful first-time enrollment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnrollmentPolicy {
    /// Persist the flag and ask the user to repeat the action.
    #[default]
    EnrollThenRetry,
    /// Persist the flag and continue to location, geofence and commit.
    EnrollAndContinue,
}

impl EnrollmentPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnrollThenRetry => "enroll_then_retry",
            Self::EnrollAndContinue => "enroll_and_continue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "enroll_then_retry" => Some(Self::EnrollThenRetry),
            "enroll_and_continue" => Some(Self::EnrollAndContinue),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    Geofence(GeofenceValidationError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
            Self::Geofence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geofence(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<GeofenceValidationError> for ConfigError {
    fn from(value: GeofenceValidationError) -> Self {
        Self::Geofence(value)
    }
}

/// Attendance workflow settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub geofence: GeofenceConfig,
    /// Upper bound on waiting for the first location fix.
    pub location_timeout: Option<Duration>,
    /// Upper bound on one biometric prompt.
    pub biometric_timeout: Option<Duration>,
    pub enrollment_policy: EnrollmentPolicy,
    /// Prompt text for per-action verification.
    pub verify_reason: String,
    /// Prompt text for first-time enrollment.
    pub enroll_reason: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            geofence: GeofenceConfig::default(),
            location_timeout: Some(DEFAULT_LOCATION_TIMEOUT),
            biometric_timeout: Some(DEFAULT_BIOMETRIC_TIMEOUT),
            enrollment_policy: EnrollmentPolicy::default(),
            verify_reason: DEFAULT_VERIFY_REASON.to_string(),
            enroll_reason: DEFAULT_ENROLL_REASON.to_string(),
        }
    }
}

impl WorkflowConfig {
    /// Builds config from defaults plus process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from defaults plus overrides returned by `lookup`.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(value) = read(ENV_OFFICE_LATITUDE) {
            config.geofence.office.latitude = parse_f64(ENV_OFFICE_LATITUDE, &value)?;
        }
        if let Some(value) = read(ENV_OFFICE_LONGITUDE) {
            config.geofence.office.longitude = parse_f64(ENV_OFFICE_LONGITUDE, &value)?;
        }
        if let Some(value) = read(ENV_GEOFENCE_RADIUS_M) {
            config.geofence.radius_m = parse_f64(ENV_GEOFENCE_RADIUS_M, &value)?;
        }
        if let Some(value) = read(ENV_LOCATION_TIMEOUT_SECS) {
            config.location_timeout = parse_timeout(ENV_LOCATION_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = read(ENV_BIOMETRIC_TIMEOUT_SECS) {
            config.biometric_timeout = parse_timeout(ENV_BIOMETRIC_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = read(ENV_ENROLLMENT_POLICY) {
            config.enrollment_policy =
                EnrollmentPolicy::parse(&value).ok_or(ConfigError::InvalidValue {
                    key: ENV_ENROLLMENT_POLICY,
                    value,
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geofence.validate()?;
        Ok(())
    }
}

fn parse_f64(key: &'static str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

fn parse_timeout(key: &'static str, value: &str) -> Result<Option<Duration>, ConfigError> {
    let secs = value.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, EnrollmentPolicy, WorkflowConfig, ENV_BIOMETRIC_TIMEOUT_SECS,
        ENV_ENROLLMENT_POLICY, ENV_GEOFENCE_RADIUS_M, ENV_LOCATION_TIMEOUT_SECS,
        ENV_OFFICE_LATITUDE,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = WorkflowConfig::from_lookup(lookup(&[])).expect("defaults should load");
        assert_eq!(config, WorkflowConfig::default());
        assert_eq!(config.geofence.radius_m, 100.0);
        assert_eq!(config.enrollment_policy, EnrollmentPolicy::EnrollThenRetry);
    }

    #[test]
    fn overrides_are_applied_and_zero_disables_timeouts() {
        let config = WorkflowConfig::from_lookup(lookup(&[
            (ENV_OFFICE_LATITUDE, "51.5"),
            (ENV_GEOFENCE_RADIUS_M, " 250 "),
            (ENV_LOCATION_TIMEOUT_SECS, "0"),
            (ENV_BIOMETRIC_TIMEOUT_SECS, "5"),
            (ENV_ENROLLMENT_POLICY, "Enroll_And_Continue"),
        ]))
        .expect("overrides should load");

        assert_eq!(config.geofence.office.latitude, 51.5);
        assert_eq!(config.geofence.radius_m, 250.0);
        assert_eq!(config.location_timeout, None);
        assert_eq!(config.biometric_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.enrollment_policy, EnrollmentPolicy::EnrollAndContinue);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = WorkflowConfig::from_lookup(lookup(&[(ENV_GEOFENCE_RADIUS_M, "wide")]))
            .expect_err("non-numeric radius must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key, .. } if key == ENV_GEOFENCE_RADIUS_M
        ));

        let err = WorkflowConfig::from_lookup(lookup(&[(ENV_GEOFENCE_RADIUS_M, "-3")]))
            .expect_err("negative radius must fail validation");
        assert!(matches!(err, ConfigError::Geofence(_)));

        let err = WorkflowConfig::from_lookup(lookup(&[(ENV_OFFICE_LATITUDE, "120")]))
            .expect_err("latitude out of range must fail validation");
        assert!(matches!(err, ConfigError::Geofence(_)));
    }
}
