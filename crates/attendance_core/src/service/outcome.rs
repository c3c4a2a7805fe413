//! Attendance outcomes and error taxonomy.
//!
//! # Invariants
//! - Every invocation ends in exactly one `AttendanceOutcome`.
//! - Each `AttendanceError` variant maps to exactly one user-facing message.
//! - Only `LocationFailed` and `PersistenceFailed` are transient.

use crate::model::attendance::{AttendanceEvent, AttendanceKind};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Terminal failure of one attendance invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceError {
    UserNotFound,
    AlreadyMarked,
    BiometricUnavailable(String),
    BiometricFailed(String),
    EnrollmentFailed,
    LocationDenied,
    LocationFailed(String),
    OutOfGeofence { distance_m: f64 },
    PersistenceFailed(String),
}

impl AttendanceError {
    /// Stable identifier for logs and presentation mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::AlreadyMarked => "already_marked",
            Self::BiometricUnavailable(_) => "biometric_unavailable",
            Self::BiometricFailed(_) => "biometric_failed",
            Self::EnrollmentFailed => "enrollment_failed",
            Self::LocationDenied => "location_denied",
            Self::LocationFailed(_) => "location_failed",
            Self::OutOfGeofence { .. } => "out_of_geofence",
            Self::PersistenceFailed(_) => "persistence_failed",
        }
    }

    /// Whether a manual retry of the same action may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LocationFailed(_) | Self::PersistenceFailed(_))
    }

    /// Message shown to the user for this failure of `kind`.
    pub fn user_message(&self, kind: AttendanceKind) -> String {
        match self {
            Self::UserNotFound => "User not found".to_string(),
            Self::AlreadyMarked => {
                format!("You have already {} for the day", kind.past_tense())
            }
            Self::BiometricUnavailable(_) | Self::BiometricFailed(_) => {
                "Biometric authentication failed".to_string()
            }
            Self::EnrollmentFailed => "Biometric registration failed.".to_string(),
            Self::LocationDenied => format!(
                "Location access is denied. Allow location access to {}.",
                kind.verb()
            ),
            Self::LocationFailed(_) => {
                "Could not determine your location. Please try again.".to_string()
            }
            Self::OutOfGeofence { .. } => format!(
                "You are not at the office location. Cannot {}!",
                kind.label()
            ),
            Self::PersistenceFailed(_) => {
                "Could not access attendance records. Please try again.".to_string()
            }
        }
    }
}

impl Display for AttendanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserNotFound => write!(f, "user not found"),
            Self::AlreadyMarked => write!(f, "attendance already marked for the day"),
            Self::BiometricUnavailable(details) => {
                write!(f, "biometric unavailable: {details}")
            }
            Self::BiometricFailed(details) => write!(f, "biometric failed: {details}"),
            Self::EnrollmentFailed => write!(f, "biometric enrollment failed"),
            Self::LocationDenied => write!(f, "location access denied"),
            Self::LocationFailed(details) => write!(f, "location failed: {details}"),
            Self::OutOfGeofence { distance_m } => {
                write!(f, "outside geofence: {distance_m:.1} m from office")
            }
            Self::PersistenceFailed(details) => write!(f, "persistence failed: {details}"),
        }
    }
}

impl Error for AttendanceError {}

/// Outcome category surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Rejected,
    Info,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Info => "info",
        }
    }
}

/// The single result of one check-in/check-out invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceOutcome {
    pub kind: OutcomeKind,
    pub message: String,
    /// Set iff `kind == Rejected`.
    pub error: Option<AttendanceError>,
    /// Set iff `kind == Success`.
    pub event: Option<AttendanceEvent>,
}

impl AttendanceOutcome {
    pub(crate) fn success(event: AttendanceEvent) -> Self {
        Self {
            kind: OutcomeKind::Success,
            message: format!("{} successful", event.kind.label()),
            error: None,
            event: Some(event),
        }
    }

    pub(crate) fn enrolled(kind: AttendanceKind) -> Self {
        Self {
            kind: OutcomeKind::Info,
            message: format!(
                "Biometric registered successfully. Please try to {} again.",
                kind.verb()
            ),
            error: None,
            event: None,
        }
    }

    pub(crate) fn rejected(kind: AttendanceKind, error: AttendanceError) -> Self {
        Self {
            kind: OutcomeKind::Rejected,
            message: error.user_message(kind),
            error: Some(error),
            event: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

#[cfg(test)]
mod tests {
    use super::{AttendanceError, AttendanceOutcome, OutcomeKind};
    use crate::model::attendance::AttendanceKind;

    #[test]
    fn only_location_and_persistence_failures_are_transient() {
        assert!(AttendanceError::LocationFailed("timeout".into()).is_transient());
        assert!(AttendanceError::PersistenceFailed("disk".into()).is_transient());
        assert!(!AttendanceError::LocationDenied.is_transient());
        assert!(!AttendanceError::AlreadyMarked.is_transient());
        assert!(!AttendanceError::OutOfGeofence { distance_m: 500.0 }.is_transient());
    }

    #[test]
    fn messages_follow_kind() {
        let outcome =
            AttendanceOutcome::rejected(AttendanceKind::CheckOut, AttendanceError::AlreadyMarked);
        assert_eq!(outcome.kind, OutcomeKind::Rejected);
        assert_eq!(outcome.message, "You have already checked out for the day");

        let geofence = AttendanceError::OutOfGeofence { distance_m: 500.0 };
        assert_eq!(
            geofence.user_message(AttendanceKind::CheckIn),
            "You are not at the office location. Cannot Check-In!"
        );

        let unavailable = AttendanceError::BiometricUnavailable("no hardware".into());
        assert_eq!(unavailable.code(), "biometric_unavailable");
        assert_eq!(
            unavailable.user_message(AttendanceKind::CheckIn),
            "Biometric authentication failed"
        );

        let enrolled = AttendanceOutcome::enrolled(AttendanceKind::CheckIn);
        assert_eq!(enrolled.kind, OutcomeKind::Info);
        assert_eq!(
            enrolled.message,
            "Biometric registered successfully. Please try to check in again."
        );
    }
}
