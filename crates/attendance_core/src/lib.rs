//! Core domain logic for biometric, geofenced attendance.
//! This crate is the single source of truth for attendance invariants.

pub mod capability;
pub mod config;
pub mod db;
pub mod geofence;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use capability::biometric::{BiometricAuthenticator, BiometricError, BiometricSensor};
pub use capability::location::{
    CoordinateSubscription, LocationAuthorization, LocationEvent, LocationProvider,
    LocationService, LocationUpdate,
};
pub use capability::simulated::{
    SimulatedBiometric, SimulatedBiometricSensor, SimulatedLocationService,
};
pub use config::{ConfigError, EnrollmentPolicy, WorkflowConfig};
pub use geofence::{distance_m, is_within_office};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attendance::{
    AttendanceDay, AttendanceEvent, AttendanceEventId, AttendanceKind, DayAttendanceStatus,
    TimeRange,
};
pub use model::geo::{Coordinate, GeofenceConfig, GeofenceValidationError};
pub use model::user::{User, UserId, UserValidationError};
pub use repo::record_store::{RecordStore, RepoError, RepoResult, SqliteRecordStore};
pub use service::attendance_workflow::AttendanceWorkflow;
pub use service::clock::{Clock, SystemClock};
pub use service::outcome::{AttendanceError, AttendanceOutcome, OutcomeKind};
pub use service::state_tracker::AttendanceStateTracker;
