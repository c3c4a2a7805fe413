//! Check-in/check-out orchestration.
//!
//! # Responsibility
//! - Resolve the user and today's status, then gate the action on biometric
//!   proof, a fresh location fix and the office geofence.
//! - Commit exactly one attendance event per successful invocation.
//!
//! # Invariants
//! - Invocations for the same user are serialized; at most one event per
//!   kind per user per day is committed.
//! - No event is created without biometric proof from the same invocation.
//! - Commit uses the same location sample that passed the geofence check.
//! - The coordinate subscription is dropped before evaluation and on every
//!   early exit; dropping the `mark` future cancels all pending waits.
//! - Every invocation produces exactly one `AttendanceOutcome`.

use crate::capability::biometric::{BiometricAuthenticator, BiometricError};
use crate::capability::location::{LocationProvider, LocationUpdate};
use crate::config::{EnrollmentPolicy, WorkflowConfig};
use crate::geofence::{distance_m, is_within_office};
use crate::model::attendance::{AttendanceDay, AttendanceEvent, AttendanceKind, DayAttendanceStatus};
use crate::model::geo::Coordinate;
use crate::model::user::{normalize_email, User};
use crate::repo::record_store::{RecordStore, RepoError};
use crate::service::clock::{Clock, SystemClock};
use crate::service::outcome::{AttendanceError, AttendanceOutcome, OutcomeKind};
use crate::service::state_tracker::AttendanceStateTracker;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

type UserLock = tokio::sync::Mutex<()>;

/// Attendance use-case orchestrator.
pub struct AttendanceWorkflow<S: RecordStore> {
    store: Arc<S>,
    tracker: AttendanceStateTracker<S>,
    authenticator: BiometricAuthenticator,
    location: LocationProvider,
    config: WorkflowConfig,
    clock: Arc<dyn Clock>,
    user_locks: Mutex<HashMap<String, Arc<UserLock>>>,
}

impl<S: RecordStore> AttendanceWorkflow<S> {
    pub fn new(
        store: Arc<S>,
        authenticator: BiometricAuthenticator,
        location: LocationProvider,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            tracker: AttendanceStateTracker::new(Arc::clone(&store)),
            store,
            authenticator,
            location,
            config,
            clock: Arc::new(SystemClock),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the wall clock used for day boundaries and timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Forgets cached day statuses; call when a new UI session starts.
    pub fn begin_session(&self) {
        self.tracker.begin_session();
    }

    pub async fn check_in(&self, email: &str) -> AttendanceOutcome {
        self.mark(email, AttendanceKind::CheckIn).await
    }

    pub async fn check_out(&self, email: &str) -> AttendanceOutcome {
        self.mark(email, AttendanceKind::CheckOut).await
    }

    /// Today's status for rendering check-in/check-out availability.
    pub fn day_status(&self, email: &str) -> Result<DayAttendanceStatus, AttendanceError> {
        let user = self.resolve_user(email)?;
        let day = AttendanceDay::containing(self.clock.now());
        self.tracker.status(user.uuid, &day).map_err(persistence_failed)
    }

    /// Runs one check-in or check-out invocation to its single outcome.
    pub async fn mark(&self, email: &str, kind: AttendanceKind) -> AttendanceOutcome {
        let started_at = Instant::now();
        info!(
            "event=attendance_mark module=workflow status=start kind={}",
            kind.as_str()
        );

        let lock_key = normalize_email(email);
        let user_lock = self.user_lock(&lock_key);
        let serialized = user_lock.lock().await;

        let outcome = match self.run(email, kind).await {
            Ok(outcome) => outcome,
            Err(err) => AttendanceOutcome::rejected(kind, err),
        };
        drop(serialized);
        self.release_user_lock(&lock_key, user_lock);

        match &outcome.error {
            None => info!(
                "event=attendance_mark module=workflow status=ok kind={} outcome={} duration_ms={}",
                kind.as_str(),
                outcome.kind.as_str(),
                started_at.elapsed().as_millis()
            ),
            Some(err) => warn!(
                "event=attendance_mark module=workflow status=rejected kind={} outcome={} \
                 error_code={} transient={} duration_ms={}",
                kind.as_str(),
                OutcomeKind::Rejected.as_str(),
                err.code(),
                err.is_transient(),
                started_at.elapsed().as_millis()
            ),
        }
        outcome
    }

    async fn run(
        &self,
        email: &str,
        kind: AttendanceKind,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        let mut user = self.resolve_user(email)?;
        let day = AttendanceDay::containing(self.clock.now());
        let status = self
            .tracker
            .status(user.uuid, &day)
            .map_err(persistence_failed)?;
        if status.is_marked(kind) {
            return Err(AttendanceError::AlreadyMarked);
        }
        debug!(
            "event=attendance_precondition module=workflow status=ok user={} day={} enrolled={}",
            user.uuid, day.date, user.biometric_enrolled
        );

        if user.biometric_enrolled {
            self.verify_owner().await?;
        } else {
            self.enroll_owner(&mut user).await?;
            if self.config.enrollment_policy == EnrollmentPolicy::EnrollThenRetry {
                return Ok(AttendanceOutcome::enrolled(kind));
            }
        }

        let location = self.await_first_fix().await?;
        if !is_within_office(location, &self.config.geofence) {
            return Err(AttendanceError::OutOfGeofence {
                distance_m: distance_m(location, self.config.geofence.office),
            });
        }

        // Commit into the day the precondition checked, even across midnight.
        let recorded_at_ms = day.range.clamp(self.clock.now().timestamp_millis());
        let event = AttendanceEvent::new(user.uuid, kind, recorded_at_ms, location);
        self.tracker
            .record_event(&event, &day)
            .map_err(persistence_failed)?;
        Ok(AttendanceOutcome::success(event))
    }

    fn resolve_user(&self, email: &str) -> Result<User, AttendanceError> {
        self.store
            .find_user(email)
            .map_err(persistence_failed)?
            .ok_or(AttendanceError::UserNotFound)
    }

    async fn verify_owner(&self) -> Result<(), AttendanceError> {
        let verdict = bounded(
            self.config.biometric_timeout,
            self.authenticator.verify_owner(&self.config.verify_reason),
        )
        .await;

        match verdict {
            Some(Ok(())) => Ok(()),
            Some(Err(BiometricError::Unavailable(reason))) => {
                Err(AttendanceError::BiometricUnavailable(reason))
            }
            Some(Err(err)) => Err(AttendanceError::BiometricFailed(err.to_string())),
            None => Err(AttendanceError::BiometricFailed(
                "timed out waiting for the biometric prompt".to_string(),
            )),
        }
    }

    async fn enroll_owner(&self, user: &mut User) -> Result<(), AttendanceError> {
        let enrolled = bounded(
            self.config.biometric_timeout,
            self.authenticator.enroll_owner(&self.config.enroll_reason),
        )
        .await
        .unwrap_or(false);
        if !enrolled {
            return Err(AttendanceError::EnrollmentFailed);
        }

        user.mark_biometric_enrolled();
        self.store.save_user(user).map_err(persistence_failed)?;
        info!(
            "event=biometric_enroll module=workflow status=persisted user={}",
            user.uuid
        );
        Ok(())
    }

    async fn await_first_fix(&self) -> Result<Coordinate, AttendanceError> {
        let mut subscription = self.location.request_current_coordinate();
        let update = bounded(self.config.location_timeout, subscription.next()).await;
        drop(subscription);

        match update {
            Some(Some(LocationUpdate::Fix(coordinate))) => Ok(coordinate),
            Some(Some(LocationUpdate::Denied)) => Err(AttendanceError::LocationDenied),
            Some(Some(LocationUpdate::Failed(message))) => {
                Err(AttendanceError::LocationFailed(message))
            }
            Some(None) => Err(AttendanceError::LocationFailed(
                "location updates ended before a fix arrived".to_string(),
            )),
            None => Err(AttendanceError::LocationFailed(
                "timed out waiting for a location fix".to_string(),
            )),
        }
    }

    fn user_lock(&self, key: &str) -> Arc<UserLock> {
        Arc::clone(self.locks().entry(key.to_string()).or_default())
    }

    /// Forgets `key`'s lock once no other invocation holds or awaits it.
    fn release_user_lock(&self, key: &str, lock: Arc<UserLock>) {
        let mut locks = self.locks();
        // One reference in the map plus `lock`; waiters hold their own clones.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<String, Arc<UserLock>>> {
        self.user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Awaits `future`, giving up after `limit` when one is set.
async fn bounded<F: Future>(limit: Option<Duration>, future: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}

fn persistence_failed(err: RepoError) -> AttendanceError {
    AttendanceError::PersistenceFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::AttendanceWorkflow;
    use crate::capability::biometric::BiometricAuthenticator;
    use crate::capability::location::LocationProvider;
    use crate::capability::simulated::{
        SimulatedBiometric, SimulatedBiometricSensor, SimulatedLocationService,
    };
    use crate::config::WorkflowConfig;
    use crate::model::geo::Coordinate;
    use crate::model::user::User;
    use crate::repo::record_store::{RecordStore, SqliteRecordStore};
    use std::sync::Arc;

    fn workflow() -> AttendanceWorkflow<SqliteRecordStore> {
        let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
        let mut user = User::new("liz@gmail.com", "Liz");
        user.biometric_enrolled = true;
        store.save_user(&user).unwrap();

        let office = Coordinate::new(37.7749, -122.4194);
        AttendanceWorkflow::new(
            store,
            BiometricAuthenticator::new(Arc::new(SimulatedBiometricSensor::new(
                SimulatedBiometric::Match,
            ))),
            LocationProvider::new(Arc::new(SimulatedLocationService::authorized_at(office))),
            WorkflowConfig::default(),
        )
    }

    #[tokio::test]
    async fn user_locks_are_dropped_after_each_invocation() {
        let workflow = workflow();

        workflow.check_in("nobody@example.com").await;
        workflow.check_in("LIZ@gmail.com").await;
        let (first, second) = tokio::join!(
            workflow.check_out("liz@gmail.com"),
            workflow.check_out("liz@gmail.com")
        );
        assert!(first.is_success() != second.is_success());

        assert!(workflow.locks().is_empty());
    }
}
