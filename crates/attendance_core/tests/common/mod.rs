#![allow(dead_code)]

use attendance_core::{
    distance_m, AttendanceEvent, AttendanceWorkflow, BiometricAuthenticator, Clock, Coordinate,
    LocationProvider, RecordStore, RepoError, RepoResult, SimulatedBiometric,
    SimulatedBiometricSensor, SimulatedLocationService, SqliteRecordStore, TimeRange, User,
    UserId, WorkflowConfig,
};
use chrono::{DateTime, FixedOffset};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const OFFICE: Coordinate = Coordinate {
    latitude: 37.7749,
    longitude: -122.4194,
};

/// Returns a point `meters` due north of `origin`.
pub fn north_of(origin: Coordinate, meters: f64) -> Coordinate {
    let point = Coordinate::new(origin.latitude + meters / 111_195.0, origin.longitude);
    assert!((distance_m(origin, point) - meters).abs() < 1.0);
    point
}

/// Test clock. Queued instants are returned one per call; the last one sticks.
pub struct FixedClock {
    instants: Mutex<VecDeque<DateTime<FixedOffset>>>,
}

fn instant(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

impl FixedClock {
    pub fn at(rfc3339: &str) -> Self {
        Self {
            instants: Mutex::new(VecDeque::from([instant(rfc3339)])),
        }
    }

    pub fn set(&self, rfc3339: &str) {
        self.queue(&[rfc3339]);
    }

    pub fn queue(&self, rfc3339s: &[&str]) {
        *self.instants.lock().unwrap() = rfc3339s.iter().map(|value| instant(value)).collect();
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let mut instants = self.instants.lock().unwrap();
        if instants.len() > 1 {
            return instants.pop_front().unwrap();
        }
        *instants.front().unwrap()
    }
}

/// Record store wrapper that counts writes and can inject failures.
pub struct SpyStore {
    inner: SqliteRecordStore,
    pub appended: AtomicUsize,
    pub user_saves: AtomicUsize,
    pub fail_find_user: AtomicBool,
    pub fail_find_events: AtomicBool,
    pub fail_append: AtomicBool,
}

impl SpyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteRecordStore::open_in_memory().unwrap(),
            appended: AtomicUsize::new(0),
            user_saves: AtomicUsize::new(0),
            fail_find_user: AtomicBool::new(false),
            fail_find_events: AtomicBool::new(false),
            fail_append: AtomicBool::new(false),
        }
    }

    pub fn appended(&self) -> usize {
        self.appended.load(Ordering::SeqCst)
    }

    pub fn all_events(&self, user_uuid: UserId) -> Vec<AttendanceEvent> {
        self.inner
            .find_events(
                user_uuid,
                TimeRange {
                    start_ms: i64::MIN,
                    end_ms: i64::MAX,
                },
            )
            .unwrap()
    }

    pub fn reload_user(&self, email: &str) -> User {
        self.inner.find_user(email).unwrap().unwrap()
    }
}

fn injected(flag: &AtomicBool, what: &str) -> RepoResult<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(RepoError::InvalidData(format!("injected {what} failure")));
    }
    Ok(())
}

impl RecordStore for SpyStore {
    fn find_user(&self, email: &str) -> RepoResult<Option<User>> {
        injected(&self.fail_find_user, "find_user")?;
        self.inner.find_user(email)
    }

    fn find_events(&self, user_uuid: UserId, range: TimeRange) -> RepoResult<Vec<AttendanceEvent>> {
        injected(&self.fail_find_events, "find_events")?;
        self.inner.find_events(user_uuid, range)
    }

    fn save_user(&self, user: &User) -> RepoResult<()> {
        self.user_saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_user(user)
    }

    fn append_event(&self, event: &AttendanceEvent) -> RepoResult<()> {
        injected(&self.fail_append, "append_event")?;
        self.inner.append_event(event)?;
        self.appended.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub workflow: AttendanceWorkflow<SpyStore>,
    pub store: Arc<SpyStore>,
    pub location: Arc<SimulatedLocationService>,
    pub biometric: Arc<SimulatedBiometricSensor>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    /// Office geofence with radius 100 m, device standing at the office.
    pub fn new() -> Self {
        Self::with_config(WorkflowConfig::default())
    }

    pub fn with_config(config: WorkflowConfig) -> Self {
        let store = Arc::new(SpyStore::new());
        let location = Arc::new(SimulatedLocationService::authorized_at(OFFICE));
        let biometric = Arc::new(SimulatedBiometricSensor::new(SimulatedBiometric::Match));
        let clock = Arc::new(FixedClock::at("2024-08-06T09:00:00-07:00"));

        let workflow = AttendanceWorkflow::new(
            Arc::clone(&store),
            BiometricAuthenticator::new(biometric.clone()),
            LocationProvider::new(location.clone()),
            config,
        )
        .with_clock(clock.clone());

        Self {
            workflow,
            store,
            location,
            biometric,
            clock,
        }
    }

    pub fn seed_user(&self, email: &str, enrolled: bool) -> User {
        let mut user = User::new(email, "Liz");
        user.biometric_enrolled = enrolled;
        self.store.save_user(&user).unwrap();
        self.store.user_saves.store(0, Ordering::SeqCst);
        user
    }
}
