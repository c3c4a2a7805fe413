//! In-process simulated platform capabilities.
//!
//! Used by desktop development builds (no sensors) and by tests. Both
//! simulators record how they were driven so callers can assert on prompts,
//! start/stop calls and evaluations.

use crate::capability::biometric::{BiometricError, BiometricSensor};
use crate::capability::location::{LocationAuthorization, LocationEvent, LocationService};
use crate::model::geo::Coordinate;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 16;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct SimulatedLocationState {
    authorization: LocationAuthorization,
    /// Answer given when a `NotDetermined` prompt is shown.
    prompt_answer: LocationAuthorization,
    position: Option<Coordinate>,
    failure: Option<String>,
    updating: bool,
    prompts: usize,
    start_calls: usize,
    stop_calls: usize,
}

/// Simulated location service with a settable device position.
///
/// Every platform start delivers the current position as one fix.
pub struct SimulatedLocationService {
    state: Mutex<SimulatedLocationState>,
    events: broadcast::Sender<LocationEvent>,
}

impl SimulatedLocationService {
    pub fn new(authorization: LocationAuthorization) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(SimulatedLocationState {
                authorization,
                prompt_answer: LocationAuthorization::Authorized,
                position: None,
                failure: None,
                updating: false,
                prompts: 0,
                start_calls: 0,
                stop_calls: 0,
            }),
            events,
        }
    }

    /// Authorized service reporting `position`.
    pub fn authorized_at(position: Coordinate) -> Self {
        let service = Self::new(LocationAuthorization::Authorized);
        service.set_position(Some(position));
        service
    }

    pub fn set_position(&self, position: Option<Coordinate>) {
        lock(&self.state).position = position;
    }

    pub fn set_prompt_answer(&self, answer: LocationAuthorization) {
        lock(&self.state).prompt_answer = answer;
    }

    /// Makes the next platform start report a hard failure instead of a fix.
    pub fn fail_next_start(&self, message: impl Into<String>) {
        lock(&self.state).failure = Some(message.into());
    }

    /// Changes authorization as if the user edited system settings.
    pub fn change_authorization(&self, authorization: LocationAuthorization) {
        {
            let mut state = lock(&self.state);
            state.authorization = authorization;
            if authorization != LocationAuthorization::Authorized {
                state.updating = false;
            }
        }
        self.emit(LocationEvent::AuthorizationChanged(authorization));
    }

    /// Pushes one batch of fixes while updates are running.
    pub fn push_fixes(&self, fixes: Vec<Coordinate>) {
        if lock(&self.state).updating {
            self.emit(LocationEvent::Fixes(fixes));
        }
    }

    pub fn is_updating(&self) -> bool {
        lock(&self.state).updating
    }

    pub fn prompt_count(&self) -> usize {
        lock(&self.state).prompts
    }

    pub fn start_calls(&self) -> usize {
        lock(&self.state).start_calls
    }

    pub fn stop_calls(&self) -> usize {
        lock(&self.state).stop_calls
    }

    fn emit(&self, event: LocationEvent) {
        // No receivers simply means nobody is waiting for a fix.
        let _ = self.events.send(event);
    }
}

impl LocationService for SimulatedLocationService {
    fn authorization(&self) -> LocationAuthorization {
        lock(&self.state).authorization
    }

    fn request_authorization(&self) {
        let answer = {
            let mut state = lock(&self.state);
            state.prompts += 1;
            if state.authorization != LocationAuthorization::NotDetermined
                || state.prompt_answer == LocationAuthorization::NotDetermined
            {
                return;
            }
            state.authorization = state.prompt_answer;
            state.prompt_answer
        };
        self.emit(LocationEvent::AuthorizationChanged(answer));
    }

    fn start_updates(&self) {
        let event = {
            let mut state = lock(&self.state);
            if state.updating {
                return;
            }
            state.updating = true;
            state.start_calls += 1;
            match state.failure.take() {
                Some(message) => Some(LocationEvent::Failed(message)),
                None => state.position.map(|position| LocationEvent::Fixes(vec![position])),
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn stop_updates(&self) {
        let mut state = lock(&self.state);
        state.updating = false;
        state.stop_calls += 1;
    }

    fn subscribe(&self) -> broadcast::Receiver<LocationEvent> {
        self.events.subscribe()
    }
}

/// Scripted result of a simulated biometric prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedBiometric {
    Match,
    Mismatch,
    Cancel,
    Unavailable(String),
    SensorError(String),
}

/// Simulated biometric sensor.
pub struct SimulatedBiometricSensor {
    behavior: Mutex<SimulatedBiometric>,
    latency: Mutex<Duration>,
    evaluations: AtomicUsize,
    last_reason: Mutex<Option<String>>,
}

impl SimulatedBiometricSensor {
    pub fn new(behavior: SimulatedBiometric) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            latency: Mutex::new(Duration::ZERO),
            evaluations: AtomicUsize::new(0),
            last_reason: Mutex::new(None),
        }
    }

    pub fn set_behavior(&self, behavior: SimulatedBiometric) {
        *lock(&self.behavior) = behavior;
    }

    /// Delays every evaluation, simulating a user looking at the prompt.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Number of prompts actually shown.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn last_reason(&self) -> Option<String> {
        lock(&self.last_reason).clone()
    }
}

#[async_trait]
impl BiometricSensor for SimulatedBiometricSensor {
    fn availability(&self) -> Result<(), BiometricError> {
        match &*lock(&self.behavior) {
            SimulatedBiometric::Unavailable(reason) => {
                Err(BiometricError::Unavailable(reason.clone()))
            }
            _ => Ok(()),
        }
    }

    async fn evaluate(&self, reason: &str) -> Result<bool, BiometricError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_reason) = Some(reason.to_string());

        let latency = *lock(&self.latency);
        if latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(latency).await;
        }

        let behavior = lock(&self.behavior).clone();
        match behavior {
            SimulatedBiometric::Match => Ok(true),
            SimulatedBiometric::Mismatch => Ok(false),
            SimulatedBiometric::Cancel => Err(BiometricError::Cancelled),
            SimulatedBiometric::Unavailable(reason) => Err(BiometricError::Unavailable(reason)),
            SimulatedBiometric::SensorError(message) => Err(BiometricError::Sensor(message)),
        }
    }
}
