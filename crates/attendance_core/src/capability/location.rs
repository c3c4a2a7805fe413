//! Location capability: platform contract and provider state machine.
//!
//! # Responsibility
//! - Define the platform location service contract (authorization query,
//!   start/stop updates, pushed event stream).
//! - Turn platform events into a per-request coordinate sequence.
//!
//! # Invariants
//! - Denied/restricted authorization resolves `Denied` without prompting.
//! - Platform updates are started once for any number of live subscriptions
//!   and stopped when the last subscription is dropped.
//! - A platform error terminates the sequence.

use crate::model::geo::Coordinate;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Platform authorization state for location access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationAuthorization {
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

impl LocationAuthorization {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotDetermined => "not_determined",
            Self::Denied => "denied",
            Self::Restricted => "restricted",
            Self::Authorized => "authorized",
        }
    }
}

/// Event pushed by the platform location service.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    AuthorizationChanged(LocationAuthorization),
    /// One delivery batch; the last entry is the most recent fix.
    Fixes(Vec<Coordinate>),
    /// Hard failure reported by the platform (e.g. sensor fault).
    Failed(String),
}

/// Platform location service contract.
///
/// Implementations push events into the channel returned by `subscribe`.
/// Authorization prompts and update starts are fire-and-forget; their
/// results arrive as events.
pub trait LocationService: Send + Sync {
    fn authorization(&self) -> LocationAuthorization;
    fn request_authorization(&self);
    fn start_updates(&self);
    fn stop_updates(&self);
    fn subscribe(&self) -> broadcast::Receiver<LocationEvent>;
}

/// One resolution of a coordinate request.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdate {
    Fix(Coordinate),
    Denied,
    Failed(String),
}

#[derive(Default)]
struct UpdateRefCount {
    active: Mutex<usize>,
}

/// Wraps a platform location service behind a request/subscription API.
#[derive(Clone)]
pub struct LocationProvider {
    service: Arc<dyn LocationService>,
    updates: Arc<UpdateRefCount>,
}

impl LocationProvider {
    pub fn new(service: Arc<dyn LocationService>) -> Self {
        Self {
            service,
            updates: Arc::new(UpdateRefCount::default()),
        }
    }

    /// Requests the current coordinate as a cancellable sequence.
    ///
    /// - `NotDetermined`: prompts and waits for the authorization event.
    /// - `Denied`/`Restricted`: the first `next()` resolves `Denied`.
    /// - `Authorized`: starts (or joins) platform updates.
    ///
    /// Dropping the returned handle releases its share of platform updates.
    pub fn request_current_coordinate(&self) -> CoordinateSubscription {
        // Subscribe before prompting/starting so the first event is not missed.
        let events = self.service.subscribe();
        let mut subscription = CoordinateSubscription {
            service: Arc::clone(&self.service),
            updates: Arc::clone(&self.updates),
            events,
            holds_updates: false,
            pending: None,
            finished: false,
        };

        let authorization = self.service.authorization();
        info!(
            "event=location_request module=location status=start authorization={}",
            authorization.as_str()
        );
        match authorization {
            LocationAuthorization::NotDetermined => self.service.request_authorization(),
            LocationAuthorization::Authorized => subscription.acquire_updates(),
            LocationAuthorization::Denied | LocationAuthorization::Restricted => {
                subscription.pending = Some(LocationUpdate::Denied);
            }
        }
        subscription
    }

    /// Returns whether any live subscription currently holds platform updates.
    pub fn is_updating(&self) -> bool {
        self.updates.active.lock().map_or(false, |active| *active > 0)
    }
}

/// Per-request coordinate sequence.
///
/// Yields every fix until dropped; `Denied` and `Failed` end the sequence.
pub struct CoordinateSubscription {
    service: Arc<dyn LocationService>,
    updates: Arc<UpdateRefCount>,
    events: broadcast::Receiver<LocationEvent>,
    holds_updates: bool,
    pending: Option<LocationUpdate>,
    finished: bool,
}

impl CoordinateSubscription {
    /// Waits for the next resolution. Returns `None` once the sequence ended.
    pub async fn next(&mut self) -> Option<LocationUpdate> {
        if let Some(update) = self.pending.take() {
            self.finished = !matches!(update, LocationUpdate::Fix(_));
            return Some(update);
        }

        while !self.finished {
            let event = match self.events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("event=location_update module=location status=lagged skipped={skipped}");
                    continue;
                }
                Err(RecvError::Closed) => {
                    self.finish();
                    return None;
                }
            };

            match event {
                LocationEvent::AuthorizationChanged(LocationAuthorization::Authorized) => {
                    self.acquire_updates();
                }
                LocationEvent::AuthorizationChanged(LocationAuthorization::NotDetermined) => {}
                LocationEvent::AuthorizationChanged(status) => {
                    info!(
                        "event=location_update module=location status=denied authorization={}",
                        status.as_str()
                    );
                    self.finish();
                    return Some(LocationUpdate::Denied);
                }
                LocationEvent::Fixes(fixes) => {
                    if !self.holds_updates {
                        continue;
                    }
                    if let Some(latest) = fixes.last() {
                        debug!(
                            "event=location_update module=location status=ok batch={}",
                            fixes.len()
                        );
                        return Some(LocationUpdate::Fix(*latest));
                    }
                }
                LocationEvent::Failed(message) => {
                    warn!("event=location_update module=location status=error error={message}");
                    self.finish();
                    return Some(LocationUpdate::Failed(message));
                }
            }
        }
        None
    }

    fn acquire_updates(&mut self) {
        if self.holds_updates {
            return;
        }
        // A poisoned count only means another holder panicked; the counter
        // itself is still consistent.
        let mut active = self
            .updates
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *active == 0 {
            self.service.start_updates();
        }
        *active += 1;
        self.holds_updates = true;
    }

    fn release_updates(&mut self) {
        if !self.holds_updates {
            return;
        }
        let mut active = self
            .updates
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.service.stop_updates();
            info!("event=location_stop module=location status=ok");
        }
        self.holds_updates = false;
    }

    fn finish(&mut self) {
        self.finished = true;
        self.release_updates();
    }
}

impl Drop for CoordinateSubscription {
    fn drop(&mut self) {
        self.release_updates();
    }
}
