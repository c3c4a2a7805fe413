//! Per-user-per-day attendance status tracking.
//!
//! # Responsibility
//! - Derive `DayAttendanceStatus` from the record store for one user/day.
//! - Append committed events and update the in-memory status.
//!
//! # Invariants
//! - A failed status query is returned as an error, never as "not marked".
//! - In-memory status changes only after the store accepted the event.
//! - Cached statuses live for one session; `begin_session` drops them.
//! - Only the most recently touched day stays cached.

use crate::model::attendance::{AttendanceDay, AttendanceEvent, DayAttendanceStatus};
use crate::model::user::UserId;
use crate::repo::record_store::{RecordStore, RepoResult};
use chrono::NaiveDate;
use log::{error, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type StatusKey = (UserId, NaiveDate);
type StatusCache = HashMap<StatusKey, DayAttendanceStatus>;

/// Session-scoped attendance status cache over a record store.
pub struct AttendanceStateTracker<S: RecordStore> {
    store: Arc<S>,
    statuses: Mutex<StatusCache>,
}

impl<S: RecordStore> AttendanceStateTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    /// Drops every cached status so the next read recomputes from storage.
    pub fn begin_session(&self) {
        self.cache().clear();
    }

    /// Recomputes status from storage, replacing any cached value.
    pub fn load_status(
        &self,
        user_uuid: UserId,
        day: &AttendanceDay,
    ) -> RepoResult<DayAttendanceStatus> {
        let events = match self.store.find_events(user_uuid, day.range) {
            Ok(events) => events,
            Err(err) => {
                error!(
                    "event=attendance_status_load module=state_tracker status=error \
                     user={} day={} error={}",
                    user_uuid, day.date, err
                );
                return Err(err);
            }
        };

        let status = DayAttendanceStatus::from_events(&events);
        info!(
            "event=attendance_status_load module=state_tracker status=ok \
             user={} day={} checked_in={} checked_out={}",
            user_uuid, day.date, status.has_checked_in, status.has_checked_out
        );
        self.cache_for(day).insert((user_uuid, day.date), status);
        Ok(status)
    }

    /// Returns the cached status, loading it on first use in this session.
    pub fn status(
        &self,
        user_uuid: UserId,
        day: &AttendanceDay,
    ) -> RepoResult<DayAttendanceStatus> {
        if let Some(status) = self.cache().get(&(user_uuid, day.date)).copied() {
            return Ok(status);
        }
        self.load_status(user_uuid, day)
    }

    /// Appends `event` and marks its kind for `day`.
    pub fn record_event(
        &self,
        event: &AttendanceEvent,
        day: &AttendanceDay,
    ) -> RepoResult<DayAttendanceStatus> {
        self.store.append_event(event)?;

        let mut cache = self.cache_for(day);
        let status = cache.entry((event.user_uuid, day.date)).or_default();
        status.mark(event.kind);
        Ok(*status)
    }

    fn cache(&self) -> MutexGuard<'_, StatusCache> {
        // Entries are plain values; a panicked writer cannot leave one torn.
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cache guard with every day other than `day` evicted.
    fn cache_for(&self, day: &AttendanceDay) -> MutexGuard<'_, StatusCache> {
        let mut cache = self.cache();
        cache.retain(|(_, date), _| *date == day.date);
        cache
    }
}
