//! Attendance event and per-day status model.
//!
//! # Responsibility
//! - Define the immutable, append-only attendance event record.
//! - Define the derived per-user-per-day check-in/check-out status.
//! - Resolve calendar-day boundaries as half-open epoch-ms ranges.
//!
//! # Invariants
//! - Events are never mutated after creation.
//! - `DayAttendanceStatus` is derived from events, never stored.
//! - Day ranges are half-open: `[start_ms, end_ms)`.

use crate::model::geo::Coordinate;
use crate::model::user::UserId;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one attendance event.
pub type AttendanceEventId = Uuid;

/// Attendance action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceKind {
    CheckIn,
    CheckOut,
}

impl AttendanceKind {
    /// Title label, e.g. `Check-In`.
    pub fn label(self) -> &'static str {
        match self {
            Self::CheckIn => "Check-In",
            Self::CheckOut => "Check-Out",
        }
    }

    /// Verb phrase used in sentences, e.g. `check in`.
    pub fn verb(self) -> &'static str {
        match self {
            Self::CheckIn => "check in",
            Self::CheckOut => "check out",
        }
    }

    /// Past-tense phrase, e.g. `checked in`.
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::CheckIn => "checked in",
            Self::CheckOut => "checked out",
        }
    }

    /// Stable storage/log value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "check_in" => Some(Self::CheckIn),
            "check_out" => Some(Self::CheckOut),
            _ => None,
        }
    }
}

/// One committed check-in or check-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub uuid: AttendanceEventId,
    pub user_uuid: UserId,
    pub kind: AttendanceKind,
    /// Unix epoch milliseconds.
    pub recorded_at_ms: i64,
    /// Measured location that passed the geofence check.
    pub location: Coordinate,
}

impl AttendanceEvent {
    pub fn new(
        user_uuid: UserId,
        kind: AttendanceKind,
        recorded_at_ms: i64,
        location: Coordinate,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            user_uuid,
            kind,
            recorded_at_ms,
            location,
        }
    }
}

/// Derived check-in/check-out flags for one user and one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAttendanceStatus {
    pub has_checked_in: bool,
    pub has_checked_out: bool,
}

impl DayAttendanceStatus {
    /// Derives status by scanning one day's events.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a AttendanceEvent>) -> Self {
        let mut status = Self::default();
        for event in events {
            status.mark(event.kind);
        }
        status
    }

    pub fn is_marked(&self, kind: AttendanceKind) -> bool {
        match kind {
            AttendanceKind::CheckIn => self.has_checked_in,
            AttendanceKind::CheckOut => self.has_checked_out,
        }
    }

    pub fn mark(&mut self, kind: AttendanceKind) {
        match kind {
            AttendanceKind::CheckIn => self.has_checked_in = true,
            AttendanceKind::CheckOut => self.has_checked_out = true,
        }
    }
}

/// Half-open epoch-ms interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeRange {
    pub fn contains(&self, epoch_ms: i64) -> bool {
        self.start_ms <= epoch_ms && epoch_ms < self.end_ms
    }

    /// Pulls `epoch_ms` into the range; values past the end land on its last millisecond.
    pub fn clamp(&self, epoch_ms: i64) -> i64 {
        epoch_ms.min(self.end_ms - 1).max(self.start_ms)
    }
}

/// One calendar day in the caller's UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceDay {
    pub date: NaiveDate,
    pub range: TimeRange,
}

impl AttendanceDay {
    /// Resolves the day containing `now`, using `now`'s offset for midnight.
    ///
    /// A fixed offset is used for both boundaries, so DST transition days are
    /// always treated as 24 hours long.
    pub fn containing(now: DateTime<FixedOffset>) -> Self {
        let offset = *now.offset();
        let date = now.date_naive();
        let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
        Self {
            date,
            range: TimeRange {
                start_ms: midnight_ms(offset, date),
                end_ms: midnight_ms(offset, next),
            },
        }
    }
}

fn midnight_ms(offset: FixedOffset, date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    match offset.from_local_datetime(&naive).single() {
        Some(local) => local.timestamp_millis(),
        None => naive.and_utc().timestamp_millis(),
    }
}
