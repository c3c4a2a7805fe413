//! Attendance domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the attendance workflow.
//!
//! # Invariants
//! - Users and events are identified by stable UUIDs.
//! - Attendance events are append-only.

pub mod attendance;
pub mod geo;
pub mod user;
