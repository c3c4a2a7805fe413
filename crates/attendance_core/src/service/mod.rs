//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate capability and record-store calls into the attendance
//!   check-in/check-out use case.
//! - Keep presentation layers decoupled from storage and platform details.

pub mod attendance_workflow;
pub mod clock;
pub mod outcome;
pub mod state_tracker;
