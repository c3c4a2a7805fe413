//! Platform capability contracts consumed by the attendance workflow.
//!
//! # Responsibility
//! - Wrap platform location and biometric services behind injected traits.
//! - Provide simulated implementations for sensorless builds and tests.
//!
//! # Invariants
//! - Capabilities are injected; there is no process-wide singleton.

pub mod biometric;
pub mod location;
pub mod simulated;
