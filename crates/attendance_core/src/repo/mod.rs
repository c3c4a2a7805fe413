//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store contract consumed by the workflow.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`Conflict`, `InvalidData`) in
//!   addition to DB transport errors.

pub mod record_store;
