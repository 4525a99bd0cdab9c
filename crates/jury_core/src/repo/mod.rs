//! Persistence layer for engine state.
//!
//! # Responsibility
//! - Define the load/save contract the services depend on.
//! - Isolate SQLite and JSON details from the grading logic.
//!
//! # Invariants
//! - Store writes enforce `State::validate()` before persistence.

pub mod state_repo;
