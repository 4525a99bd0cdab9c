//! Engine use-cases.
//!
//! # Responsibility
//! - `eligibility`, `jury`, `ledger` and `aggregate` are pure functions over
//!   a `State` snapshot.
//! - `grading_service` wraps them with persistence, clock, randomness and
//!   role checks for callers.

pub mod aggregate;
pub mod eligibility;
pub mod grading_service;
pub mod jury;
pub mod ledger;
pub mod views;
