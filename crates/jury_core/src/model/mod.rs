//! Domain model for users, projects, deliverables and grades.
//!
//! # Responsibility
//! - Define canonical records shared by the resolver, scheduler and ledger.
//! - Enforce per-record invariants at construction and on load.
//!
//! # Invariants
//! - Every record is identified by a stable UUID v4.
//! - Nothing is ever deleted; deliverable rosters and grades only grow or
//!   update in place.
//! - All timestamps are Unix epoch milliseconds.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod deliverable;
pub mod grade;
pub mod project;
pub mod state;
pub mod user;

/// Validation failures raised by model constructors and `State::validate()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Username is blank or contains unsupported characters.
    InvalidUsername(String),
    /// A required title is blank after trim.
    EmptyTitle,
    /// Project team has no members.
    EmptyTeam,
    /// Project owner is not listed in the team.
    OwnerNotInTeam(String),
    /// Deliverable jury size below the minimum of 3.
    JurySizeTooSmall(u32),
    /// Deliverable edit window below 1 minute.
    EditWindowTooShort(u32),
    /// Deliverable link is not an http(s) URI.
    InvalidLink(String),
    /// Deliverable due time is not in the future at creation.
    DueInPast { due_at: i64, now: i64 },
    /// Same id listed twice in one deliverable roster.
    DuplicateJuror(uuid::Uuid),
    /// A juror belongs to the owning project team.
    JurorOnTeam(uuid::Uuid),
    /// Two users share a username (case-insensitive).
    DuplicateUsername(String),
    /// Two grades exist for the same deliverable/evaluator pair.
    DuplicateGrade {
        deliverable_id: uuid::Uuid,
        evaluator_id: uuid::Uuid,
    },
    /// A record references an id that is absent from the state.
    DanglingReference(String),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUsername(value) => write!(
                f,
                "invalid username `{value}`; expected 1-32 chars of [A-Za-z0-9_.-]"
            ),
            Self::EmptyTitle => write!(f, "title must not be blank"),
            Self::EmptyTeam => write!(f, "team must have at least one member"),
            Self::OwnerNotInTeam(username) => {
                write!(f, "owner `{username}` must be a member of the team")
            }
            Self::JurySizeTooSmall(size) => {
                write!(f, "jury size must be at least 3, got {size}")
            }
            Self::EditWindowTooShort(minutes) => {
                write!(f, "edit window must be at least 1 minute, got {minutes}")
            }
            Self::InvalidLink(value) => write!(f, "link must be an http(s) URI: `{value}`"),
            Self::DueInPast { due_at, now } => {
                write!(f, "due time {due_at} is not after current time {now}")
            }
            Self::DuplicateJuror(id) => write!(f, "juror listed twice: {id}"),
            Self::JurorOnTeam(id) => write!(f, "juror {id} belongs to the evaluated team"),
            Self::DuplicateUsername(username) => write!(f, "username already taken: {username}"),
            Self::DuplicateGrade {
                deliverable_id,
                evaluator_id,
            } => write!(
                f,
                "duplicate grade for deliverable {deliverable_id} by evaluator {evaluator_id}"
            ),
            Self::DanglingReference(details) => write!(f, "dangling reference: {details}"),
        }
    }
}

impl Error for ModelValidationError {}
