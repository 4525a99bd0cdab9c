//! Engine error type returned by every caller-facing operation.
//!
//! # Invariants
//! - Errors are returned synchronously and never retried inside core.
//! - An operation that returns an error has not written any state.

use crate::model::deliverable::DeliverableId;
use crate::model::grade::GradeValueError;
use crate::model::project::ProjectId;
use crate::model::user::UserId;
use crate::model::ModelValidationError;
use crate::repo::state_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Reference to a record that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    User(UserId),
    Username(String),
    Project(ProjectId),
    Deliverable(DeliverableId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {id}"),
            Self::Username(name) => write!(f, "user `{name}`"),
            Self::Project(id) => write!(f, "project {id}"),
            Self::Deliverable(id) => write!(f, "deliverable {id}"),
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    /// Referenced project, deliverable or user is absent.
    NotFound(EntityRef),
    /// Grade submitted by someone outside the deliverable's jury.
    NotJuror {
        deliverable_id: DeliverableId,
        user_id: UserId,
    },
    /// Grade submitted after `due_at + edit window`.
    EditWindowClosed {
        deliverable_id: DeliverableId,
        closed_at: i64,
    },
    /// Raw grade failed `GradeValue` validation.
    InvalidGrade(GradeValueError),
    /// Actor is not allowed to perform the action in their role.
    NotEligible(String),
    /// Username already registered (case-insensitive).
    UsernameTaken(String),
    /// Input failed a model invariant.
    Validation(ModelValidationError),
    /// State store failure.
    Repo(RepoError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::NotJuror {
                deliverable_id,
                user_id,
            } => write!(
                f,
                "user {user_id} is not on the jury of deliverable {deliverable_id}"
            ),
            Self::EditWindowClosed {
                deliverable_id,
                closed_at,
            } => write!(
                f,
                "edit window for deliverable {deliverable_id} closed at {closed_at}"
            ),
            Self::InvalidGrade(err) => write!(f, "invalid grade: {err}"),
            Self::NotEligible(reason) => write!(f, "not eligible: {reason}"),
            Self::UsernameTaken(username) => write!(f, "username already exists: {username}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidGrade(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl EngineError {
    /// Stable short code for logs and CLI exit messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::NotJuror { .. } => "not_juror",
            Self::EditWindowClosed { .. } => "edit_window_closed",
            Self::InvalidGrade(_) => "invalid_grade",
            Self::NotEligible(_) => "not_eligible",
            Self::UsernameTaken(_) => "username_taken",
            Self::Validation(_) => "validation",
            Self::Repo(RepoError::Conflict { .. }) => "conflict",
            Self::Repo(_) => "repo",
        }
    }
}

impl From<GradeValueError> for EngineError {
    fn from(value: GradeValueError) -> Self {
        Self::InvalidGrade(value)
    }
}

impl From<ModelValidationError> for EngineError {
    fn from(value: ModelValidationError) -> Self {
        match value {
            ModelValidationError::DuplicateUsername(username) => Self::UsernameTaken(username),
            other => Self::Validation(other),
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
