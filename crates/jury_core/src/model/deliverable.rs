//! Deliverable domain model.
//!
//! # Responsibility
//! - Hold the structural schedule of one graded hand-in (due time, jury
//!   target, edit window).
//! - Own the jury roster and keep it away from non-privileged readers.
//!
//! # Invariants
//! - `due_at`, `jury_size` and `edit_window_minutes` never change after
//!   creation.
//! - The roster is duplicate-free and only grows; existing jurors are never
//!   removed or reordered.
//! - Only `link` and the roster mutate after creation.

use super::project::ProjectId;
use super::user::UserId;
use super::ModelValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest jury the scheduler will ever aim for.
pub const MIN_JURY_SIZE: u32 = 3;
/// Smallest accepted edit window.
pub const MIN_EDIT_WINDOW_MINUTES: u32 = 1;

const MINUTE_MS: i64 = 60 * 1000;

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)https?://\S+$").expect("valid link regex"));

/// Stable identifier for deliverables.
pub type DeliverableId = Uuid;

/// Creation request for a deliverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeliverable {
    pub project_id: ProjectId,
    pub title: String,
    /// Due time in epoch milliseconds.
    pub due_at: i64,
    /// Caller-supplied jury target, at least 3.
    pub jury_size: u32,
    /// Minutes after `due_at` during which jurors may grade.
    pub edit_window_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: DeliverableId,
    pub project_id: ProjectId,
    pub title: String,
    pub due_at: i64,
    pub jury_size: u32,
    pub edit_window_minutes: u32,
    pub link: Option<String>,
    /// Jury roster. Read through [`Deliverable::jury_user_ids`] only.
    #[serde(default)]
    jury_user_ids: Vec<UserId>,
}

impl Deliverable {
    /// Creates a deliverable with an empty roster.
    ///
    /// # Errors
    /// - `EmptyTitle`, `JurySizeTooSmall`, `EditWindowTooShort` for bad input.
    /// - `DueInPast` when `due_at <= now`.
    pub fn new(request: NewDeliverable, now: i64) -> Result<Self, ModelValidationError> {
        if request.due_at <= now {
            return Err(ModelValidationError::DueInPast {
                due_at: request.due_at,
                now,
            });
        }
        let deliverable = Self {
            id: Uuid::new_v4(),
            project_id: request.project_id,
            title: request.title.trim().to_string(),
            due_at: request.due_at,
            jury_size: request.jury_size,
            edit_window_minutes: request.edit_window_minutes,
            link: None,
            jury_user_ids: Vec::new(),
        };
        deliverable.validate()?;
        Ok(deliverable)
    }

    /// Roster size the scheduler aims for. Validation keeps `jury_size` at 3
    /// or more, so this equals `jury_size`.
    pub fn jury_target(&self) -> usize {
        self.jury_size.max(MIN_JURY_SIZE) as usize
    }

    /// Last instant (inclusive) at which grades may be created or edited.
    pub fn edit_window_closes_at(&self) -> i64 {
        self.due_at
            .saturating_add(i64::from(self.edit_window_minutes).saturating_mul(MINUTE_MS))
    }

    pub fn is_due(&self, now: i64) -> bool {
        now >= self.due_at
    }

    pub fn is_edit_window_open(&self, now: i64) -> bool {
        now <= self.edit_window_closes_at()
    }

    /// Number of assigned jurors. Safe to expose to any viewer.
    pub fn jury_len(&self) -> usize {
        self.jury_user_ids.len()
    }

    pub fn has_juror(&self, user_id: UserId) -> bool {
        self.jury_user_ids.contains(&user_id)
    }

    /// Jury roster in assignment order.
    ///
    /// Privileged: never forward this to views rendered for the owning team
    /// or staff.
    pub fn jury_user_ids(&self) -> &[UserId] {
        &self.jury_user_ids
    }

    /// Replaces the link. Blank input clears it.
    pub fn set_link(&mut self, link: &str) -> Result<(), ModelValidationError> {
        self.link = normalize_link(link)?;
        Ok(())
    }

    pub(crate) fn append_jurors(&mut self, user_ids: impl IntoIterator<Item = UserId>) -> usize {
        let before = self.jury_user_ids.len();
        for user_id in user_ids {
            if !self.jury_user_ids.contains(&user_id) {
                self.jury_user_ids.push(user_id);
            }
        }
        self.jury_user_ids.len() - before
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.title.trim().is_empty() {
            return Err(ModelValidationError::EmptyTitle);
        }
        if self.jury_size < MIN_JURY_SIZE {
            return Err(ModelValidationError::JurySizeTooSmall(self.jury_size));
        }
        if self.edit_window_minutes < MIN_EDIT_WINDOW_MINUTES {
            return Err(ModelValidationError::EditWindowTooShort(
                self.edit_window_minutes,
            ));
        }
        if let Some(link) = self.link.as_deref() {
            if !LINK_RE.is_match(link) {
                return Err(ModelValidationError::InvalidLink(link.to_string()));
            }
        }
        for (index, juror) in self.jury_user_ids.iter().enumerate() {
            if self.jury_user_ids[..index].contains(juror) {
                return Err(ModelValidationError::DuplicateJuror(*juror));
            }
        }
        Ok(())
    }
}

fn normalize_link(value: &str) -> Result<Option<String>, ModelValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !LINK_RE.is_match(trimmed) {
        return Err(ModelValidationError::InvalidLink(trimmed.to_string()));
    }
    Ok(Some(trimmed.to_string()))
}
