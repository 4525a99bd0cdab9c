//! Grading ledger.
//!
//! # Invariants
//! - Checks run in a fixed order: deliverable exists, evaluator is a juror,
//!   edit window open, value valid. The first failure wins.
//! - At most one grade per (deliverable, evaluator); resubmission updates
//!   the existing row.
//! - On error `state` is untouched.

use crate::error::{EngineError, EngineResult, EntityRef};
use crate::model::deliverable::DeliverableId;
use crate::model::grade::{Grade, GradeValue};
use crate::model::state::State;
use crate::model::user::UserId;
use std::str::FromStr;

/// Records or revises `evaluator_id`'s grade for `deliverable_id`.
///
/// `raw` is parsed into a [`GradeValue`] only after membership and timing
/// checks pass.
pub fn submit_grade(
    state: &mut State,
    deliverable_id: DeliverableId,
    evaluator_id: UserId,
    raw: &str,
    now: i64,
) -> EngineResult<Grade> {
    let deliverable = state
        .deliverable(deliverable_id)
        .ok_or(EngineError::NotFound(EntityRef::Deliverable(deliverable_id)))?;
    if !deliverable.has_juror(evaluator_id) {
        return Err(EngineError::NotJuror {
            deliverable_id,
            user_id: evaluator_id,
        });
    }
    if !deliverable.is_edit_window_open(now) {
        return Err(EngineError::EditWindowClosed {
            deliverable_id,
            closed_at: deliverable.edit_window_closes_at(),
        });
    }
    let value = GradeValue::from_str(raw)?;

    let existing = state.grades.iter_mut().find(|grade| {
        grade.deliverable_id == deliverable_id && grade.evaluator_id == evaluator_id
    });
    let grade = match existing {
        Some(grade) => {
            grade.revise(value, now);
            grade.clone()
        }
        None => {
            let grade = Grade::new(deliverable_id, evaluator_id, value, now);
            state.grades.push(grade.clone());
            grade
        }
    };
    Ok(grade)
}

/// The grade `evaluator_id` recorded for `deliverable_id`, if any.
pub fn grade_for(
    state: &State,
    deliverable_id: DeliverableId,
    evaluator_id: UserId,
) -> Option<&Grade> {
    state
        .grades_for(deliverable_id)
        .find(|grade| grade.evaluator_id == evaluator_id)
}
