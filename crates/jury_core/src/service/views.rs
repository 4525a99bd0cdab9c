//! Visibility-safe read models.
//!
//! # Invariants
//! - `DeliverableSummary` and `StaffDeliverableReport` never carry juror ids;
//!   they are safe to hand to the evaluated team and to staff.
//! - Staff see grade values only as an anonymous ascending list.
//! - `JuryTask` is built for one juror and carries only that juror's grade.

use crate::model::deliverable::{Deliverable, DeliverableId};
use crate::model::grade::GradeValue;
use crate::model::project::{Project, ProjectId};
use crate::model::state::State;
use crate::model::user::UserId;
use crate::service::aggregate::final_grade;
use crate::service::ledger::grade_for;
use rust_decimal::Decimal;

/// Deliverable as seen by its team or staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverableSummary {
    pub id: DeliverableId,
    pub project_id: ProjectId,
    pub title: String,
    pub due_at: i64,
    pub edit_window_minutes: u32,
    pub edit_window_closes_at: i64,
    pub link: Option<String>,
    /// Roster size the scheduler aims for.
    pub jury_target: usize,
    /// Jurors assigned so far; below `jury_target` means under-assigned.
    pub jury_assigned: usize,
    pub grades_recorded: usize,
}

impl DeliverableSummary {
    pub(crate) fn build(state: &State, deliverable: &Deliverable) -> Self {
        Self {
            id: deliverable.id,
            project_id: deliverable.project_id,
            title: deliverable.title.clone(),
            due_at: deliverable.due_at,
            edit_window_minutes: deliverable.edit_window_minutes,
            edit_window_closes_at: deliverable.edit_window_closes_at(),
            link: deliverable.link.clone(),
            jury_target: deliverable.jury_target(),
            jury_assigned: deliverable.jury_len(),
            grades_recorded: state.grades_for(deliverable.id).count(),
        }
    }

    pub fn is_under_assigned(&self) -> bool {
        self.jury_assigned < self.jury_target
    }
}

/// One deliverable a juror has to grade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JuryTask {
    pub deliverable_id: DeliverableId,
    /// `None` when the project record is missing.
    pub project_title: Option<String>,
    pub deliverable_title: String,
    pub link: Option<String>,
    pub due_at: i64,
    pub edit_window_closes_at: i64,
    pub editable: bool,
    pub my_grade: Option<GradeValue>,
}

impl JuryTask {
    pub(crate) fn build(
        state: &State,
        deliverable: &Deliverable,
        juror_id: UserId,
        now: i64,
    ) -> Self {
        Self {
            deliverable_id: deliverable.id,
            project_title: state
                .project(deliverable.project_id)
                .map(|project| project.title.clone()),
            deliverable_title: deliverable.title.clone(),
            link: deliverable.link.clone(),
            due_at: deliverable.due_at,
            edit_window_closes_at: deliverable.edit_window_closes_at(),
            editable: deliverable.is_edit_window_open(now),
            my_grade: grade_for(state, deliverable.id, juror_id).map(|grade| grade.value),
        }
    }
}

/// Staff view of one deliverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffDeliverableReport {
    pub summary: DeliverableSummary,
    /// Recorded values, ascending, detached from evaluators.
    pub grade_values: Vec<GradeValue>,
    /// Trimmed mean; `None` with fewer than three grades.
    pub final_grade: Option<Decimal>,
}

impl StaffDeliverableReport {
    pub(crate) fn build(state: &State, deliverable: &Deliverable) -> Self {
        let mut grade_values: Vec<GradeValue> = state
            .grades_for(deliverable.id)
            .map(|grade| grade.value)
            .collect();
        grade_values.sort();
        Self {
            summary: DeliverableSummary::build(state, deliverable),
            grade_values,
            final_grade: final_grade(state, deliverable.id),
        }
    }
}

/// Staff view of one project and all its deliverables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffProjectReport {
    pub project_id: ProjectId,
    pub title: String,
    pub team_usernames: Vec<String>,
    pub deliverables: Vec<StaffDeliverableReport>,
}

impl StaffProjectReport {
    pub(crate) fn build(state: &State, project: &Project) -> Self {
        Self {
            project_id: project.id,
            title: project.title.clone(),
            team_usernames: project.team_usernames.clone(),
            deliverables: state
                .deliverables_for_project(project.id)
                .map(|deliverable| StaffDeliverableReport::build(state, deliverable))
                .collect(),
        }
    }
}
