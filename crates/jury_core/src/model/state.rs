//! Whole-engine state snapshot.
//!
//! # Responsibility
//! - Group every record the engine reads or writes into one value that a
//!   store can load and save atomically.
//! - Provide id and username lookups used by the services.
//! - Re-check cross-record invariants for freshly loaded snapshots.

use super::deliverable::{Deliverable, DeliverableId};
use super::grade::Grade;
use super::project::{Project, ProjectId};
use super::user::{usernames_match, User, UserId};
use super::ModelValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl State {
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| usernames_match(&user.username, username))
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn deliverable(&self, id: DeliverableId) -> Option<&Deliverable> {
        self.deliverables.iter().find(|deliverable| deliverable.id == id)
    }

    pub fn deliverable_mut(&mut self, id: DeliverableId) -> Option<&mut Deliverable> {
        self.deliverables
            .iter_mut()
            .find(|deliverable| deliverable.id == id)
    }

    /// Deliverables of one project in creation order.
    pub fn deliverables_for_project(
        &self,
        project_id: ProjectId,
    ) -> impl Iterator<Item = &Deliverable> {
        self.deliverables
            .iter()
            .filter(move |deliverable| deliverable.project_id == project_id)
    }

    /// Grades recorded for one deliverable in submission order.
    pub fn grades_for(&self, deliverable_id: DeliverableId) -> impl Iterator<Item = &Grade> {
        self.grades
            .iter()
            .filter(move |grade| grade.deliverable_id == deliverable_id)
    }

    /// Checks every record and the cross-record invariants.
    ///
    /// # Invariants checked
    /// - Usernames are unique ignoring case.
    /// - Project owners exist and are team members.
    /// - Deliverables reference existing projects, jurors exist and none is
    ///   on the owning team.
    /// - Grades reference existing deliverables and are unique per evaluator.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        for (index, user) in self.users.iter().enumerate() {
            user.validate()?;
            if self.users[..index]
                .iter()
                .any(|earlier| usernames_match(&earlier.username, &user.username))
            {
                return Err(ModelValidationError::DuplicateUsername(
                    user.username.clone(),
                ));
            }
        }

        for project in &self.projects {
            project.validate()?;
            let owner = self.user(project.owner_id).ok_or_else(|| {
                ModelValidationError::DanglingReference(format!(
                    "project {} owner {}",
                    project.id, project.owner_id
                ))
            })?;
            if !project.has_member(&owner.username) {
                return Err(ModelValidationError::OwnerNotInTeam(owner.username.clone()));
            }
        }

        for deliverable in &self.deliverables {
            deliverable.validate()?;
            let project = self.project(deliverable.project_id).ok_or_else(|| {
                ModelValidationError::DanglingReference(format!(
                    "deliverable {} project {}",
                    deliverable.id, deliverable.project_id
                ))
            })?;
            for juror_id in deliverable.jury_user_ids() {
                let juror = self.user(*juror_id).ok_or_else(|| {
                    ModelValidationError::DanglingReference(format!(
                        "deliverable {} juror {juror_id}",
                        deliverable.id
                    ))
                })?;
                if project.has_member(&juror.username) {
                    return Err(ModelValidationError::JurorOnTeam(*juror_id));
                }
            }
        }

        let mut seen_pairs = HashSet::new();
        for grade in &self.grades {
            let deliverable = self.deliverable(grade.deliverable_id).ok_or_else(|| {
                ModelValidationError::DanglingReference(format!(
                    "grade {} deliverable {}",
                    grade.id, grade.deliverable_id
                ))
            })?;
            if !deliverable.has_juror(grade.evaluator_id) {
                return Err(ModelValidationError::DanglingReference(format!(
                    "grade {} evaluator {} is not on the jury",
                    grade.id, grade.evaluator_id
                )));
            }
            if !seen_pairs.insert((grade.deliverable_id, grade.evaluator_id)) {
                return Err(ModelValidationError::DuplicateGrade {
                    deliverable_id: grade.deliverable_id,
                    evaluator_id: grade.evaluator_id,
                });
            }
        }

        Ok(())
    }
}
