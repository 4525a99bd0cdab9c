//! Eligibility resolver.
//!
//! # Invariants
//! - Only students are eligible.
//! - Members of the owning team (case-insensitive username match) are never
//!   eligible for their own deliverables.
//! - Pure function of state; no side effects.

use crate::model::deliverable::Deliverable;
use crate::model::state::State;
use crate::model::user::UserId;

/// Users allowed to evaluate `deliverable`, in registration order.
///
/// Returns an empty list when the owning project cannot be resolved.
pub fn eligible_evaluators(state: &State, deliverable: &Deliverable) -> Vec<UserId> {
    let Some(project) = state.project(deliverable.project_id) else {
        return Vec::new();
    };

    state
        .users
        .iter()
        .filter(|user| user.is_student() && !project.has_member(&user.username))
        .map(|user| user.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::eligible_evaluators;
    use crate::model::deliverable::{Deliverable, NewDeliverable};
    use crate::model::project::Project;
    use crate::model::state::State;
    use crate::model::user::{Role, User};
    use uuid::Uuid;

    fn state_with_project() -> (State, Deliverable) {
        let ana = User::new("ana", Role::Student).unwrap();
        let bogdan = User::new("Bogdan", Role::Student).unwrap();
        let cris = User::new("cris", Role::Student).unwrap();
        let prof = User::new("prof", Role::Staff).unwrap();
        let project = Project::new(
            "Web App",
            vec!["ana".to_string(), "bogdan".to_string()],
            ana.id,
            "ana",
        )
        .unwrap();
        let deliverable = Deliverable::new(
            NewDeliverable {
                project_id: project.id,
                title: "M1".to_string(),
                due_at: 1_000,
                jury_size: 3,
                edit_window_minutes: 10,
            },
            0,
        )
        .unwrap();
        let state = State {
            users: vec![ana, bogdan, cris, prof],
            projects: vec![project],
            deliverables: vec![deliverable.clone()],
            grades: Vec::new(),
        };
        (state, deliverable)
    }

    #[test]
    fn excludes_team_members_case_insensitively_and_staff() {
        let (state, deliverable) = state_with_project();
        let eligible = eligible_evaluators(&state, &deliverable);
        let cris = state.user_by_username("cris").unwrap().id;
        assert_eq!(eligible, vec![cris]);
    }

    #[test]
    fn unknown_project_yields_empty_pool() {
        let (state, mut deliverable) = state_with_project();
        deliverable.project_id = Uuid::new_v4();
        assert!(eligible_evaluators(&state, &deliverable).is_empty());
    }
}
