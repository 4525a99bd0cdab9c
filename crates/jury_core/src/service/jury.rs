//! Jury top-up.
//!
//! # Responsibility
//! - Grow a due deliverable's roster toward its target from the eligible
//!   pool.
//!
//! # Invariants
//! - Nothing happens before `due_at`.
//! - Existing jurors are never removed or reordered; new ones are appended
//!   in draw order.
//! - Draws are uniform without replacement from the supplied random source.
//! - A roster smaller than its target is a valid steady state when the pool
//!   is exhausted; repeated calls then change nothing.

use crate::error::{EngineError, EngineResult, EntityRef};
use crate::model::deliverable::DeliverableId;
use crate::model::state::State;
use crate::model::user::UserId;
use crate::service::eligibility::eligible_evaluators;
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Outcome of one top-up attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopUp {
    pub deliverable_id: DeliverableId,
    /// Jurors appended by this call.
    pub added: usize,
    /// Roster size after this call.
    pub roster_len: usize,
    /// Target roster size, see `Deliverable::jury_target`.
    pub target: usize,
}

impl TopUp {
    pub fn changed(&self) -> bool {
        self.added > 0
    }

    /// True while the roster is below target, e.g. too few eligible students.
    pub fn is_under_assigned(&self) -> bool {
        self.roster_len < self.target
    }
}

/// Tops up one deliverable's roster in place.
///
/// # Errors
/// - `NotFound` when `deliverable_id` is not in `state`.
pub fn top_up_jury<R: Rng + ?Sized>(
    state: &mut State,
    deliverable_id: DeliverableId,
    now: i64,
    rng: &mut R,
) -> EngineResult<TopUp> {
    let deliverable = state
        .deliverable(deliverable_id)
        .ok_or(EngineError::NotFound(EntityRef::Deliverable(deliverable_id)))?;
    let target = deliverable.jury_target();

    let drawn = if deliverable.is_due(now) {
        draw_jurors(state, deliverable_id, target, rng)
    } else {
        Vec::new()
    };

    let Some(deliverable) = state.deliverable_mut(deliverable_id) else {
        return Err(EngineError::NotFound(EntityRef::Deliverable(deliverable_id)));
    };
    let added = deliverable.append_jurors(drawn);
    let outcome = TopUp {
        deliverable_id,
        added,
        roster_len: deliverable.jury_len(),
        target,
    };

    if outcome.changed() {
        info!(
            "event=jury_top_up module=jury status=ok deliverable_id={} added={} roster={} target={} under_assigned={}",
            deliverable_id,
            outcome.added,
            outcome.roster_len,
            outcome.target,
            outcome.is_under_assigned()
        );
    }
    Ok(outcome)
}

/// Tops up every deliverable; returns only the outcomes that changed a roster.
///
/// # Errors
/// The first failing top-up aborts the pass; `state` may then hold the
/// rosters grown before it and must not be saved.
pub fn top_up_all<R: Rng + ?Sized>(
    state: &mut State,
    now: i64,
    rng: &mut R,
) -> EngineResult<Vec<TopUp>> {
    let ids: Vec<DeliverableId> = state.deliverables.iter().map(|d| d.id).collect();
    let mut changed = Vec::new();
    for id in ids {
        let outcome = top_up_jury(state, id, now, rng)?;
        if outcome.changed() {
            changed.push(outcome);
        }
    }
    Ok(changed)
}

fn draw_jurors<R: Rng + ?Sized>(
    state: &State,
    deliverable_id: DeliverableId,
    target: usize,
    rng: &mut R,
) -> Vec<UserId> {
    let Some(deliverable) = state.deliverable(deliverable_id) else {
        return Vec::new();
    };
    let already: HashSet<UserId> = deliverable.jury_user_ids().iter().copied().collect();
    let needed = target.saturating_sub(already.len());
    if needed == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<UserId> = eligible_evaluators(state, deliverable)
        .into_iter()
        .filter(|id| !already.contains(id))
        .collect();
    let take = needed.min(candidates.len());
    let (drawn, _) = candidates.partial_shuffle(rng, take);
    drawn.to_vec()
}

#[cfg(test)]
mod tests {
    use super::{top_up_all, top_up_jury};
    use crate::model::deliverable::{Deliverable, NewDeliverable};
    use crate::model::project::Project;
    use crate::model::state::State;
    use crate::model::user::{Role, User};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state(students: usize, jury_size: u32) -> State {
        let owner = User::new("owner", Role::Student).unwrap();
        let project =
            Project::new("P", vec!["owner".to_string()], owner.id, "owner").unwrap();
        let deliverable = Deliverable::new(
            NewDeliverable {
                project_id: project.id,
                title: "D".to_string(),
                due_at: 100,
                jury_size,
                edit_window_minutes: 5,
            },
            0,
        )
        .unwrap();
        let mut users = vec![owner];
        for index in 0..students {
            users.push(User::new(&format!("s{index}"), Role::Student).unwrap());
        }
        State {
            users,
            projects: vec![project],
            deliverables: vec![deliverable],
            grades: Vec::new(),
        }
    }

    #[test]
    fn no_assignment_before_due() {
        let mut state = state(5, 3);
        let id = state.deliverables[0].id;
        let outcome = top_up_jury(&mut state, id, 99, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(!outcome.changed());
        assert_eq!(outcome.roster_len, 0);
    }

    #[test]
    fn fills_to_target_at_due_instant() {
        let mut state = state(6, 4);
        let id = state.deliverables[0].id;
        let outcome = top_up_jury(&mut state, id, 100, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(outcome.added, 4);
        assert_eq!(outcome.roster_len, 4);
        assert!(!outcome.is_under_assigned());
    }

    #[test]
    fn same_seed_draws_same_roster() {
        let mut first = state(8, 3);
        let mut second = first.clone();
        let id = first.deliverables[0].id;
        top_up_jury(&mut first, id, 100, &mut StdRng::seed_from_u64(42)).unwrap();
        top_up_jury(&mut second, id, 100, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(
            first.deliverables[0].jury_user_ids(),
            second.deliverables[0].jury_user_ids()
        );
    }

    #[test]
    fn top_up_all_reports_only_changes() {
        let mut state = state(3, 3);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(top_up_all(&mut state, 100, &mut rng).unwrap().len(), 1);
        assert!(top_up_all(&mut state, 200, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn top_up_all_without_project_assigns_nobody() {
        let mut state = state(4, 3);
        state.projects.clear();
        let mut rng = StdRng::seed_from_u64(7);
        let changed = top_up_all(&mut state, 100, &mut rng).unwrap();
        assert!(changed.is_empty());
        assert_eq!(state.deliverables[0].jury_len(), 0);
    }
}
