//! Caller-facing grading service.
//!
//! # Responsibility
//! - Serialize every operation as load -> check/mutate -> save over one
//!   `StateStore`.
//! - Thread the injected clock and random source into the pure resolver,
//!   scheduler and ledger functions.
//! - Enforce actor roles and return visibility-safe read models.
//!
//! # Invariants
//! - One mutex guards store and random source: a single writer at a time
//!   within the process. Writers in other processes are detected by the
//!   store; a conflicting save is retried on a fresh snapshot, so every
//!   mutation is re-checked against the latest committed state.
//! - State is saved only after a fully successful mutation, so a failed
//!   operation never leaves a partial write behind.
//! - Juror ids never leave this service except through `snapshot()`, which
//!   is reserved for privileged code.

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult, EntityRef};
use crate::model::deliverable::{Deliverable, DeliverableId, NewDeliverable};
use crate::model::grade::Grade;
use crate::model::project::{Project, ProjectId};
use crate::model::state::State;
use crate::model::user::{Role, User, UserId};
use crate::repo::state_repo::{RepoError, StateStore};
use crate::service::aggregate;
use crate::service::jury::{self, TopUp};
use crate::service::ledger;
use crate::service::views::{DeliverableSummary, JuryTask, StaffProjectReport};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard, PoisonError};

type SharedRng = Box<dyn RngCore + Send>;

/// Attempts per mutation when another writer keeps winning the save.
const MAX_SAVE_ATTEMPTS: usize = 3;

struct Inner<S> {
    store: S,
    rng: SharedRng,
}

/// Jury assignment and grading engine over a state store.
pub struct GradingService<S: StateStore, C: Clock> {
    clock: C,
    inner: Mutex<Inner<S>>,
}

impl<S: StateStore, C: Clock> GradingService<S, C> {
    /// Creates a service drawing jurors from an entropy-seeded generator.
    pub fn new(store: S, clock: C) -> Self {
        Self::with_rng(store, clock, StdRng::from_entropy())
    }

    /// Creates a service with a caller-supplied random source, e.g. a seeded
    /// `StdRng` for reproducible draws.
    pub fn with_rng(store: S, clock: C, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                store,
                rng: Box::new(rng),
            }),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Consumes the service and returns its store.
    pub fn into_store(self) -> S {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .store
    }

    /// Full state including jury rosters. Privileged callers only.
    pub fn snapshot(&self) -> EngineResult<State> {
        self.read(|state, _| Ok(state.clone()))
    }

    /// Registers a new user.
    ///
    /// # Errors
    /// - `UsernameTaken` when the name exists ignoring case.
    /// - `Validation` for malformed usernames.
    pub fn register_user(&self, username: &str, role: Role) -> EngineResult<User> {
        self.mutate("register_user", |state, _, _| {
            let user = User::new(username, role)?;
            if state.user_by_username(&user.username).is_some() {
                return Err(EngineError::UsernameTaken(user.username));
            }
            state.users.push(user.clone());
            Ok((user, true))
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> EngineResult<Option<User>> {
        self.read(|state, _| Ok(state.user_by_username(username).cloned()))
    }

    /// Creates a project owned by `owner_id`.
    ///
    /// # Errors
    /// - `NotEligible` when the owner or a team member is not a student.
    /// - `NotFound` when the owner or a team member is not registered.
    /// - `Validation` for a blank title, empty team, or an owner missing
    ///   from the team.
    pub fn create_project(
        &self,
        owner_id: UserId,
        title: &str,
        team_usernames: &[String],
    ) -> EngineResult<Project> {
        self.mutate("create_project", |state, _, _| {
            let owner = require_user(state, owner_id)?;
            if !owner.is_student() {
                return Err(EngineError::NotEligible(
                    "only students can create projects".to_string(),
                ));
            }

            let project =
                Project::new(title, team_usernames.to_vec(), owner.id, &owner.username)?;
            for member in &project.team_usernames {
                let user = state
                    .user_by_username(member)
                    .ok_or_else(|| EngineError::NotFound(EntityRef::Username(member.clone())))?;
                if !user.is_student() {
                    return Err(EngineError::NotEligible(format!(
                        "team member `{member}` is not a student"
                    )));
                }
            }

            state.projects.push(project.clone());
            Ok((project, true))
        })
    }

    /// Creates a deliverable; only members of the project team may do so.
    pub fn create_deliverable(
        &self,
        actor_id: UserId,
        request: NewDeliverable,
    ) -> EngineResult<Deliverable> {
        self.mutate("create_deliverable", |state, now, _| {
            require_team_member(state, actor_id, request.project_id)?;
            let deliverable = Deliverable::new(request.clone(), now)?;
            state.deliverables.push(deliverable.clone());
            Ok((deliverable, true))
        })
    }

    /// Sets or clears a deliverable link; team members only.
    pub fn update_link(
        &self,
        actor_id: UserId,
        deliverable_id: DeliverableId,
        link: &str,
    ) -> EngineResult<DeliverableSummary> {
        self.mutate("update_link", |state, _, _| {
            let project_id = require_deliverable(state, deliverable_id)?.project_id;
            require_team_member(state, actor_id, project_id)?;

            let deliverable = state
                .deliverable_mut(deliverable_id)
                .ok_or(EngineError::NotFound(EntityRef::Deliverable(deliverable_id)))?;
            deliverable.set_link(link)?;
            let summary =
                DeliverableSummary::build(state, require_deliverable(state, deliverable_id)?);
            Ok((summary, true))
        })
    }

    /// Tops up one deliverable's jury; saves only when the roster grew.
    pub fn top_up_jury(&self, deliverable_id: DeliverableId) -> EngineResult<TopUp> {
        self.mutate("top_up_jury", |state, now, rng| {
            let outcome = jury::top_up_jury(state, deliverable_id, now, rng)?;
            Ok((outcome, outcome.changed()))
        })
    }

    /// Tops up every deliverable; returns the rosters that grew.
    pub fn top_up_all(&self) -> EngineResult<Vec<TopUp>> {
        self.mutate("top_up_all", |state, now, rng| {
            let changed = jury::top_up_all(state, now, rng)?;
            let dirty = !changed.is_empty();
            Ok((changed, dirty))
        })
    }

    /// Records or revises a juror's grade.
    ///
    /// # Errors
    /// In check order: `NotFound`, `NotJuror`, `EditWindowClosed`,
    /// `InvalidGrade`.
    pub fn submit_grade(
        &self,
        evaluator_id: UserId,
        deliverable_id: DeliverableId,
        raw_value: &str,
    ) -> EngineResult<Grade> {
        self.mutate("submit_grade", |state, now, _| {
            let existed = ledger::grade_for(state, deliverable_id, evaluator_id).is_some();
            let grade =
                ledger::submit_grade(state, deliverable_id, evaluator_id, raw_value, now)?;
            info!(
                "event=grade_submit module=ledger status=ok deliverable_id={} action={}",
                deliverable_id,
                if existed { "updated" } else { "created" }
            );
            Ok((grade, true))
        })
    }

    /// A juror's own grade for one deliverable.
    pub fn my_grade(
        &self,
        evaluator_id: UserId,
        deliverable_id: DeliverableId,
    ) -> EngineResult<Option<Grade>> {
        self.read(|state, _| {
            let deliverable = require_deliverable(state, deliverable_id)?;
            if !deliverable.has_juror(evaluator_id) {
                return Err(EngineError::NotJuror {
                    deliverable_id,
                    user_id: evaluator_id,
                });
            }
            Ok(ledger::grade_for(state, deliverable_id, evaluator_id).cloned())
        })
    }

    /// Trimmed-mean final grade; `Ok(None)` while fewer than three grades.
    pub fn final_grade(&self, deliverable_id: DeliverableId) -> EngineResult<Option<Decimal>> {
        self.read(|state, _| {
            require_deliverable(state, deliverable_id)?;
            Ok(aggregate::final_grade(state, deliverable_id))
        })
    }

    /// Deliverables `user_id` sits on the jury for.
    pub fn list_jury_tasks_for_user(&self, user_id: UserId) -> EngineResult<Vec<JuryTask>> {
        self.read(|state, now| {
            require_user(state, user_id)?;
            Ok(state
                .deliverables
                .iter()
                .filter(|deliverable| deliverable.has_juror(user_id))
                .map(|deliverable| JuryTask::build(state, deliverable, user_id, now))
                .collect())
        })
    }

    /// Deliverables of one project for its team members or staff.
    pub fn list_deliverables_for_project(
        &self,
        viewer_id: UserId,
        project_id: ProjectId,
    ) -> EngineResult<Vec<DeliverableSummary>> {
        self.read(|state, _| {
            let viewer = require_user(state, viewer_id)?;
            let project = require_project(state, project_id)?;
            if viewer.role != Role::Staff && !project.has_member(&viewer.username) {
                return Err(EngineError::NotEligible(
                    "only the project team or staff can list its deliverables".to_string(),
                ));
            }
            Ok(state
                .deliverables_for_project(project_id)
                .map(|deliverable| DeliverableSummary::build(state, deliverable))
                .collect())
        })
    }

    /// Projects whose team includes `user_id`.
    pub fn list_projects_for_user(&self, user_id: UserId) -> EngineResult<Vec<Project>> {
        self.read(|state, _| {
            let user = require_user(state, user_id)?;
            Ok(state
                .projects
                .iter()
                .filter(|project| project.has_member(&user.username))
                .cloned()
                .collect())
        })
    }

    /// Anonymous results for every project; staff only.
    pub fn staff_overview(&self, viewer_id: UserId) -> EngineResult<Vec<StaffProjectReport>> {
        self.read(|state, _| {
            let viewer = require_user(state, viewer_id)?;
            if viewer.role != Role::Staff {
                return Err(EngineError::NotEligible(
                    "only staff can view the results overview".to_string(),
                ));
            }
            Ok(state
                .projects
                .iter()
                .map(|project| StaffProjectReport::build(state, project))
                .collect())
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        // State is only saved after a successful mutation, so a panic while
        // holding the lock cannot leave a half-written snapshot behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, op: impl FnOnce(&State, i64) -> EngineResult<T>) -> EngineResult<T> {
        let guard = self.lock();
        let state = guard.store.load()?;
        op(&state, self.clock.now_ms())
    }

    fn mutate<T>(
        &self,
        name: &'static str,
        mut op: impl FnMut(&mut State, i64, &mut (dyn RngCore + Send)) -> EngineResult<(T, bool)>,
    ) -> EngineResult<T> {
        let mut guard = self.lock();
        let Inner { store, rng } = &mut *guard;

        let mut attempt = 1;
        loop {
            let mut state = store.load()?;
            let (value, dirty) = match op(&mut state, self.clock.now_ms(), &mut **rng) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(
                        "event={} module=service status=rejected error_code={}",
                        name,
                        err.code()
                    );
                    return Err(err);
                }
            };
            if !dirty {
                return Ok(value);
            }

            match store.save(&state) {
                Ok(()) => return Ok(value),
                Err(RepoError::Conflict { .. }) if attempt < MAX_SAVE_ATTEMPTS => {
                    warn!(
                        "event={} module=service status=retry reason=conflict attempt={}",
                        name, attempt
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn require_user(state: &State, user_id: UserId) -> EngineResult<&User> {
    state
        .user(user_id)
        .ok_or(EngineError::NotFound(EntityRef::User(user_id)))
}

fn require_project(state: &State, project_id: ProjectId) -> EngineResult<&Project> {
    state
        .project(project_id)
        .ok_or(EngineError::NotFound(EntityRef::Project(project_id)))
}

fn require_deliverable(
    state: &State,
    deliverable_id: DeliverableId,
) -> EngineResult<&Deliverable> {
    state
        .deliverable(deliverable_id)
        .ok_or(EngineError::NotFound(EntityRef::Deliverable(deliverable_id)))
}

fn require_team_member(
    state: &State,
    actor_id: UserId,
    project_id: ProjectId,
) -> EngineResult<()> {
    let actor = require_user(state, actor_id)?;
    let project = require_project(state, project_id)?;
    if !project.has_member(&actor.username) {
        return Err(EngineError::NotEligible(format!(
            "user `{}` is not on the team of project {}",
            actor.username, project.id
        )));
    }
    Ok(())
}
