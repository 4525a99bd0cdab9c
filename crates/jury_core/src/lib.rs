//! Jury assignment and grading engine.
//!
//! Assigns anonymous, conflict-free jurors to deliverables once they are
//! due, gates grade entry by an edit window, and reduces blind scores into
//! a trimmed-mean final grade. This crate is the single source of truth for
//! those invariants; callers (CLI, services) only drive it.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scheduler;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult, EntityRef};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::deliverable::{Deliverable, DeliverableId, NewDeliverable};
pub use model::grade::{Grade, GradeId, GradeValue, GradeValueError};
pub use model::project::{parse_team_usernames, Project, ProjectId};
pub use model::state::State;
pub use model::user::{Role, User, UserId};
pub use model::ModelValidationError;
pub use repo::state_repo::{InMemoryStateStore, RepoError, SqliteStateStore, StateStore};
pub use scheduler::{
    BoundedTicker, IntervalTicker, JuryScheduler, SchedulerReport, StopHandle, Ticker,
};
pub use service::aggregate::{final_grade, trimmed_mean};
pub use service::eligibility::eligible_evaluators;
pub use service::grading_service::GradingService;
pub use service::jury::{top_up_all, top_up_jury, TopUp};
pub use service::ledger::{grade_for, submit_grade};
pub use service::views::{
    DeliverableSummary, JuryTask, StaffDeliverableReport, StaffProjectReport,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
