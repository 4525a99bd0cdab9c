//! `jury` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto `GradingService` calls over the configured SQLite
//!   state file.
//! - Run an eager jury top-up before every command so late registrations
//!   are picked up even without `watch`.
//!
//! # Invariants
//! - Output never includes juror identities; team and staff views print
//!   counts and anonymous grade lists only.

use clap::{Parser, Subcommand};
use jury_core::{
    init_from_config, parse_team_usernames, Clock, ConfigError, DeliverableId, EngineConfig,
    EngineError, GradingService, IntervalTicker, JuryScheduler, NewDeliverable, ProjectId,
    RepoError, Role, SqliteStateStore, SystemClock, User,
};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;

type Service = GradingService<SqliteStateStore, SystemClock>;

const MINUTE_MS: i64 = 60_000;

#[derive(Parser, Debug)]
#[command(name = "jury")]
#[command(version)]
#[command(about = "Anonymous peer jury assignment and grading")]
#[command(propagate_version = true)]
struct Args {
    /// SQLite state file; overrides JURY_DB_PATH
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Username of the acting user
    #[arg(long = "as", global = true, value_name = "USERNAME")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new user
    Register {
        username: String,

        /// Register as staff instead of student
        #[arg(long)]
        staff: bool,
    },

    /// Create a project owned by the acting student
    Project {
        title: String,

        /// Comma-separated usernames, owner included
        #[arg(long)]
        team: String,
    },

    /// Create a deliverable for one of the acting user's projects
    Deliverable {
        /// Project id
        #[arg(long)]
        project: ProjectId,

        title: String,

        /// Due time as epoch milliseconds
        #[arg(
            long,
            conflicts_with = "due_in_minutes",
            required_unless_present = "due_in_minutes"
        )]
        due_at_ms: Option<i64>,

        /// Due time relative to now
        #[arg(long)]
        due_in_minutes: Option<i64>,

        /// Desired jury size (at least 3)
        #[arg(long, default_value = "3")]
        jury_size: u32,

        /// Minutes after the due time during which grades may change
        #[arg(long, default_value = "30")]
        window_minutes: u32,
    },

    /// Set or clear (empty string) a deliverable link
    Link {
        deliverable: DeliverableId,
        url: String,
    },

    /// Submit or revise a grade as a juror
    Grade {
        deliverable: DeliverableId,
        value: String,
    },

    /// List the acting user's jury tasks
    Tasks,

    /// List deliverables of the acting user's projects
    Deliverables {
        /// Restrict to one project
        #[arg(long)]
        project: Option<ProjectId>,
    },

    /// Anonymous results overview (staff only)
    Report,

    /// Run one jury top-up pass and exit
    Tick,

    /// Keep topping up juries at JURY_POLL_INTERVAL_SECS
    Watch,
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Repo(RepoError),
    Engine(EngineError),
    Usage(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Repo(err) => write!(f, "state store error: {err}"),
            Self::Engine(err) => write!(f, "{} ({})", err, err.code()),
            Self::Usage(message) => write!(f, "{message}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::Usage(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<EngineError> for CliError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let mut config = EngineConfig::from_env()?;
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Err(err) = init_from_config(&config) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let store = SqliteStateStore::open(&config.db_path)?;
    let service = GradingService::new(store, SystemClock);
    info!(
        "event=cli_start module=cli status=ok command={}",
        command_name(&args.command)
    );

    if !matches!(args.command, Commands::Watch) {
        match service.top_up_all() {
            Ok(grown) if !grown.is_empty() => {
                info!("event=cli_top_up module=cli status=ok grown={}", grown.len())
            }
            Ok(_) => {}
            Err(err) => warn!(
                "event=cli_top_up module=cli status=error error_code={}",
                err.code()
            ),
        }
    }

    let actor = args.actor.as_deref();
    match args.command {
        Commands::Register { username, staff } => {
            let role = if staff { Role::Staff } else { Role::Student };
            let user = service.register_user(&username, role)?;
            println!("registered {} as {} id={}", user.username, role.as_str(), user.id);
        }
        Commands::Project { title, team } => {
            let owner = require_actor(&service, actor)?;
            let project =
                service.create_project(owner.id, &title, &parse_team_usernames(&team))?;
            println!(
                "project {} `{}` team={}",
                project.id,
                project.title,
                project.team_usernames.join(",")
            );
        }
        Commands::Deliverable {
            project,
            title,
            due_at_ms,
            due_in_minutes,
            jury_size,
            window_minutes,
        } => {
            let owner = require_actor(&service, actor)?;
            let due_at = resolve_due_at(due_at_ms, due_in_minutes)?;
            let deliverable = service.create_deliverable(
                owner.id,
                NewDeliverable {
                    project_id: project,
                    title,
                    due_at,
                    jury_size,
                    edit_window_minutes: window_minutes,
                },
            )?;
            println!(
                "deliverable {} `{}` due_at={} jury_target={} window_closes_at={}",
                deliverable.id,
                deliverable.title,
                deliverable.due_at,
                deliverable.jury_target(),
                deliverable.edit_window_closes_at()
            );
        }
        Commands::Link { deliverable, url } => {
            let user = require_actor(&service, actor)?;
            let summary = service.update_link(user.id, deliverable, &url)?;
            println!(
                "deliverable {} link={}",
                summary.id,
                summary.link.as_deref().unwrap_or("-")
            );
        }
        Commands::Grade { deliverable, value } => {
            let juror = require_actor(&service, actor)?;
            let grade = service.submit_grade(juror.id, deliverable, &value)?;
            println!("deliverable {} my_grade={}", deliverable, grade.value);
        }
        Commands::Tasks => {
            let juror = require_actor(&service, actor)?;
            print_tasks(&service, &juror)?;
        }
        Commands::Deliverables { project } => {
            let viewer = require_actor(&service, actor)?;
            print_deliverables(&service, &viewer, project)?;
        }
        Commands::Report => {
            let viewer = require_actor(&service, actor)?;
            print_report(&service, &viewer)?;
        }
        Commands::Tick => {
            let grown = service.top_up_all()?;
            let added: usize = grown.iter().map(|top_up| top_up.added).sum();
            println!("rosters_grown={} jurors_added={}", grown.len(), added);
        }
        Commands::Watch => {
            let mut ticker = IntervalTicker::new(config.poll_interval);
            println!(
                "watching {} every {}s; interrupt to stop",
                config.db_path.display(),
                config.poll_interval.as_secs()
            );
            let report = JuryScheduler::new(&service).run(&mut ticker);
            println!(
                "passes={} rosters_grown={} jurors_added={} failed_passes={}",
                report.passes, report.rosters_grown, report.jurors_added, report.failed_passes
            );
        }
    }
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Register { .. } => "register",
        Commands::Project { .. } => "project",
        Commands::Deliverable { .. } => "deliverable",
        Commands::Link { .. } => "link",
        Commands::Grade { .. } => "grade",
        Commands::Tasks => "tasks",
        Commands::Deliverables { .. } => "deliverables",
        Commands::Report => "report",
        Commands::Tick => "tick",
        Commands::Watch => "watch",
    }
}

fn require_actor(service: &Service, actor: Option<&str>) -> Result<User, CliError> {
    let username = actor
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CliError::Usage("this command needs --as <username>".to_string()))?;
    service
        .find_user_by_username(username)?
        .ok_or_else(|| CliError::Usage(format!("unknown user `{username}`")))
}

fn resolve_due_at(due_at_ms: Option<i64>, due_in_minutes: Option<i64>) -> Result<i64, CliError> {
    match (due_at_ms, due_in_minutes) {
        (Some(at), _) => Ok(at),
        (None, Some(minutes)) => {
            let offset = minutes.checked_mul(MINUTE_MS).ok_or_else(|| {
                CliError::Usage(format!("--due-in-minutes {minutes} is too large"))
            })?;
            Ok(SystemClock.now_ms().saturating_add(offset))
        }
        (None, None) => Err(CliError::Usage(
            "pass --due-at-ms or --due-in-minutes".to_string(),
        )),
    }
}

fn print_tasks(service: &Service, juror: &User) -> Result<(), CliError> {
    let tasks = service.list_jury_tasks_for_user(juror.id)?;
    if tasks.is_empty() {
        println!("no jury tasks for {}", juror.username);
        return Ok(());
    }
    for task in tasks {
        println!(
            "{} `{}` / `{}` link={} window_closes_at={} editable={} my_grade={}",
            task.deliverable_id,
            task.project_title.as_deref().unwrap_or("?"),
            task.deliverable_title,
            task.link.as_deref().unwrap_or("-"),
            task.edit_window_closes_at,
            task.editable,
            task.my_grade
                .map(|value| value.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

fn print_deliverables(
    service: &Service,
    viewer: &User,
    project: Option<ProjectId>,
) -> Result<(), CliError> {
    let project_ids = match project {
        Some(project_id) => vec![project_id],
        None => service
            .list_projects_for_user(viewer.id)?
            .into_iter()
            .map(|project| project.id)
            .collect(),
    };

    for project_id in project_ids {
        println!("project {project_id}");
        for summary in service.list_deliverables_for_project(viewer.id, project_id)? {
            println!(
                "  {} `{}` due_at={} link={} jury={}/{}{} grades={}",
                summary.id,
                summary.title,
                summary.due_at,
                summary.link.as_deref().unwrap_or("-"),
                summary.jury_assigned,
                summary.jury_target,
                if summary.is_under_assigned() {
                    " (under-assigned)"
                } else {
                    ""
                },
                summary.grades_recorded
            );
        }
    }
    Ok(())
}

fn print_report(service: &Service, viewer: &User) -> Result<(), CliError> {
    for project in service.staff_overview(viewer.id)? {
        println!(
            "project {} `{}` team={}",
            project.project_id,
            project.title,
            project.team_usernames.join(",")
        );
        for report in project.deliverables {
            let grades = report
                .grade_values
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join(",");
            println!(
                "  {} `{}` jury={}/{} grades=[{}] final={}",
                report.summary.id,
                report.summary.title,
                report.summary.jury_assigned,
                report.summary.jury_target,
                grades,
                report
                    .final_grade
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "pending".to_string())
            );
        }
    }
    Ok(())
}
