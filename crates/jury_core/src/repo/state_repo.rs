//! State store contract and its SQLite and in-memory implementations.
//!
//! # Responsibility
//! - Load and save whole-engine `State` snapshots.
//! - Keep SQL and JSON encoding details inside the persistence boundary.
//!
//! # Invariants
//! - Writes call `State::validate()` before touching storage.
//! - Reads reject snapshots that violate model invariants instead of
//!   masking them.
//! - A missing snapshot loads as an empty `State`.
//! - A SQLite save only lands on the revision this handle last loaded or
//!   saved; a snapshot committed in between by another connection turns the
//!   save into `RepoError::Conflict` and nothing is written.

use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::state::State;
use crate::model::ModelValidationError;
use log::{debug, error, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Key under which the engine snapshot is stored.
pub const DEFAULT_STATE_KEY: &str = "jury_state_v1";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence failure for state snapshots.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Snapshot could not be encoded or decoded as JSON.
    Serialization(serde_json::Error),
    /// Snapshot violates a model invariant.
    Validation(ModelValidationError),
    /// Connection or stored data is not in the expected shape.
    InvalidData(String),
    /// Another writer committed the snapshot after this handle read it.
    Conflict { key: String },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "state snapshot encoding failed: {err}"),
            Self::Validation(err) => write!(f, "invalid state snapshot: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted state: {message}"),
            Self::Conflict { key } => {
                write!(f, "state snapshot `{key}` was changed by another writer")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::InvalidData(_) | Self::Conflict { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Load/save contract the engine needs from persistence.
pub trait StateStore {
    fn load(&self) -> RepoResult<State>;
    fn save(&mut self, state: &State) -> RepoResult<()>;
}

/// SQLite-backed store keeping one JSON snapshot in `kv_store`.
pub struct SqliteStateStore {
    conn: Connection,
    key: String,
    /// Revision last read or written through this handle; `None` while no
    /// row has been seen.
    base_revision: Cell<Option<i64>>,
}

impl SqliteStateStore {
    /// Opens a database file, migrating it if needed.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?, DEFAULT_STATE_KEY)
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?, DEFAULT_STATE_KEY)
    }

    /// Wraps an already migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the connection schema is not at the latest
    ///   migration version.
    pub fn try_new(conn: Connection, key: impl Into<String>) -> RepoResult<Self> {
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::InvalidData(format!(
                "state store requires schema version {expected_version}, got {actual_version}"
            )));
        }
        Ok(Self {
            conn,
            key: key.into(),
            base_revision: Cell::new(None),
        })
    }

    /// Number of saves applied to this snapshot; 0 when never saved.
    pub fn revision(&self) -> RepoResult<i64> {
        let revision = self
            .conn
            .query_row(
                "SELECT revision FROM kv_store WHERE key = ?1;",
                [self.key.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(revision.unwrap_or(0))
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self) -> RepoResult<State> {
        let row = self
            .conn
            .query_row(
                "SELECT value, revision FROM kv_store WHERE key = ?1;",
                [self.key.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((raw, revision)) = row else {
            self.base_revision.set(None);
            debug!("event=state_load module=repo status=empty key={}", self.key);
            return Ok(State::default());
        };
        self.base_revision.set(Some(revision));

        let state: State = serde_json::from_str(&raw)?;
        if let Err(err) = state.validate() {
            error!(
                "event=state_load module=repo status=error key={} error={}",
                self.key, err
            );
            return Err(err.into());
        }
        Ok(state)
    }

    fn save(&mut self, state: &State) -> RepoResult<()> {
        state.validate()?;
        let raw = serde_json::to_string(state)?;
        let base = self.base_revision.get();

        let written = match base {
            Some(revision) => self.conn.execute(
                "UPDATE kv_store
                 SET value = ?2,
                     updated_at = (strftime('%s', 'now') * 1000),
                     revision = revision + 1
                 WHERE key = ?1 AND revision = ?3;",
                params![self.key.as_str(), raw, revision],
            )?,
            None => self.conn.execute(
                "INSERT INTO kv_store (key, value, updated_at, revision)
                 VALUES (?1, ?2, (strftime('%s', 'now') * 1000), 1)
                 ON CONFLICT(key) DO NOTHING;",
                params![self.key.as_str(), raw],
            )?,
        };
        if written == 0 {
            warn!(
                "event=state_save module=repo status=conflict key={} base_revision={:?}",
                self.key, base
            );
            return Err(RepoError::Conflict {
                key: self.key.clone(),
            });
        }

        let revision = base.map_or(1, |revision| revision + 1);
        self.base_revision.set(Some(revision));
        debug!(
            "event=state_save module=repo status=ok key={} revision={} bytes={}",
            self.key,
            revision,
            raw.len()
        );
        Ok(())
    }
}

/// Store that keeps the snapshot in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    state: State,
    saves: usize,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with an existing snapshot.
    pub fn with_state(state: State) -> RepoResult<Self> {
        state.validate()?;
        Ok(Self { state, saves: 0 })
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self) -> RepoResult<State> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &State) -> RepoResult<()> {
        state.validate()?;
        self.state = state.clone();
        self.saves += 1;
        Ok(())
    }
}
