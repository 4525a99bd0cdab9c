//! Runtime configuration read from the environment.
//!
//! | Variable                  | Default            |
//! |---------------------------|--------------------|
//! | `JURY_DB_PATH`            | `jury.sqlite3`     |
//! | `JURY_LOG_LEVEL`          | build-mode default |
//! | `JURY_LOG_DIR`            | unset (no file log)|
//! | `JURY_POLL_INTERVAL_SECS` | `5`                |

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "jury.sqlite3";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}=`{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
    /// Pause between scheduler passes.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let poll_interval = match read("JURY_POLL_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "JURY_POLL_INTERVAL_SECS",
                    value: raw.clone(),
                    reason: "expected a whole number of seconds",
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "JURY_POLL_INTERVAL_SECS",
                        value: raw,
                        reason: "must be at least 1",
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.poll_interval,
        };

        Ok(Self {
            db_path: read("JURY_DB_PATH").map_or(defaults.db_path, PathBuf::from),
            log_level: read("JURY_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: read("JURY_LOG_DIR").map(PathBuf::from),
            poll_interval,
        })
    }
}
