//! Store configuration.
//!
//! # Responsibility
//! - Describe which backend to open and where.
//! - Load settings from `TASKSTORE_*` environment variables.
//! - Open the configured `TaskRepository`.
//!
//! # Invariants
//! - Unknown or unparsable values are rejected, never defaulted silently.
//! - A persistent backend that cannot be opened is reported to the caller.

use crate::logging::normalize_level;
use crate::repo::memory_repo::InMemoryTaskRepository;
use crate::repo::sqlite_repo::SqliteTaskRepository;
use crate::repo::task_repo::{RepoResult, TaskRepository};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_BACKEND: &str = "TASKSTORE_BACKEND";
pub const ENV_DB_PATH: &str = "TASKSTORE_DB_PATH";
pub const ENV_FRESH_START: &str = "TASKSTORE_FRESH_START";
pub const ENV_LOG_LEVEL: &str = "TASKSTORE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKSTORE_LOG_DIR";

const DEFAULT_DB_PATH: &str = "./tasks.db";

/// Configuration error for invalid or inconsistent settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl Error for ConfigError {}

/// Storage backends a store can be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-memory map; nothing survives a restart.
    Memory,
    /// Embedded SQLite file at `StoreConfig::db_path`.
    #[serde(alias = "sqlite3")]
    Sqlite,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Settings for opening a task store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StorageBackend,
    /// Database file for the SQLite backend.
    pub db_path: PathBuf,
    /// Remove any existing database file on open.
    pub fresh_start: bool,
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            fresh_start: true,
            log_level: None,
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Defaults for short-lived callers that must see earlier runs' tasks:
    /// SQLite backend, existing file kept.
    pub fn persistent() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            fresh_start: false,
            ..Self::default()
        }
    }

    /// Loads configuration from the process environment on top of defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_over(Self::default())
    }

    /// Loads configuration from the process environment on top of `base`.
    pub fn from_env_over(base: Self) -> Result<Self, ConfigError> {
        Self::from_lookup_over(base, |key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup` instead of the real environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup_over(Self::default(), lookup)
    }

    /// Applies every variable `lookup` knows on top of `base`.
    pub fn from_lookup_over(
        base: Self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = base;

        if let Some(value) = lookup(ENV_BACKEND) {
            config.backend = StorageBackend::parse(&value).ok_or_else(|| {
                ConfigError(format!("{ENV_BACKEND}=`{value}`; expected memory|sqlite"))
            })?;
        }

        if let Some(value) = lookup(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }

        if let Some(value) = lookup(ENV_FRESH_START) {
            config.fresh_start = parse_bool(&value).ok_or_else(|| {
                ConfigError(format!("{ENV_FRESH_START}=`{value}`; expected true|false"))
            })?;
        }

        config.log_level = lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty());
        config.log_dir = lookup(ENV_LOG_DIR)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == StorageBackend::Sqlite && self.db_path.as_os_str().is_empty() {
            return Err(ConfigError(format!(
                "{ENV_DB_PATH} cannot be empty for the sqlite backend"
            )));
        }
        if let Some(level) = &self.log_level {
            normalize_level(level)
                .map_err(|err| ConfigError(format!("{ENV_LOG_LEVEL}: {err}")))?;
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError(format!(
                    "{ENV_LOG_DIR} must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Opens the repository described by `config`.
///
/// # Errors
/// - Storage failures from creating, removing or migrating the SQLite file.
pub fn open_repository(config: &StoreConfig) -> RepoResult<Box<dyn TaskRepository>> {
    let repo: Box<dyn TaskRepository> = match config.backend {
        StorageBackend::Memory => Box::new(InMemoryTaskRepository::new()),
        StorageBackend::Sqlite if config.fresh_start => {
            Box::new(SqliteTaskRepository::open(&config.db_path)?)
        }
        StorageBackend::Sqlite => Box::new(SqliteTaskRepository::open_existing(&config.db_path)?),
    };
    info!(
        "event=store_open module=config status=ok backend={:?} fresh_start={}",
        config.backend, config.fresh_start
    );
    Ok(repo)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
