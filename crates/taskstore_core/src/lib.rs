//! Core task store.
//! This crate owns the task model, the repository contract and its
//! in-memory and SQLite backends.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{open_repository, ConfigError, StorageBackend, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{NewTask, Task, TaskId};
pub use repo::memory_repo::InMemoryTaskRepository;
pub use repo::sqlite_repo::SqliteTaskRepository;
pub use repo::task_repo::{Lookup, RepoError, RepoResult, TaskRepository};
pub use service::task_service::{ServiceError, ServiceResult, TaskService};

/// Minimal health-check API for CLI smoke runs.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
