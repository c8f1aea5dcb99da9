//! Task use-case service.
//!
//! # Responsibility
//! - Provide stable task entry points for transport-facing callers.
//! - Translate raw inputs (calendar parts) into repository queries.
//! - Split failures into invalid input, not found, and storage failure.
//!
//! # Invariants
//! - Service APIs never bypass the repository contract.
//! - Service layer remains storage-agnostic.

use crate::model::task::{NewTask, Task, TaskId};
use crate::repo::task_repo::{Lookup, RepoError, TaskRepository};
use chrono::{DateTime, FixedOffset, NaiveDate};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for task use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// `year/month/day` do not form a calendar date.
    InvalidDate { year: i32, month: u32, day: u32 },
    /// Target task does not exist or the filtered result is empty.
    NotFound(Lookup),
    /// Backend failure; callers report it as a server error.
    Storage(RepoError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate { year, month, day } => write!(
                f,
                "invalid date format, expected yyyy/mm/dd, got {year}/{month}/{day}"
            ),
            Self::NotFound(lookup) => write!(f, "{lookup}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(lookup) => Self::NotFound(lookup),
            other => Self::Storage(other),
        }
    }
}

/// Use-case service wrapper over any `TaskRepository` backend.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a task and returns its id.
    pub fn create_task(
        &self,
        text: impl Into<String>,
        tags: Vec<String>,
        due: DateTime<FixedOffset>,
    ) -> ServiceResult<TaskId> {
        let task = NewTask {
            text: text.into(),
            tags,
            due,
        };
        let result = self.repo.create_task(&task);
        log_outcome("task_create", &result);
        if let Ok(id) = &result {
            info!(
                "event=task_create module=service status=ok id={id} tag_count={}",
                task.tags.len()
            );
        }
        Ok(result?)
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<Task> {
        let result = self.repo.get_task(id);
        log_outcome("task_get", &result);
        Ok(result?)
    }

    pub fn list_tasks(&self) -> ServiceResult<Vec<Task>> {
        let result = self.repo.list_tasks();
        log_outcome("task_list", &result);
        Ok(result?)
    }

    pub fn list_tasks_by_tag(&self, tag: &str) -> ServiceResult<Vec<Task>> {
        let result = self.repo.list_tasks_by_tag(tag);
        log_outcome("task_list_by_tag", &result);
        Ok(result?)
    }

    /// Lists tasks due on `year-month-day`.
    ///
    /// # Errors
    /// - `InvalidDate` when the parts are not a calendar date (e.g. Feb 30).
    pub fn list_tasks_by_date(&self, year: i32, month: u32, day: u32) -> ServiceResult<Vec<Task>> {
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            warn!(
                "event=task_list_by_date module=service status=rejected error_code=invalid_date"
            );
            return Err(ServiceError::InvalidDate { year, month, day });
        };
        let result = self.repo.list_tasks_by_date(date);
        log_outcome("task_list_by_date", &result);
        Ok(result?)
    }

    pub fn delete_all_tasks(&self) -> ServiceResult<()> {
        let result = self.repo.delete_all_tasks();
        log_outcome("task_delete_all", &result);
        Ok(result?)
    }

    pub fn delete_task(&self, id: TaskId) -> ServiceResult<()> {
        let result = self.repo.delete_task(id);
        log_outcome("task_delete", &result);
        Ok(result?)
    }
}

fn log_outcome<T>(event: &str, result: &Result<T, RepoError>) {
    match result {
        Ok(_) => {}
        Err(err) if err.is_not_found() => {
            info!("event={event} module=service status=not_found");
        }
        Err(err) => {
            error!("event={event} module=service status=error error={err}");
        }
    }
}
