//! Task repository contract and error taxonomy.
//!
//! # Responsibility
//! - Declare the operations every backend must serve.
//! - Classify failures into "not found" and "storage failure".
//!
//! # Invariants
//! - Filtered lists (`by tag`, `by date`) report `NotFound` when empty;
//!   `list_tasks` never does.
//! - Ids returned by `create_task` are unique and never reused.

use crate::db::DbError;
use crate::model::task::{NewTask, Task, TaskId};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// What a failed lookup was looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(TaskId),
    Tag(String),
    Date(NaiveDate),
}

impl Display for Lookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "task with id={id} not found"),
            Self::Tag(tag) => write!(f, "tasks with tag={tag} not found"),
            Self::Date(date) => write!(f, "tasks on date={date} not found"),
        }
    }
}

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Target task does not exist or the filtered result set is empty.
    NotFound(Lookup),
    /// Storage engine failure on open, exec or scan.
    Db(DbError),
    /// Stored row could not be decoded into a `Task`.
    InvalidData(String),
    /// A previous operation panicked while holding the store lock.
    LockPoisoned,
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns whether this error is a backend fault rather than a miss.
    pub fn is_storage_failure(&self) -> bool {
        !self.is_not_found()
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(lookup) => write!(f, "{lookup}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::LockPoisoned => write!(f, "task store lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::LockPoisoned => None,
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

impl<T> From<std::sync::PoisonError<T>> for RepoError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

/// Repository interface for task CRUD and query operations.
///
/// Implementations are shared across request threads, so every method takes
/// `&self` and serializes internally.
pub trait TaskRepository: Send + Sync {
    /// Stores a new task and returns its freshly assigned id.
    fn create_task(&self, task: &NewTask) -> RepoResult<TaskId>;
    /// Gets exactly one task by id.
    fn get_task(&self, id: TaskId) -> RepoResult<Task>;
    /// Lists every stored task in ascending id order. Empty store yields `[]`.
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
    /// Lists tasks whose tag list contains `tag` exactly.
    fn list_tasks_by_tag(&self, tag: &str) -> RepoResult<Vec<Task>>;
    /// Lists tasks due on the calendar day `date`.
    fn list_tasks_by_date(&self, date: NaiveDate) -> RepoResult<Vec<Task>>;
    /// Removes every task. Never reports `NotFound`.
    fn delete_all_tasks(&self) -> RepoResult<()>;
    /// Removes one task by id.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
}

impl<R: TaskRepository + ?Sized> TaskRepository for Box<R> {
    fn create_task(&self, task: &NewTask) -> RepoResult<TaskId> {
        (**self).create_task(task)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Task> {
        (**self).get_task(id)
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        (**self).list_tasks()
    }

    fn list_tasks_by_tag(&self, tag: &str) -> RepoResult<Vec<Task>> {
        (**self).list_tasks_by_tag(tag)
    }

    fn list_tasks_by_date(&self, date: NaiveDate) -> RepoResult<Vec<Task>> {
        (**self).list_tasks_by_date(date)
    }

    fn delete_all_tasks(&self) -> RepoResult<()> {
        (**self).delete_all_tasks()
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        (**self).delete_task(id)
    }
}

impl<R: TaskRepository + ?Sized> TaskRepository for std::sync::Arc<R> {
    fn create_task(&self, task: &NewTask) -> RepoResult<TaskId> {
        (**self).create_task(task)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Task> {
        (**self).get_task(id)
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        (**self).list_tasks()
    }

    fn list_tasks_by_tag(&self, tag: &str) -> RepoResult<Vec<Task>> {
        (**self).list_tasks_by_tag(tag)
    }

    fn list_tasks_by_date(&self, date: NaiveDate) -> RepoResult<Vec<Task>> {
        (**self).list_tasks_by_date(date)
    }

    fn delete_all_tasks(&self) -> RepoResult<()> {
        (**self).delete_all_tasks()
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        (**self).delete_task(id)
    }
}

/// Turns an empty filtered result into `NotFound(lookup)`.
pub(crate) fn non_empty(
    tasks: Vec<Task>,
    lookup: impl FnOnce() -> Lookup,
) -> RepoResult<Vec<Task>> {
    if tasks.is_empty() {
        return Err(RepoError::NotFound(lookup()));
    }
    Ok(tasks)
}
