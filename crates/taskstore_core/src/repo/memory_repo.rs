//! In-memory task repository.
//!
//! # Invariants
//! - Ids come from a counter starting at 1 that is never rewound, so an id
//!   is never handed out twice, even after `delete_all_tasks`.
//! - Data lives only as long as the repository value.

use crate::model::task::{NewTask, Task, TaskId};
use crate::repo::task_repo::{non_empty, Lookup, RepoError, RepoResult, TaskRepository};
use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

const FIRST_TASK_ID: TaskId = 1;

/// Process-memory task store guarded by a single mutex.
#[derive(Debug)]
pub struct InMemoryTaskRepository {
    state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    tasks: HashMap<TaskId, Task>,
    next_id: TaskId,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                tasks: HashMap::new(),
                next_id: FIRST_TASK_ID,
            }),
        }
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        Ok(self.state.lock()?)
    }

    fn collect_sorted(&self, predicate: impl Fn(&Task) -> bool) -> RepoResult<Vec<Task>> {
        let state = self.lock()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| predicate(task))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.id);
        Ok(tasks)
    }
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn create_task(&self, task: &NewTask) -> RepoResult<TaskId> {
        let mut state = self.lock()?;
        let id = state.next_id;
        state.next_id += 1;
        state.tasks.insert(id, task.clone().into_task(id));
        debug!("event=task_insert module=repo backend=memory status=ok id={id}");
        Ok(id)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Task> {
        let state = self.lock()?;
        state
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(Lookup::Id(id)))
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        self.collect_sorted(|_| true)
    }

    fn list_tasks_by_tag(&self, tag: &str) -> RepoResult<Vec<Task>> {
        let tasks = self.collect_sorted(|task| task.has_tag(tag))?;
        non_empty(tasks, || Lookup::Tag(tag.to_string()))
    }

    fn list_tasks_by_date(&self, date: NaiveDate) -> RepoResult<Vec<Task>> {
        let tasks = self.collect_sorted(|task| task.is_due_on(date))?;
        non_empty(tasks, || Lookup::Date(date))
    }

    fn delete_all_tasks(&self) -> RepoResult<()> {
        let mut state = self.lock()?;
        let removed = std::mem::take(&mut state.tasks).len();
        debug!("event=task_delete_all module=repo backend=memory status=ok removed={removed}");
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let mut state = self.lock()?;
        if state.tasks.remove(&id).is_none() {
            return Err(RepoError::NotFound(Lookup::Id(id)));
        }
        debug!("event=task_delete module=repo backend=memory status=ok id={id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryTaskRepository;
    use crate::model::task::NewTask;
    use crate::repo::task_repo::TaskRepository;
    use chrono::DateTime;

    fn new_task(text: &str) -> NewTask {
        NewTask::new(
            text,
            ["t"],
            DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap(),
        )
    }

    #[test]
    fn counter_survives_delete_all() {
        let repo = InMemoryTaskRepository::new();
        assert_eq!(repo.create_task(&new_task("a")).unwrap(), 1);
        assert_eq!(repo.create_task(&new_task("b")).unwrap(), 2);
        repo.delete_all_tasks().unwrap();
        assert_eq!(repo.create_task(&new_task("c")).unwrap(), 3);
    }

    #[test]
    fn poisoned_lock_is_reported_as_storage_failure() {
        let repo = std::sync::Arc::new(InMemoryTaskRepository::new());
        let poisoner = std::sync::Arc::clone(&repo);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the store lock");
        })
        .join();

        let err = repo.list_tasks().unwrap_err();
        assert!(err.is_storage_failure());
        assert!(err.to_string().contains("poisoned"));
    }
}
