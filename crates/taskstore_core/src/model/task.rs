//! Task domain model.
//!
//! # Responsibility
//! - Define the stored `Task` record and the `NewTask` create input.
//! - Provide tag and calendar-day predicates used by query paths.
//!
//! # Invariants
//! - `id` is assigned by the repository, never by callers.
//! - `tags` keeps caller order and duplicates as given.
//! - `due` keeps the offset it was created with.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Repository-assigned task identifier.
///
/// Matches SQLite rowid width so both backends share one id space.
pub type TaskId = i64;

/// Stored task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id, monotonically assigned on create.
    pub id: TaskId,
    /// Free-form description. Not validated.
    pub text: String,
    /// Ordered tag list; may be empty, duplicates allowed.
    pub tags: Vec<String>,
    /// Due timestamp with its original offset.
    pub due: DateTime<FixedOffset>,
}

impl Task {
    /// Returns whether `tag` is an element of this task's tag list.
    ///
    /// Exact, case-sensitive comparison. `"work"` does not match `"homework"`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value == tag)
    }

    /// Returns whether this task is due on `date`.
    ///
    /// The calendar day is taken in the task's own offset; time-of-day is
    /// ignored.
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.due.date_naive() == date
    }
}

/// Create-request input for a task that has no id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub due: DateTime<FixedOffset>,
}

impl NewTask {
    pub fn new(
        text: impl Into<String>,
        tags: impl IntoIterator<Item = impl Into<String>>,
        due: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            text: text.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            due,
        }
    }

    /// Materializes the stored record once the repository picked an id.
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            text: self.text,
            tags: self.tags,
            due: self.due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NewTask, Task};
    use chrono::{DateTime, NaiveDate};

    fn task_due(due: &str, tags: &[&str]) -> Task {
        NewTask::new(
            "sample",
            tags.iter().copied(),
            DateTime::parse_from_rfc3339(due).unwrap(),
        )
        .into_task(1)
    }

    #[test]
    fn has_tag_is_exact_membership() {
        let task = task_due("2024-05-01T10:00:00Z", &["homework", "cat"]);
        assert!(task.has_tag("homework"));
        assert!(!task.has_tag("work"));
        assert!(!task.has_tag("Cat"));
    }

    #[test]
    fn is_due_on_ignores_time_of_day() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(task_due("2024-05-01T00:00:00Z", &[]).is_due_on(day));
        assert!(task_due("2024-05-01T23:59:59Z", &[]).is_due_on(day));
        assert!(!task_due("2024-05-02T00:00:01Z", &[]).is_due_on(day));
    }

    #[test]
    fn is_due_on_uses_the_task_offset() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        // 2024-04-30T22:00:00Z in UTC, but May 1st in the +03:00 zone it was written in.
        assert!(task_due("2024-05-01T01:00:00+03:00", &[]).is_due_on(day));
    }

    #[test]
    fn task_serializes_with_rfc3339_due() {
        let task = task_due("2024-05-01T10:00:00+02:00", &["errand"]);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["tags"][0], "errand");
        assert_eq!(json["due"], "2024-05-01T10:00:00+02:00");
    }
}
