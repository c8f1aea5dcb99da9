//! SQLite-backed task repository.
//!
//! # Responsibility
//! - Persist tasks in the single `tasks` table.
//! - Keep SQL and column encoding details inside this module.
//!
//! # Invariants
//! - The connection is opened once and owned for the repository lifetime.
//! - `tags` is a JSON array, so tags containing commas round-trip losslessly.
//! - `due` is RFC 3339 with its original offset; `due_date` is the
//!   `YYYY-MM-DD` calendar day in that same offset.
//! - Read paths reject malformed rows instead of masking them.

use crate::db::{open_db, open_db_in_memory, remove_db_file};
use crate::model::task::{NewTask, Task, TaskId};
use crate::repo::task_repo::{non_empty, Lookup, RepoError, RepoResult, TaskRepository};
use chrono::{DateTime, NaiveDate, SecondsFormat};
use log::{debug, info};
use rusqlite::{params, Connection, Params, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    text,
    tags,
    due
FROM tasks";

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite task store guarded by a single mutex around its connection.
pub struct SqliteTaskRepository {
    conn: Mutex<Connection>,
}

impl SqliteTaskRepository {
    /// Opens a fresh store at `path`.
    ///
    /// Any previous database file at `path` is removed first, so every
    /// process start begins with an empty store.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        remove_db_file(path)?;
        let repo = Self::from_ready_connection(open_db(path)?);
        info!(
            "event=repo_open module=repo backend=sqlite status=ok mode=fresh path={}",
            path.display()
        );
        Ok(repo)
    }

    /// Opens the store at `path`, keeping tasks written by earlier runs.
    pub fn open_existing(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let repo = Self::from_ready_connection(open_db(path)?);
        info!(
            "event=repo_open module=repo backend=sqlite status=ok mode=existing path={}",
            path.display()
        );
        Ok(repo)
    }

    /// Opens a private in-memory SQLite store.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::from_ready_connection(open_db_in_memory()?))
    }

    /// Wraps a connection opened elsewhere after checking its schema.
    ///
    /// The connection must already be migrated (see `db::open_db`).
    pub fn from_connection(conn: Connection) -> RepoResult<Self> {
        ensure_tasks_table(&conn)?;
        Ok(Self::from_ready_connection(conn))
    }

    fn from_ready_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock()?)
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn create_task(&self, task: &NewTask) -> RepoResult<TaskId> {
        let tags = encode_tags(&task.tags)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (text, tags, due, due_date) VALUES (?1, ?2, ?3, ?4);",
            params![
                task.text.as_str(),
                tags,
                encode_due(&task.due),
                task.due.date_naive().format(DUE_DATE_FORMAT).to_string(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("event=task_insert module=repo backend=sqlite status=ok id={id}");
        Ok(id)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Task> {
        let conn = self.lock()?;
        let mut tasks = query_tasks(&conn, &format!("{TASK_SELECT_SQL} WHERE id = ?1;"), [id])?;
        tasks.pop().ok_or_else(|| RepoError::NotFound(Lookup::Id(id)))
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let conn = self.lock()?;
        query_tasks(&conn, &format!("{TASK_SELECT_SQL} ORDER BY id ASC;"), [])
    }

    fn list_tasks_by_tag(&self, tag: &str) -> RepoResult<Vec<Task>> {
        let conn = self.lock()?;
        let tasks = query_tasks(
            &conn,
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE EXISTS (
                    SELECT 1
                    FROM json_each(tasks.tags)
                    WHERE json_each.value = ?1
                 )
                 ORDER BY id ASC;"
            ),
            [tag],
        )?;
        non_empty(tasks, || Lookup::Tag(tag.to_string()))
    }

    fn list_tasks_by_date(&self, date: NaiveDate) -> RepoResult<Vec<Task>> {
        let conn = self.lock()?;
        let tasks = query_tasks(
            &conn,
            &format!("{TASK_SELECT_SQL} WHERE due_date = ?1 ORDER BY id ASC;"),
            [date.format(DUE_DATE_FORMAT).to_string()],
        )?;
        non_empty(tasks, || Lookup::Date(date))
    }

    fn delete_all_tasks(&self) -> RepoResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM tasks;", [])?;
        debug!("event=task_delete_all module=repo backend=sqlite status=ok removed={removed}");
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(Lookup::Id(id)));
        }
        debug!("event=task_delete module=repo backend=sqlite status=ok id={id}");
        Ok(())
    }
}

fn query_tasks(conn: &Connection, sql: &str, params: impl Params) -> RepoResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id: TaskId = row.get("id")?;

    let tags_text: String = row.get("tags")?;
    let tags = serde_json::from_str::<Vec<String>>(&tags_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid tags value `{tags_text}` in tasks.tags for id={id}: {err}"
        ))
    })?;

    let due_text: String = row.get("due")?;
    let due = DateTime::parse_from_rfc3339(&due_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid due value `{due_text}` in tasks.due for id={id}: {err}"
        ))
    })?;

    Ok(Task {
        id,
        text: row.get("text")?,
        tags,
        due,
    })
}

fn encode_tags(tags: &[String]) -> RepoResult<String> {
    serde_json::to_string(tags)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode tags: {err}")))
}

fn encode_due(due: &DateTime<chrono::FixedOffset>) -> String {
    due.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

fn ensure_tasks_table(conn: &Connection) -> RepoResult<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(tasks);")?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }

    for required in ["id", "text", "tags", "due", "due_date"] {
        if !columns.iter().any(|column| column == required) {
            return Err(RepoError::InvalidData(format!(
                "tasks table is missing column `{required}`"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{encode_due, SqliteTaskRepository};
    use crate::repo::task_repo::TaskRepository;
    use chrono::DateTime;

    #[test]
    fn encode_due_keeps_offset_and_subseconds() {
        let due = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.250+05:30").unwrap();
        assert_eq!(encode_due(&due), "2024-05-01T10:00:00.250+05:30");
        let whole = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(encode_due(&whole), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn malformed_tags_row_is_invalid_data() {
        let repo = SqliteTaskRepository::open_in_memory().unwrap();
        repo.lock()
            .unwrap()
            .execute(
                "INSERT INTO tasks (text, tags, due, due_date)
                 VALUES ('broken', 'a,b', '2024-05-01T10:00:00+00:00', '2024-05-01');",
                [],
            )
            .unwrap();

        let err = repo.list_tasks().unwrap_err();
        assert!(err.is_storage_failure());
        assert!(err.to_string().contains("tasks.tags"));
    }

    #[test]
    fn malformed_due_row_is_invalid_data() {
        let repo = SqliteTaskRepository::open_in_memory().unwrap();
        repo.lock()
            .unwrap()
            .execute(
                "INSERT INTO tasks (text, tags, due, due_date)
                 VALUES ('broken', '[]', '2024-05-01 10:00:00 +0000 UTC', '2024-05-01');",
                [],
            )
            .unwrap();

        let err = repo.get_task(1).unwrap_err();
        assert!(err.to_string().contains("tasks.due"));
    }
}
