//! Task repository.
//!
//! [`TaskRows`] holds the statements and runs on whatever connection or
//! transaction it is given. [`Tasks`] is the async surface: single statements
//! go through the retry executor, multi-statement writes through the
//! transaction coordinator.

use super::retry::RetryExecutor;
use super::unit_of_work::TransactionCoordinator;
use crate::libs::error::{is_unique_violation, Error, Result};
use crate::libs::task::{normalize_tags, validate_task_name, Task, TaskFilter};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use tracing::info;

const TAG_SEPARATOR: char = '\u{1f}';

const INSERT_TASK: &str = "INSERT INTO Tasks (Name, CategoryId) VALUES (?1, ?2)";
const INSERT_TASK_IF_ABSENT: &str = "INSERT INTO Tasks (Name, CategoryId) VALUES (?1, ?2) ON CONFLICT(Name) DO NOTHING";
const SELECT_TASK_ID_BY_NAME: &str = "SELECT Id FROM Tasks WHERE Name = ?1";
const SELECT_TASKS: &str = "SELECT t.Id, t.Name, t.IsComplete, t.CategoryId, c.Name, t.CreatedAt, GROUP_CONCAT(tt.Tag, char(31))
    FROM Tasks t
    LEFT JOIN Categories c ON c.Id = t.CategoryId
    LEFT JOIN TaskTags tt ON tt.TaskId = t.Id";
const UPDATE_CATEGORY: &str = "UPDATE Tasks SET CategoryId = ?2 WHERE Id = ?1";
const UPDATE_COMPLETE: &str = "UPDATE Tasks SET IsComplete = ?2 WHERE Id = ?1";
const SELECT_TAGS: &str = "SELECT Tag FROM TaskTags WHERE TaskId = ?1 ORDER BY Tag";
const DELETE_TAGS: &str = "DELETE FROM TaskTags WHERE TaskId = ?1";
const INSERT_TAG: &str = "INSERT INTO TaskTags (TaskId, Tag) VALUES (?1, ?2)";
const DELETE_SESSIONS: &str = "DELETE FROM Sessions WHERE TaskId = ?1";
const DELETE_TASK: &str = "DELETE FROM Tasks WHERE Id = ?1";
const SELECT_TASK_EXISTS: &str = "SELECT 1 FROM Tasks WHERE Id = ?1";

/// Task statements bound to one connection or transaction.
pub struct TaskRows<'c> {
    conn: &'c Connection,
}

impl<'c> TaskRows<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts a task whose name is already validated.
    pub fn insert(&self, name: &str, category_id: Option<i64>) -> Result<i64> {
        match self.conn.execute(INSERT_TASK, params![name, category_id]) {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if is_unique_violation(&err) => Err(Error::DuplicateName {
                entity: "task",
                name: name.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the id of the task called `name`, inserting it first if needed.
    pub fn insert_or_get(&self, name: &str, category_id: Option<i64>) -> Result<i64> {
        self.conn.execute(INSERT_TASK_IF_ABSENT, params![name, category_id])?;
        Ok(self.conn.query_row(SELECT_TASK_ID_BY_NAME, [name], |row| row.get(0))?)
    }

    pub fn exists(&self, task_id: i64) -> Result<bool> {
        Ok(self.conn.query_row(SELECT_TASK_EXISTS, [task_id], |_| Ok(())).optional()?.is_some())
    }

    pub fn get(&self, task_id: i64) -> Result<Option<Task>> {
        let sql = format!("{SELECT_TASKS} WHERE t.Id = ?1 GROUP BY t.Id");
        Ok(self.conn.query_row(&sql, [task_id], map_task).optional()?)
    }

    /// Tasks ordered by name, narrowed by completion.
    pub fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let mut stmt;
        let rows = match filter.completion() {
            None => {
                stmt = self.conn.prepare(&format!("{SELECT_TASKS} GROUP BY t.Id ORDER BY t.Name"))?;
                stmt.query_map([], map_task)?
            }
            Some(complete) => {
                stmt = self.conn.prepare(&format!("{SELECT_TASKS} WHERE t.IsComplete = ?1 GROUP BY t.Id ORDER BY t.Name"))?;
                stmt.query_map([complete], map_task)?
            }
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_category(&self, task_id: i64, category_id: Option<i64>) -> Result<()> {
        let changed = self.conn.execute(UPDATE_CATEGORY, params![task_id, category_id])?;
        if changed == 0 {
            return Err(Error::not_found("task", task_id));
        }
        Ok(())
    }

    pub fn set_complete(&self, task_id: i64, complete: bool) -> Result<()> {
        let changed = self.conn.execute(UPDATE_COMPLETE, params![task_id, complete])?;
        if changed == 0 {
            return Err(Error::not_found("task", task_id));
        }
        Ok(())
    }

    pub fn tags(&self, task_id: i64) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(SELECT_TAGS)?;
        let tags = stmt.query_map([task_id], |row| row.get(0))?;
        Ok(tags.collect::<rusqlite::Result<_>>()?)
    }

    /// Deletes every tag of the task and inserts `tags`. Must run inside a
    /// transaction to be atomic.
    pub fn replace_tags(&self, task_id: i64, tags: &BTreeSet<String>) -> Result<()> {
        if !self.exists(task_id)? {
            return Err(Error::not_found("task", task_id));
        }
        self.conn.execute(DELETE_TAGS, [task_id])?;
        let mut insert = self.conn.prepare(INSERT_TAG)?;
        for tag in tags {
            insert.execute(params![task_id, tag])?;
        }
        Ok(())
    }

    /// Deletes the task's tags, sessions and the task row. Must run inside a
    /// transaction to be atomic.
    pub fn delete(&self, task_id: i64) -> Result<()> {
        self.conn.execute(DELETE_TAGS, [task_id])?;
        self.conn.execute(DELETE_SESSIONS, [task_id])?;
        let deleted = self.conn.execute(DELETE_TASK, [task_id])?;
        if deleted == 0 {
            return Err(Error::not_found("task", task_id));
        }
        Ok(())
    }
}

fn map_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let tags: Option<String> = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        is_complete: row.get(2)?,
        category_id: row.get(3)?,
        category_name: row.get(4)?,
        created_at: row.get(5)?,
        tags: tags
            .map(|joined| joined.split(TAG_SEPARATOR).map(str::to_string).collect())
            .unwrap_or_default(),
    })
}

#[derive(Clone)]
pub struct Tasks {
    executor: RetryExecutor,
    transactions: TransactionCoordinator,
}

impl Tasks {
    pub fn new(executor: RetryExecutor) -> Self {
        Self {
            transactions: TransactionCoordinator::new(executor.clone()),
            executor,
        }
    }

    /// Creates a task. An existing name is a `DuplicateName` error.
    pub async fn create(&self, name: &str, category_id: Option<i64>) -> Result<i64> {
        let name = validate_task_name(name)?;
        let id = self.executor.run("task.create", |conn| TaskRows::new(conn).insert(&name, category_id)).await?;
        info!(task_id = id, name = %name, "task created");
        Ok(id)
    }

    /// Creates a task or returns the id of the existing task with that name.
    pub async fn create_or_get(&self, name: &str, category_id: Option<i64>) -> Result<i64> {
        let name = validate_task_name(name)?;
        self.transactions
            .run_in_transaction("task.create_or_get", |uow| uow.tasks().insert_or_get(&name, category_id))
            .await
    }

    pub async fn list(&self) -> Result<Vec<Task>> {
        self.filter_by_completion(TaskFilter::All).await
    }

    pub async fn filter_by_completion(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        self.executor.run("task.list", |conn| TaskRows::new(conn).list(filter)).await
    }

    pub async fn get(&self, task_id: i64) -> Result<Task> {
        self.executor
            .run("task.get", |conn| TaskRows::new(conn).get(task_id))
            .await?
            .ok_or_else(|| Error::not_found("task", task_id))
    }

    pub async fn set_category(&self, task_id: i64, category_id: Option<i64>) -> Result<()> {
        self.executor
            .run("task.set_category", |conn| TaskRows::new(conn).set_category(task_id, category_id))
            .await
    }

    pub async fn set_complete(&self, task_id: i64, complete: bool) -> Result<()> {
        self.executor
            .run("task.set_complete", |conn| TaskRows::new(conn).set_complete(task_id, complete))
            .await
    }

    pub async fn tags(&self, task_id: i64) -> Result<BTreeSet<String>> {
        self.executor.run("task.tags", |conn| TaskRows::new(conn).tags(task_id)).await
    }

    /// Replaces the whole tag set in one transaction; a failure leaves the
    /// previous tags in place.
    pub async fn replace_tags<I, S>(&self, task_id: i64, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags = normalize_tags(tags);
        self.transactions
            .run_in_transaction("task.replace_tags", |uow| uow.tasks().replace_tags(task_id, &tags))
            .await?;
        info!(task_id, count = tags.len(), "task tags replaced");
        Ok(())
    }

    /// Deletes the task together with its tags and sessions.
    pub async fn delete(&self, task_id: i64) -> Result<()> {
        self.transactions
            .run_in_transaction("task.delete", |uow| uow.tasks().delete(task_id))
            .await?;
        info!(task_id, "task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::SchemaInitializer;

    fn connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        SchemaInitializer::initialize(&mut conn).unwrap();
        conn
    }

    #[test]
    fn insert_rejects_duplicate_names() {
        let conn = connection();
        let rows = TaskRows::new(&conn);
        rows.insert("Write report", None).unwrap();
        let err = rows.insert("Write report", None).unwrap_err();
        assert!(matches!(err, Error::DuplicateName { entity: "task", .. }));
    }

    #[test]
    fn insert_or_get_returns_existing_id() {
        let conn = connection();
        let rows = TaskRows::new(&conn);
        let first = rows.insert_or_get("Write report", None).unwrap();
        let second = rows.insert_or_get("Write report", None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn list_joins_category_and_tags() {
        let conn = connection();
        conn.execute("INSERT INTO Categories (Name) VALUES ('Work')", []).unwrap();
        let rows = TaskRows::new(&conn);
        let id = rows.insert("Write report", Some(1)).unwrap();
        rows.insert("Answer mail", None).unwrap();
        rows.replace_tags(id, &normalize_tags(["urgent", "q3"])).unwrap();

        let tasks = rows.list(TaskFilter::All).unwrap();
        let names: Vec<_> = tasks.iter().map(|task| task.name.as_str()).collect();
        assert_eq!(names, vec!["Answer mail", "Write report"]);

        let report = &tasks[1];
        assert_eq!(report.category_name.as_deref(), Some("Work"));
        assert_eq!(report.tags, normalize_tags(["q3", "urgent"]));
        assert!(tasks[0].tags.is_empty());
    }

    #[test]
    fn filter_by_completion() {
        let conn = connection();
        let rows = TaskRows::new(&conn);
        let done = rows.insert("Finished task", None).unwrap();
        rows.insert("Open task", None).unwrap();
        rows.set_complete(done, true).unwrap();

        let complete = rows.list(TaskFilter::Complete).unwrap();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].id, done);
        assert_eq!(rows.list(TaskFilter::Incomplete).unwrap()[0].name, "Open task");
    }

    #[test]
    fn updates_on_missing_task_are_not_found() {
        let conn = connection();
        let rows = TaskRows::new(&conn);
        assert!(matches!(rows.set_category(99, None), Err(Error::NotFound { .. })));
        assert!(matches!(rows.set_complete(99, true), Err(Error::NotFound { .. })));
        assert!(matches!(rows.delete(99), Err(Error::NotFound { .. })));
    }
}
