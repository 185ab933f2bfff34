//! Session repository.
//!
//! Rows store only start, end, notes and state. Paused time is never written
//! here; net elapsed time is the timer's business.

use super::retry::RetryExecutor;
use super::unit_of_work::TransactionCoordinator;
use crate::libs::error::{Error, Result, TimerAction};
use crate::libs::session::{CategorySummary, Session, SessionState, TaskSummary};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

const SELECT_SESSIONS: &str = "SELECT Id, TaskId, StartTime, EndTime, Notes,
        COALESCE(State, CASE WHEN EndTime IS NULL THEN 'Running' ELSE 'Stopped' END)
    FROM Sessions";
const OPEN_CONDITION: &str = "EndTime IS NULL AND COALESCE(State, 'Running') <> 'Stopped'";
const INSERT_OPEN_SESSION: &str = "INSERT INTO Sessions (TaskId, StartTime, Notes, State) VALUES (?1, ?2, ?3, 'Running')";
const UPDATE_STATE: &str = "UPDATE Sessions SET State = ?2 WHERE Id = ?1";
const CLOSE_SESSION: &str = "UPDATE Sessions
    SET EndTime = ?2,
        State = 'Stopped',
        Notes = COALESCE(?3, Notes)
    WHERE Id = ?1";
const SELECT_TASK_EXISTS: &str = "SELECT 1 FROM Tasks WHERE Id = ?1";

const SUMMARY_DURATION: &str = "COALESCE(CAST(ROUND(SUM((julianday(s.EndTime) - julianday(s.StartTime)) * 86400.0)) AS INTEGER), 0)";

pub struct SessionRows<'c> {
    conn: &'c Connection,
}

impl<'c> SessionRows<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts a running session. Fails if the task is missing or any
    /// session is still open.
    pub fn insert_open(&self, task_id: i64, start_time: DateTime<Utc>, notes: Option<&str>) -> Result<i64> {
        let task_exists = self.conn.query_row(SELECT_TASK_EXISTS, [task_id], |_| Ok(())).optional()?.is_some();
        if !task_exists {
            return Err(Error::not_found("task", task_id));
        }
        if self.find_open()?.is_some() {
            return Err(Error::SessionAlreadyActive);
        }

        let notes = notes.map(str::trim).filter(|notes| !notes.is_empty());
        self.conn.execute(INSERT_OPEN_SESSION, params![task_id, start_time, notes])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get(&self, session_id: i64) -> Result<Option<Session>> {
        let sql = format!("{SELECT_SESSIONS} WHERE Id = ?1");
        Ok(self.conn.query_row(&sql, [session_id], map_session).optional()?)
    }

    /// The most recently started open session, if any.
    pub fn find_open(&self) -> Result<Option<Session>> {
        let sql = format!("{SELECT_SESSIONS} WHERE {OPEN_CONDITION} ORDER BY julianday(StartTime) DESC, Id DESC LIMIT 1");
        Ok(self.conn.query_row(&sql, [], map_session).optional()?)
    }

    pub fn open_sessions(&self) -> Result<Vec<Session>> {
        self.query(&format!("{SELECT_SESSIONS} WHERE {OPEN_CONDITION} ORDER BY julianday(StartTime) DESC, Id DESC"), [])
    }

    pub fn for_task(&self, task_id: i64) -> Result<Vec<Session>> {
        self.query(&format!("{SELECT_SESSIONS} WHERE TaskId = ?1 ORDER BY julianday(StartTime) DESC, Id DESC"), [task_id])
    }

    pub fn list_all(&self) -> Result<Vec<Session>> {
        self.query(&format!("{SELECT_SESSIONS} ORDER BY julianday(StartTime) DESC, Id DESC"), [])
    }

    /// Moves an open session between `Running` and `Paused`. Stopping goes
    /// through [`SessionRows::close`].
    pub fn update_state(&self, session_id: i64, next: SessionState) -> Result<()> {
        let session = self.get(session_id)?.ok_or_else(|| Error::not_found("session", session_id))?;

        let action = match next {
            SessionState::Paused => TimerAction::Pause,
            SessionState::Running => TimerAction::Resume,
            SessionState::Stopped => TimerAction::Stop,
        };
        if next == SessionState::Stopped || !session.state.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: session.state.to_string(),
                action,
            });
        }

        self.conn.execute(UPDATE_STATE, params![session_id, next])?;
        Ok(())
    }

    /// Stops an open session. Non-empty `notes` replace the stored notes;
    /// otherwise the stored notes are kept.
    pub fn close(&self, session_id: i64, end_time: DateTime<Utc>, notes: Option<&str>) -> Result<()> {
        let session = self.get(session_id)?.ok_or_else(|| Error::not_found("session", session_id))?;
        if !session.is_open() {
            return Err(Error::InvalidTransition {
                from: session.state.to_string(),
                action: TimerAction::Stop,
            });
        }

        let notes = notes.map(str::trim).filter(|notes| !notes.is_empty());
        self.conn.execute(CLOSE_SESSION, params![session_id, end_time, notes])?;
        Ok(())
    }

    /// Closed-session totals per task, ordered by task name.
    pub fn summary(&self) -> Result<Vec<TaskSummary>> {
        let sql = format!(
            "SELECT t.Id, t.Name, c.Name, COUNT(s.Id), {SUMMARY_DURATION}
             FROM Sessions s
             JOIN Tasks t ON t.Id = s.TaskId
             LEFT JOIN Categories c ON c.Id = t.CategoryId
             WHERE s.EndTime IS NOT NULL
             GROUP BY t.Id
             ORDER BY t.Name"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(TaskSummary {
                task_id: row.get(0)?,
                task_name: row.get(1)?,
                category_name: row.get(2)?,
                session_count: row.get(3)?,
                total_duration: Duration::seconds(row.get(4)?),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Closed-session totals per category; uncategorized tasks are grouped
    /// under `None` and listed last.
    pub fn summary_by_category(&self) -> Result<Vec<CategorySummary>> {
        let sql = format!(
            "SELECT c.Id, c.Name, COUNT(s.Id), {SUMMARY_DURATION}
             FROM Sessions s
             JOIN Tasks t ON t.Id = s.TaskId
             LEFT JOIN Categories c ON c.Id = t.CategoryId
             WHERE s.EndTime IS NOT NULL
             GROUP BY c.Id
             ORDER BY c.Name IS NULL, c.Name"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(CategorySummary {
                category_id: row.get(0)?,
                category_name: row.get(1)?,
                session_count: row.get(2)?,
                total_duration: Duration::seconds(row.get(3)?),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map_session)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        task_id: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        notes: row.get(4)?,
        state: row.get(5)?,
    })
}

#[derive(Clone)]
pub struct Sessions {
    executor: RetryExecutor,
    transactions: TransactionCoordinator,
}

impl Sessions {
    pub fn new(executor: RetryExecutor) -> Self {
        Self {
            transactions: TransactionCoordinator::new(executor.clone()),
            executor,
        }
    }

    /// Inserts a new `Running` session and returns its id.
    pub async fn insert_open(&self, task_id: i64, start_time: DateTime<Utc>, notes: Option<&str>) -> Result<i64> {
        let id = self
            .transactions
            .run_in_transaction("session.insert_open", |uow| uow.sessions().insert_open(task_id, start_time, notes))
            .await?;
        info!(session_id = id, task_id, "session opened");
        Ok(id)
    }

    pub async fn update_state(&self, session_id: i64, next: SessionState) -> Result<()> {
        self.transactions
            .run_in_transaction("session.update_state", |uow| uow.sessions().update_state(session_id, next))
            .await?;
        info!(session_id, state = %next, "session state updated");
        Ok(())
    }

    pub async fn close(&self, session_id: i64, end_time: DateTime<Utc>, notes: Option<&str>) -> Result<()> {
        self.transactions
            .run_in_transaction("session.close", |uow| uow.sessions().close(session_id, end_time, notes))
            .await?;
        info!(session_id, "session closed");
        Ok(())
    }

    pub async fn get(&self, session_id: i64) -> Result<Session> {
        self.executor
            .run("session.get", |conn| SessionRows::new(conn).get(session_id))
            .await?
            .ok_or_else(|| Error::not_found("session", session_id))
    }

    pub async fn find_open(&self) -> Result<Option<Session>> {
        self.executor.run("session.find_open", |conn| SessionRows::new(conn).find_open()).await
    }

    /// Sessions left open, most recent first.
    pub async fn open_sessions(&self) -> Result<Vec<Session>> {
        self.executor.run("session.open_sessions", |conn| SessionRows::new(conn).open_sessions()).await
    }

    /// Sessions of a task, most recent first.
    pub async fn for_task(&self, task_id: i64) -> Result<Vec<Session>> {
        self.executor.run("session.for_task", |conn| SessionRows::new(conn).for_task(task_id)).await
    }

    pub async fn list_all(&self) -> Result<Vec<Session>> {
        self.executor.run("session.list_all", |conn| SessionRows::new(conn).list_all()).await
    }

    pub async fn summary(&self) -> Result<Vec<TaskSummary>> {
        self.executor.run("session.summary", |conn| SessionRows::new(conn).summary()).await
    }

    pub async fn summary_by_category(&self) -> Result<Vec<CategorySummary>> {
        self.executor
            .run("session.summary_by_category", |conn| SessionRows::new(conn).summary_by_category())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::categories::CategoryRows;
    use crate::db::schema::SchemaInitializer;
    use crate::db::tasks::TaskRows;
    use chrono::TimeZone;

    fn connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        SchemaInitializer::initialize(&mut conn).unwrap();
        conn
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn only_one_session_may_be_open() {
        let conn = connection();
        let task = TaskRows::new(&conn).insert("Write report", None).unwrap();
        let other = TaskRows::new(&conn).insert("Answer mail", None).unwrap();
        let rows = SessionRows::new(&conn);

        rows.insert_open(task, at(9, 0), None).unwrap();
        assert!(matches!(rows.insert_open(other, at(9, 5), None), Err(Error::SessionAlreadyActive)));
    }

    #[test]
    fn insert_for_missing_task_is_not_found() {
        let conn = connection();
        let rows = SessionRows::new(&conn);
        assert!(matches!(rows.insert_open(42, at(9, 0), None), Err(Error::NotFound { entity: "task", id: 42 })));
    }

    #[test]
    fn state_updates_follow_the_transition_rules() {
        let conn = connection();
        let task = TaskRows::new(&conn).insert("Write report", None).unwrap();
        let rows = SessionRows::new(&conn);
        let id = rows.insert_open(task, at(9, 0), None).unwrap();

        assert!(matches!(
            rows.update_state(id, SessionState::Running),
            Err(Error::InvalidTransition { action: TimerAction::Resume, .. })
        ));
        rows.update_state(id, SessionState::Paused).unwrap();
        assert_eq!(rows.get(id).unwrap().unwrap().state, SessionState::Paused);
        assert!(matches!(rows.update_state(id, SessionState::Stopped), Err(Error::InvalidTransition { .. })));
        rows.update_state(id, SessionState::Running).unwrap();
    }

    #[test]
    fn close_merges_notes_and_sets_end_time() {
        let conn = connection();
        let task = TaskRows::new(&conn).insert("Write report", None).unwrap();
        let rows = SessionRows::new(&conn);

        let first = rows.insert_open(task, at(9, 0), Some("draft outline")).unwrap();
        rows.close(first, at(10, 0), Some("   ")).unwrap();
        let closed = rows.get(first).unwrap().unwrap();
        assert_eq!(closed.notes.as_deref(), Some("draft outline"));
        assert_eq!(closed.state, SessionState::Stopped);
        assert_eq!(closed.end_time, Some(at(10, 0)));
        assert_eq!(closed.duration(), Some(Duration::hours(1)));

        let second = rows.insert_open(task, at(11, 0), Some("old")).unwrap();
        rows.close(second, at(11, 30), Some("final notes")).unwrap();
        assert_eq!(rows.get(second).unwrap().unwrap().notes.as_deref(), Some("final notes"));

        assert!(matches!(rows.close(second, at(12, 0), None), Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn closing_notes_are_stored_trimmed() {
        let conn = connection();
        let task = TaskRows::new(&conn).insert("Write report", None).unwrap();
        let rows = SessionRows::new(&conn);

        let id = rows.insert_open(task, at(9, 0), None).unwrap();
        rows.close(id, at(9, 45), Some("  sent to review \n")).unwrap();

        assert_eq!(rows.get(id).unwrap().unwrap().notes.as_deref(), Some("sent to review"));
    }

    #[test]
    fn sessions_for_task_are_newest_first() {
        let conn = connection();
        let task = TaskRows::new(&conn).insert("Write report", None).unwrap();
        let rows = SessionRows::new(&conn);
        for hour in [9, 13, 11] {
            let id = rows.insert_open(task, at(hour, 0), None).unwrap();
            rows.close(id, at(hour, 30), None).unwrap();
        }

        let starts: Vec<_> = rows.for_task(task).unwrap().into_iter().map(|s| s.start_time).collect();
        assert_eq!(starts, vec![at(13, 0), at(11, 0), at(9, 0)]);
    }

    #[test]
    fn summaries_count_closed_sessions_only() {
        let conn = connection();
        let work = CategoryRows::new(&conn).insert("Work", "#FFFFFF").unwrap();
        let tasks = TaskRows::new(&conn);
        let report = tasks.insert("Write report", Some(work)).unwrap();
        let mail = tasks.insert("Answer mail", None).unwrap();
        let rows = SessionRows::new(&conn);

        let id = rows.insert_open(report, at(9, 0), None).unwrap();
        rows.close(id, at(10, 0), None).unwrap();
        let id = rows.insert_open(report, at(11, 0), None).unwrap();
        rows.close(id, at(11, 15), None).unwrap();
        let id = rows.insert_open(mail, at(12, 0), None).unwrap();
        rows.close(id, at(12, 10), None).unwrap();
        rows.insert_open(mail, at(13, 0), None).unwrap();

        let by_task = rows.summary().unwrap();
        assert_eq!(by_task.len(), 2);
        assert_eq!(by_task[0].task_name, "Answer mail");
        assert_eq!(by_task[0].session_count, 1);
        assert_eq!(by_task[0].total_duration, Duration::minutes(10));
        assert_eq!(by_task[1].session_count, 2);
        assert_eq!(by_task[1].total_duration, Duration::minutes(75));
        assert_eq!(by_task[1].category_name.as_deref(), Some("Work"));

        let by_category = rows.summary_by_category().unwrap();
        assert_eq!(by_category[0].category_name.as_deref(), Some("Work"));
        assert_eq!(by_category[0].total_duration, Duration::minutes(75));
        assert_eq!(by_category[1].category_id, None);
        assert_eq!(by_category[1].session_count, 1);
    }
}
