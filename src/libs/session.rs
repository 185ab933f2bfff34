//! Session model, the persisted session state and summary rows.

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state stored in `Sessions.State`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    Running,
    Paused,
    #[default]
    Stopped,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Running => "Running",
            SessionState::Paused => "Paused",
            SessionState::Stopped => "Stopped",
        }
    }

    /// A session is open while it is not stopped.
    pub fn is_open(self) -> bool {
        self != SessionState::Stopped
    }

    /// Transitions the timer allows between persisted states.
    ///
    /// `Stopped` is terminal; a new session row is created for every start.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Running, SessionState::Paused) | (SessionState::Paused, SessionState::Running) | (SessionState::Running | SessionState::Paused, SessionState::Stopped)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown session state: {0}")]
pub struct ParseSessionStateError(pub String);

impl FromStr for SessionState {
    type Err = ParseSessionStateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Running" => Ok(SessionState::Running),
            "Paused" => Ok(SessionState::Paused),
            "Stopped" => Ok(SessionState::Stopped),
            other => Err(ParseSessionStateError(other.to_string())),
        }
    }
}

impl ToSql for SessionState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SessionState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub task_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub state: SessionState,
}

impl Session {
    /// Raw wall-clock span of a closed session. Paused time is not
    /// subtracted; the stored row does not know about pauses.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }
}

/// Aggregated closed-session totals for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub task_id: i64,
    pub task_name: String,
    pub category_name: Option<String>,
    pub session_count: i64,
    pub total_duration: Duration,
}

/// Aggregated closed-session totals for one category; `None` collects
/// uncategorized tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub session_count: i64,
    pub total_duration: Duration,
}
