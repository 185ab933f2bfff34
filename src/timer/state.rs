//! Elapsed-time accounting for the active session.
//!
//! `TimerState` is a plain value. Every transition takes the current state
//! and an instant and returns the next state without mutating anything, so
//! the controller can persist first and swap the value in only on success.

use crate::libs::error::{Error, Result, TimerAction};
use crate::libs::session::{Session, SessionState};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    phase: SessionState,
    session_id: Option<i64>,
    task_id: Option<i64>,
    started_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    paused_total: Duration,
    /// Elapsed value shown while paused or after stop.
    frozen: Duration,
}

/// Read-only view of the timer for display ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub state: SessionState,
    pub session_id: Option<i64>,
    pub task_id: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
    #[serde(serialize_with = "serialize_seconds")]
    pub paused_total: Duration,
}

fn serialize_seconds<S: serde::Serializer>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.num_seconds())
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            phase: SessionState::Stopped,
            session_id: None,
            task_id: None,
            started_at: None,
            paused_at: None,
            paused_total: Duration::zero(),
            frozen: Duration::zero(),
        }
    }
}

impl TimerState {
    /// A running timer for a freshly inserted session.
    pub fn started(session_id: i64, task_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            phase: SessionState::Running,
            session_id: Some(session_id),
            task_id: Some(task_id),
            started_at: Some(now),
            ..Self::default()
        }
    }

    /// Adopts a session left open by an earlier run. Pauses taken before the
    /// restart are not stored, so accounting starts from the stored start
    /// time; a paused session is frozen at `now`.
    pub fn restored(session: &Session, now: DateTime<Utc>) -> Self {
        let mut state = Self {
            phase: SessionState::Running,
            session_id: Some(session.id),
            task_id: Some(session.task_id),
            started_at: Some(session.start_time),
            ..Self::default()
        };
        if session.state == SessionState::Paused {
            state.frozen = state.elapsed_at(now);
            state.phase = SessionState::Paused;
            state.paused_at = Some(now);
        }
        state
    }

    pub fn phase(&self) -> SessionState {
        self.phase
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    pub fn task_id(&self) -> Option<i64> {
        self.task_id
    }

    pub fn paused_total(&self) -> Duration {
        self.paused_total
    }

    /// `(now - start) - paused` while running; the frozen value otherwise.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        match (self.phase, self.started_at) {
            (SessionState::Running, Some(start)) => (now - start - self.paused_total).max(Duration::zero()),
            _ => self.frozen,
        }
    }

    pub fn paused(&self, now: DateTime<Utc>) -> Result<Self> {
        self.require(SessionState::Running, TimerAction::Pause)?;
        Ok(Self {
            phase: SessionState::Paused,
            paused_at: Some(now),
            frozen: self.elapsed_at(now),
            ..self.clone()
        })
    }

    pub fn resumed(&self, now: DateTime<Utc>) -> Result<Self> {
        self.require(SessionState::Paused, TimerAction::Resume)?;
        Ok(Self {
            phase: SessionState::Running,
            paused_at: None,
            paused_total: self.paused_total + self.pause_span(now),
            frozen: Duration::zero(),
            ..self.clone()
        })
    }

    /// Folds an ongoing pause into the total and freezes the final elapsed
    /// time. The session id is cleared; the elapsed value stays visible
    /// until reset.
    pub fn stopped(&self, now: DateTime<Utc>) -> Result<Self> {
        if !self.phase.is_open() {
            return Err(self.invalid(TimerAction::Stop));
        }
        let paused_total = self.paused_total + self.pause_span(now);
        let elapsed = match self.started_at {
            Some(start) => (now - start - paused_total).max(Duration::zero()),
            None => Duration::zero(),
        };
        Ok(Self {
            phase: SessionState::Stopped,
            session_id: None,
            paused_at: None,
            paused_total,
            frozen: elapsed,
            ..self.clone()
        })
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerSnapshot {
        TimerSnapshot {
            state: self.phase,
            session_id: self.session_id,
            task_id: self.task_id,
            started_at: self.started_at,
            elapsed: self.elapsed_at(now),
            paused_total: self.paused_total + self.pause_span(now),
        }
    }

    fn pause_span(&self, now: DateTime<Utc>) -> Duration {
        match (self.phase, self.paused_at) {
            (SessionState::Paused, Some(since)) => (now - since).max(Duration::zero()),
            _ => Duration::zero(),
        }
    }

    fn require(&self, expected: SessionState, action: TimerAction) -> Result<()> {
        if self.phase != expected {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: TimerAction) -> Error {
        Error::InvalidTransition {
            from: self.phase.to_string(),
            action,
        }
    }
}
