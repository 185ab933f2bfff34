use super::state::{TimerSnapshot, TimerState};
use crate::db::sessions::Sessions;
use crate::db::tasks::Tasks;
use crate::libs::clock::Clock;
use crate::libs::error::{Error, Result, TimerAction};
use crate::libs::session::SessionState;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Result of a successful stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedSession {
    pub session_id: i64,
    pub task_id: i64,
    pub end_time: DateTime<Utc>,
    /// Net time excluding pauses.
    pub elapsed: Duration,
    pub paused_total: Duration,
}

/// The single process-wide session timer.
///
/// Transitions hold the state lock across the database write, so two callers
/// can never both start a session. The write is the commit point: the new
/// state is stored only after it succeeds.
pub struct SessionStateMachine {
    state: Mutex<TimerState>,
    sessions: Sessions,
    tasks: Tasks,
    clock: Arc<dyn Clock>,
}

impl SessionStateMachine {
    pub fn new(sessions: Sessions, tasks: Tasks, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(TimerState::default()),
            sessions,
            tasks,
            clock,
        }
    }

    /// Adopts a session left open by a previous run, if there is one.
    pub async fn restore(&self) -> Result<Option<TimerSnapshot>> {
        let mut state = self.state.lock().await;
        if state.phase().is_open() {
            return Ok(Some(state.snapshot(self.clock.now())));
        }

        let Some(session) = self.sessions.find_open().await? else {
            return Ok(None);
        };
        let now = self.clock.now();
        *state = TimerState::restored(&session, now);
        info!(session_id = session.id, task_id = session.task_id, state = %session.state, "open session restored");
        Ok(Some(state.snapshot(now)))
    }

    /// Opens a new session for `task_id` and starts the clock.
    pub async fn start(&self, task_id: Option<i64>) -> Result<i64> {
        let task_id = task_id.ok_or(Error::NoActiveTask)?;
        let mut state = self.state.lock().await;
        if state.phase().is_open() {
            return Err(Error::SessionAlreadyActive);
        }

        self.tasks.get(task_id).await?;
        let now = self.clock.now();
        let session_id = self.sessions.insert_open(task_id, now, None).await?;

        *state = TimerState::started(session_id, task_id, now);
        info!(session_id, task_id, "timer started");
        Ok(session_id)
    }

    /// Freezes the clock. Returns the elapsed time at the pause.
    pub async fn pause(&self) -> Result<Duration> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let next = state.paused(now)?;
        let session_id = open_session(&state, TimerAction::Pause)?;

        self.sessions.update_state(session_id, SessionState::Paused).await?;

        *state = next;
        let elapsed = state.elapsed_at(now);
        info!(session_id, elapsed_secs = elapsed.num_seconds(), "timer paused");
        Ok(elapsed)
    }

    pub async fn resume(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let next = state.resumed(self.clock.now())?;
        let session_id = open_session(&state, TimerAction::Resume)?;

        self.sessions.update_state(session_id, SessionState::Running).await?;

        *state = next;
        info!(session_id, paused_secs = state.paused_total().num_seconds(), "timer resumed");
        Ok(())
    }

    /// Closes the session with `end_time = now`. Non-empty `notes` replace
    /// the stored notes.
    pub async fn stop(&self, notes: Option<&str>) -> Result<StoppedSession> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let next = state.stopped(now)?;
        let session_id = open_session(&state, TimerAction::Stop)?;
        let task_id = state.task_id().ok_or(Error::NoActiveTask)?;

        self.sessions.close(session_id, now, notes).await?;

        *state = next;
        let stopped = StoppedSession {
            session_id,
            task_id,
            end_time: now,
            elapsed: state.elapsed_at(now),
            paused_total: state.paused_total(),
        };
        info!(session_id, elapsed_secs = stopped.elapsed.num_seconds(), "timer stopped");
        Ok(stopped)
    }

    /// Clears the in-memory counters. A persisted open session is left
    /// untouched.
    pub async fn reset(&self) {
        *self.state.lock().await = TimerState::default();
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.state.lock().await.snapshot(self.clock.now())
    }

    pub async fn elapsed(&self) -> Duration {
        self.state.lock().await.elapsed_at(self.clock.now())
    }

    pub async fn phase(&self) -> SessionState {
        self.state.lock().await.phase()
    }
}

fn open_session(state: &TimerState, action: TimerAction) -> Result<i64> {
    state.session_id().ok_or_else(|| Error::InvalidTransition {
        from: state.phase().to_string(),
        action,
    })
}
