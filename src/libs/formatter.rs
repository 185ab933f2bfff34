//! Duration and timestamp formatting for console output.
//!
//! Timer values are shown to the second, so durations use `HH:MM:SS`.
//! Negative durations never reach the user; they are shown as zero.
//!
//! ```rust
//! use pricis::libs::formatter::format_duration;
//! use chrono::Duration;
//!
//! assert_eq!(format_duration(&Duration::seconds(3725)), "01:02:05");
//! assert_eq!(format_duration(&Duration::hours(-1)), "00:00:00");
//! ```

use crate::libs::session::Session;
use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};

/// A session prepared for a table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedSession {
    pub id: i64,
    pub task_id: i64,
    /// Local start time, `YYYY-MM-DD HH:MM`.
    pub start: String,
    /// Local end time, or `-` while the session is open.
    pub end: String,
    /// Wall-clock span, or `--:--:--` while open.
    pub duration: String,
    pub state: String,
    pub notes: String,
}

impl From<&Session> for FormattedSession {
    fn from(session: &Session) -> Self {
        FormattedSession {
            id: session.id,
            task_id: session.task_id,
            start: format_timestamp(&session.start_time),
            end: session.end_time.as_ref().map(format_timestamp).unwrap_or_else(|| "-".to_string()),
            duration: session
                .duration()
                .map(|duration| format_duration(&duration))
                .unwrap_or_else(|| "--:--:--".to_string()),
            state: session.state.to_string(),
            notes: session.notes.clone().unwrap_or_default(),
        }
    }
}

/// Formats a duration as zero-padded `HH:MM:SS`; hours may exceed 24.
pub fn format_duration(duration: &Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Formats a stored UTC instant in the local time zone.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::session::SessionState;

    #[test]
    fn durations_are_padded() {
        assert_eq!(format_duration(&Duration::zero()), "00:00:00");
        assert_eq!(format_duration(&Duration::seconds(59)), "00:00:59");
        assert_eq!(format_duration(&Duration::minutes(90)), "01:30:00");
        assert_eq!(format_duration(&Duration::hours(27)), "27:00:00");
    }

    #[test]
    fn negative_duration_is_zero() {
        assert_eq!(format_duration(&Duration::seconds(-5)), "00:00:00");
    }

    #[test]
    fn open_session_has_placeholders() {
        let session = Session {
            id: 1,
            task_id: 2,
            start_time: Utc::now(),
            end_time: None,
            notes: None,
            state: SessionState::Running,
        };
        let formatted = FormattedSession::from(&session);
        assert_eq!(formatted.end, "-");
        assert_eq!(formatted.duration, "--:--:--");
        assert_eq!(formatted.state, "Running");
    }
}
