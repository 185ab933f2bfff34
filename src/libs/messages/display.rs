//! Display text for [`Message`].
//!
//! All user-facing wording lives here so the commands stay free of string
//! literals.

use super::types::Message;
use std::fmt;

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            // === DATABASE MESSAGES ===
            Message::DatabaseCreated(path) => format!("Created a new database at {}", path),
            Message::DatabaseRecreated(reason) => {
                format!("The database was recreated ({}); previous history may be lost", reason)
            }
            Message::DatabaseOptimized => "Database compacted and statistics refreshed".to_string(),
            Message::DatabaseHealthy => "Database looks healthy".to_string(),
            Message::DatabaseUnhealthy(verdict) => format!("Database check reported: {}", verdict),
            Message::DatabaseRepaired(reason) => format!("Database rebuilt ({}); previous history was removed", reason),
            Message::DatabaseNeedsNoRepair => "Database passed the check; nothing to repair".to_string(),
            Message::StorageBusy => "The database is busy, try again in a moment".to_string(),

            // === TASK MESSAGES ===
            Message::TaskCreated(id, name) => format!("Task #{} '{}' is ready", id, name),
            Message::TaskMarkedComplete(id) => format!("Task #{} marked complete", id),
            Message::TaskMarkedIncomplete(id) => format!("Task #{} marked incomplete", id),
            Message::TaskTagsReplaced(id, count) => format!("Task #{} now has {} tag(s)", id, count),
            Message::TaskCategoryChanged(id) => format!("Category of task #{} updated", id),
            Message::TaskDeleted(id) => format!("Task #{} and its sessions deleted", id),
            Message::TasksNotFound => "No tasks found".to_string(),

            // === CATEGORY MESSAGES ===
            Message::CategoryCreated(id, name) => format!("Category #{} '{}' created", id, name),
            Message::CategoryDeleted(id) => format!("Category #{} deleted", id),
            Message::CategoryNotFound(name) => format!("Category '{}' not found", name),
            Message::CategoriesNotFound => "No categories found".to_string(),

            // === SESSION MESSAGES ===
            Message::SessionStarted(id, task) => format!("Session #{} started for '{}'", id, task),
            Message::SessionPaused(elapsed) => format!("Paused at {}", elapsed),
            Message::SessionResumed => "Timer resumed".to_string(),
            Message::SessionStopped(elapsed) => format!("Session stopped after {}", elapsed),
            Message::SessionActive(id) => format!("Session #{} is open", id),
            Message::SessionsNotFound => "No sessions found".to_string(),
            Message::TimerIdle => "No session is running".to_string(),

            // === SUMMARY MESSAGES ===
            Message::SummaryByTaskHeader => "Time by task".to_string(),
            Message::SummaryByCategoryHeader => "Time by category".to_string(),
            Message::SummaryEmpty => "No finished sessions yet".to_string(),
        };
        write!(f, "{}", text)
    }
}
