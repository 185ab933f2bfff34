//! Idempotent creation of the fixed schema.
//!
//! The schema is small and fixed, so instead of a migration history the
//! initializer runs an ordered list of `CREATE ... IF NOT EXISTS` steps in a
//! single transaction and stamps `PRAGMA user_version`. Running it against an
//! up-to-date database is a no-op.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pricis::db::schema::SchemaInitializer;
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open("timetracking.db")?;
//! SchemaInitializer::initialize(&mut conn)?;
//! # Ok::<(), pricis::libs::error::Error>(())
//! ```

use crate::libs::category::DEFAULT_CATEGORIES;
use crate::libs::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

/// Version stamped into `PRAGMA user_version` once the schema exists.
pub const SCHEMA_VERSION: i32 = 1;

/// Ordered schema steps; every statement must be idempotent.
const SCHEMA_STEPS: &[(&str, &str)] = &[
    (
        "categories",
        "CREATE TABLE IF NOT EXISTS Categories (
            Id INTEGER PRIMARY KEY AUTOINCREMENT,
            Name TEXT NOT NULL UNIQUE,
            Color TEXT DEFAULT '#FFFFFF'
        )",
    ),
    (
        "tasks",
        "CREATE TABLE IF NOT EXISTS Tasks (
            Id INTEGER PRIMARY KEY AUTOINCREMENT,
            Name TEXT NOT NULL UNIQUE,
            IsComplete INTEGER DEFAULT 0,
            CategoryId INTEGER,
            CreatedAt TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY(CategoryId) REFERENCES Categories(Id) ON DELETE SET NULL
        )",
    ),
    (
        "task_tags",
        "CREATE TABLE IF NOT EXISTS TaskTags (
            TaskId INTEGER NOT NULL,
            Tag TEXT NOT NULL,
            PRIMARY KEY(TaskId, Tag),
            FOREIGN KEY(TaskId) REFERENCES Tasks(Id) ON DELETE CASCADE
        )",
    ),
    (
        "sessions",
        "CREATE TABLE IF NOT EXISTS Sessions (
            Id INTEGER PRIMARY KEY AUTOINCREMENT,
            TaskId INTEGER NOT NULL,
            StartTime TEXT NOT NULL,
            EndTime TEXT,
            Notes TEXT,
            State TEXT DEFAULT 'Stopped',
            FOREIGN KEY(TaskId) REFERENCES Tasks(Id) ON DELETE CASCADE
        )",
    ),
    ("idx_tasks_category", "CREATE INDEX IF NOT EXISTS IX_Tasks_CategoryId ON Tasks(CategoryId)"),
    ("idx_tasks_complete_created", "CREATE INDEX IF NOT EXISTS IX_Tasks_IsComplete_CreatedAt ON Tasks(IsComplete, CreatedAt)"),
    ("idx_sessions_task", "CREATE INDEX IF NOT EXISTS IX_Sessions_TaskId ON Sessions(TaskId)"),
    (
        "idx_sessions_task_span",
        "CREATE INDEX IF NOT EXISTS IX_Sessions_TaskId_StartTime_EndTime ON Sessions(TaskId, StartTime, EndTime)",
    ),
    ("idx_task_tags_task", "CREATE INDEX IF NOT EXISTS IX_TaskTags_TaskId ON TaskTags(TaskId)"),
];

const SELECT_TASKS_TABLE: &str = "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'Tasks'";
const SELECT_SESSION_COLUMNS: &str = "SELECT name FROM pragma_table_info('Sessions')";
const INSERT_DEFAULT_CATEGORY: &str = "INSERT OR IGNORE INTO Categories (Name, Color) VALUES (?1, ?2)";

pub struct SchemaInitializer;

impl SchemaInitializer {
    /// Creates any missing tables and indexes. Returns `true` when the
    /// schema did not exist before the call.
    pub fn initialize(conn: &mut Connection) -> Result<bool> {
        let tx = conn.transaction()?;
        let created = !Self::has_schema(&tx)?;

        for (name, sql) in SCHEMA_STEPS {
            debug!(step = name, "applying schema step");
            tx.execute_batch(sql)?;
        }
        Self::ensure_session_state_column(&tx)?;
        tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;
        tx.commit()?;

        if created {
            info!(version = SCHEMA_VERSION, "database schema created");
        }
        Ok(created)
    }

    /// Whether the `Tasks` table exists.
    pub fn has_schema(conn: &Connection) -> Result<bool> {
        let found: Option<String> = conn.query_row(SELECT_TASKS_TABLE, [], |row| row.get(0)).optional()?;
        Ok(found.is_some())
    }

    pub fn version(conn: &Connection) -> Result<i32> {
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Inserts the default categories, skipping names that already exist.
    pub fn seed_default_categories(conn: &Connection) -> Result<()> {
        for (name, color) in DEFAULT_CATEGORIES {
            conn.execute(INSERT_DEFAULT_CATEGORY, params![name, color])?;
        }
        info!(count = DEFAULT_CATEGORIES.len(), "default categories seeded");
        Ok(())
    }

    /// Older files were created before sessions carried a state; add the
    /// column and mark every existing row stopped or running by `EndTime`.
    fn ensure_session_state_column(tx: &Transaction<'_>) -> Result<()> {
        let columns = {
            let mut stmt = tx.prepare(SELECT_SESSION_COLUMNS)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        let has_state = columns.iter().any(|column| column == "State");

        if !has_state {
            info!("adding State column to legacy Sessions table");
            tx.execute_batch(
                "ALTER TABLE Sessions ADD COLUMN State TEXT DEFAULT 'Stopped';
                 UPDATE Sessions SET State = CASE WHEN EndTime IS NULL THEN 'Running' ELSE 'Stopped' END;",
            )?;
        }
        Ok(())
    }
}
