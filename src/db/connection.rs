//! Ownership of the single SQLite handle.
//!
//! `ConnectionGuard` is the only place a connection to the database file is
//! opened. Every access goes through [`ConnectionGuard::lock`], an async FIFO
//! mutex, so interactive commands and timer ticks queue in submission order
//! and never run two statements on the handle at once.
//!
//! A handle that the retry executor reports as lost is dropped and reopened
//! on the next lease. An explicitly closed guard stays closed.

use super::recovery;
use super::schema::SchemaInitializer;
use crate::libs::error::{Error, Result};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Value for `PRAGMA synchronous`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Synchronous {
    Off,
    #[default]
    Normal,
    Full,
}

impl Synchronous {
    fn pragma_value(self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionOptions {
    pub synchronous: Synchronous,
    /// SQLite busy handler timeout; zero disables it.
    pub busy_timeout: Duration,
}

struct Slot {
    conn: Option<Connection>,
    closed: bool,
}

pub struct ConnectionGuard {
    path: PathBuf,
    options: ConnectionOptions,
    slot: Mutex<Slot>,
}

impl ConnectionGuard {
    /// Opens (creating if absent) the database at `path` and ensures the
    /// schema exists.
    pub fn open(path: impl Into<PathBuf>, options: ConnectionOptions) -> Result<Self> {
        let path = path.into();
        check_parent_writable(&path)?;

        let mut conn = connect(&path, options).map_err(|err| match err {
            Error::Corruption(_) => err,
            other => Error::StorageUnavailable {
                path: path.clone(),
                source: io::Error::other(other),
            },
        })?;
        SchemaInitializer::initialize(&mut conn)?;
        info!(path = %path.display(), "database opened");

        Ok(Self {
            path,
            options,
            slot: Mutex::new(Slot {
                conn: Some(conn),
                closed: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for exclusive use of the handle.
    pub(crate) async fn lock(&self) -> ConnectionLease<'_> {
        ConnectionLease {
            slot: self.slot.lock().await,
            guard: self,
        }
    }

    /// Runs `f` against the current connection, reopening it first if it
    /// was invalidated.
    pub async fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut lease = self.lock().await;
        f(lease.connection()?)
    }

    /// Checkpoints the write-ahead log and releases the handle. Calling it
    /// again is a no-op.
    pub async fn close(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        slot.closed = true;

        let Some(conn) = slot.conn.take() else {
            return Ok(());
        };
        if let Err(err) = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(())) {
            warn!(error = %err, "WAL checkpoint before close failed");
        }
        conn.close().map_err(|(_, err)| Error::from(err))?;

        info!(path = %self.path.display(), "database closed");
        Ok(())
    }

    /// Drops the handle, deletes the database and its sidecar files, and
    /// creates a fresh schema in their place.
    pub(crate) async fn rebuild(&self, seed_defaults: bool) -> Result<()> {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            return Err(Error::DatabaseClosed);
        }

        drop(slot.conn.take());
        recovery::remove_database_files(&self.path)?;

        let mut conn = connect(&self.path, self.options)?;
        SchemaInitializer::initialize(&mut conn)?;
        if seed_defaults {
            SchemaInitializer::seed_default_categories(&conn)?;
        }
        slot.conn = Some(conn);

        info!(path = %self.path.display(), "database recreated");
        Ok(())
    }
}

/// Exclusive access to the guarded handle for one executor attempt.
pub(crate) struct ConnectionLease<'a> {
    slot: MutexGuard<'a, Slot>,
    guard: &'a ConnectionGuard,
}

impl ConnectionLease<'_> {
    /// The open connection, reopened once if it had been invalidated.
    pub(crate) fn connection(&mut self) -> Result<&mut Connection> {
        let slot = &mut *self.slot;
        if slot.closed {
            return Err(Error::DatabaseClosed);
        }

        let conn = match slot.conn.take() {
            Some(conn) => conn,
            None => {
                warn!(path = %self.guard.path.display(), "reopening database connection");
                let mut conn = connect(&self.guard.path, self.guard.options).map_err(reopen_failure)?;
                SchemaInitializer::initialize(&mut conn).map_err(reopen_failure)?;
                conn
            }
        };
        Ok(slot.conn.insert(conn))
    }

    /// Marks the handle unusable; the next lease reopens it.
    pub(crate) fn invalidate(&mut self) {
        if self.slot.conn.take().is_some() {
            debug!("database connection invalidated");
        }
    }
}

/// Classifies a failed reopen. Corruption and lock contention keep their
/// kind so the executor can rebuild or wait; anything else means the handle
/// could not be restored.
fn reopen_failure(err: Error) -> Error {
    match err {
        Error::ConstraintViolation(source) | Error::Storage(source) => Error::ConnectionLost(source),
        other => other,
    }
}

/// Opens a connection and applies the pragmas every handle needs.
pub(crate) fn connect(path: &Path, options: ConnectionOptions) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;

    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    if !journal_mode.eq_ignore_ascii_case("wal") {
        warn!(journal_mode = %journal_mode, "write-ahead logging is not available");
    }
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA synchronous = {};
         PRAGMA temp_store = MEMORY;",
        options.synchronous.pragma_value()
    ))?;
    conn.busy_timeout(options.busy_timeout)?;

    Ok(conn)
}

fn check_parent_writable(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let unavailable = |source| Error::StorageUnavailable {
        path: parent.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(parent).map_err(unavailable)?;
    if !metadata.is_dir() || metadata.permissions().readonly() {
        return Err(unavailable(io::Error::new(io::ErrorKind::PermissionDenied, "directory is not writable")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_applies_pragmas_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let guard = ConnectionGuard::open(dir.path().join("test.db"), ConnectionOptions::default()).unwrap();

        let (journal, foreign_keys, has_schema) = guard
            .with_connection(|conn| {
                let journal: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
                let foreign_keys: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
                Ok((journal, foreign_keys, SchemaInitializer::has_schema(conn)?))
            })
            .await
            .unwrap();

        assert_eq!(journal.to_lowercase(), "wal");
        assert_eq!(foreign_keys, 1);
        assert!(has_schema);
    }

    #[tokio::test]
    async fn open_fails_when_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConnectionGuard::open(dir.path().join("missing").join("test.db"), ConnectionOptions::default());
        assert!(matches!(result, Err(Error::StorageUnavailable { .. })));
    }

    #[tokio::test]
    async fn invalidated_handle_is_reopened_on_next_lease() {
        let dir = tempfile::tempdir().unwrap();
        let guard = ConnectionGuard::open(dir.path().join("test.db"), ConnectionOptions::default()).unwrap();

        guard.lock().await.invalidate();

        let one: i64 = guard.with_connection(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?)).await.unwrap();
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let dir = tempfile::tempdir().unwrap();
        let guard = ConnectionGuard::open(dir.path().join("test.db"), ConnectionOptions::default()).unwrap();

        guard.close().await.unwrap();
        guard.close().await.unwrap();

        let result = guard.with_connection(|_| Ok(())).await;
        assert!(matches!(result, Err(Error::DatabaseClosed)));
    }
}
