//! Detection and removal of unusable database files.
//!
//! The primary file and its `-wal`/`-shm` sidecars form one unit: they are
//! inspected together before the first open and always deleted together.

use crate::libs::error::{Error, Result};
use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const WAL_SUFFIX: &str = "-wal";
pub const SHM_SUFFIX: &str = "-shm";

/// Why the database files were discarded at open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryReason {
    /// The primary file could not be read as a database.
    Unreadable,
    /// Sidecar files were present without a primary file.
    OrphanedSidecars,
    /// A reset was asked for explicitly.
    Requested,
}

impl fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryReason::Unreadable => f.write_str("database file was unreadable"),
            RecoveryReason::OrphanedSidecars => f.write_str("journal files were left without a database file"),
            RecoveryReason::Requested => f.write_str("a reset was requested"),
        }
    }
}

/// State of the database files before they are opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Missing,
    Healthy,
    Damaged(RecoveryReason),
}

/// Paths of the write-ahead log and shared-memory files next to `path`.
pub fn sidecar_paths(path: &Path) -> [PathBuf; 2] {
    [with_suffix(path, WAL_SUFFIX), with_suffix(path, SHM_SUFFIX)]
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Checks whether the files at `path` can be opened as they are.
pub fn inspect(path: &Path) -> Result<FileStatus> {
    if !path.exists() {
        let orphaned = sidecar_paths(path).iter().any(|sidecar| sidecar.exists());
        return Ok(if orphaned {
            FileStatus::Damaged(RecoveryReason::OrphanedSidecars)
        } else {
            FileStatus::Missing
        });
    }

    match probe(path) {
        Ok(()) => Ok(FileStatus::Healthy),
        Err(err) if is_damage(&err) => {
            debug!(path = %path.display(), error = %err, "database inspection failed");
            Ok(FileStatus::Damaged(RecoveryReason::Unreadable))
        }
        Err(err) => Err(err.into()),
    }
}

/// Reads the schema table and runs a quick integrity check.
fn probe(path: &Path) -> rusqlite::Result<()> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
    conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))?;
    let verdict: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
    if verdict != "ok" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CORRUPT),
            Some(verdict),
        ));
    }
    Ok(())
}

fn is_damage(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
    )
}

/// Deletes the primary file and both sidecars; missing files are skipped.
pub fn remove_database_files(path: &Path) -> Result<()> {
    let [wal, shm] = sidecar_paths(path);
    for file in [path.to_path_buf(), wal, shm] {
        match fs::remove_file(&file) {
            Ok(()) => info!(file = %file.display(), "removed database file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                error!(file = %file.display(), error = %err, "failed to remove database file");
                return Err(Error::StorageUnavailable { path: file, source: err });
            }
        }
    }
    Ok(())
}

/// Inspects the files and discards them if they cannot be used. Returns
/// the status found before any cleanup.
pub fn prepare(path: &Path) -> Result<FileStatus> {
    let status = inspect(path)?;
    if let FileStatus::Damaged(reason) = status {
        error!(path = %path.display(), %reason, "discarding damaged database");
        remove_database_files(path)?;
    }
    Ok(status)
}
