//! Typed error taxonomy for the persistence layer and the session timer.
//!
//! Every storage failure is classified once, when it leaves `rusqlite`, so
//! that the retry loop and the callers can branch on [`ErrorKind`] instead of
//! inspecting error messages.
//!
//! ## Classification
//!
//! | SQLite primary code          | Variant               | Retried |
//! |------------------------------|-----------------------|---------|
//! | BUSY, LOCKED, READONLY, CORRUPT | `Transient`        | yes     |
//! | CANTOPEN, READONLY_DBMOVED   | `ConnectionLost`      | yes, after reopen |
//! | NOTADB                       | `Corruption`          | no, triggers recovery |
//! | CONSTRAINT                   | `ConstraintViolation` | no      |
//! | anything else                | `Storage`             | no      |

use rusqlite::ErrorCode;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`], used for retry and UI decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lock contention; resolved by waiting and retrying.
    Transient,
    /// The handle is unusable; resolved by reopening it.
    ConnectionLost,
    /// The database file is not readable as a database.
    Corruption,
    /// A uniqueness or foreign-key rule rejected the write.
    Constraint,
    /// Input rejected before touching the store.
    Validation,
    /// The referenced row does not exist.
    NotFound,
    /// A timer or transaction rule was violated.
    Domain,
    /// The storage location cannot be written.
    Permission,
    /// Any other storage or I/O failure.
    Storage,
}

impl ErrorKind {
    /// Whether the retry loop may attempt the operation again.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient | ErrorKind::ConnectionLost)
    }
}

/// Timer action names used in [`Error::InvalidTransition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerAction::Start => "start",
            TimerAction::Pause => "pause",
            TimerAction::Resume => "resume",
            TimerAction::Stop => "stop",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage is busy, try again: {0}")]
    Transient(#[source] rusqlite::Error),

    #[error("database connection lost: {0}")]
    ConnectionLost(#[source] rusqlite::Error),

    #[error("database file is corrupted: {0}")]
    Corruption(#[source] rusqlite::Error),

    #[error("database has been closed")]
    DatabaseClosed,

    #[error("the database was recreated after corruption; previous history may be lost")]
    DatabaseRecreated,

    #[error("constraint violated: {0}")]
    ConstraintViolation(#[source] rusqlite::Error),

    #[error("{entity} named '{name}' already exists")]
    DuplicateName { entity: &'static str, name: String },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("cannot {action} while the timer is {from}")]
    InvalidTransition { from: String, action: TimerAction },

    #[error("a session is already active")]
    SessionAlreadyActive,

    #[error("no task selected for the session")]
    NoActiveTask,

    #[error("a transaction is already active on this connection")]
    TransactionAlreadyActive,

    #[error("directory {path} is not writable: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage at {path} is unavailable: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transient(_) => ErrorKind::Transient,
            Error::ConnectionLost(_) => ErrorKind::ConnectionLost,
            Error::Corruption(_) | Error::DatabaseRecreated => ErrorKind::Corruption,
            Error::ConstraintViolation(_) | Error::DuplicateName { .. } => ErrorKind::Constraint,
            Error::InvalidName { .. } | Error::InvalidColor(_) | Error::Config(_) => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidTransition { .. } | Error::SessionAlreadyActive | Error::NoActiveTask | Error::TransactionAlreadyActive => ErrorKind::Domain,
            Error::PermissionDenied { .. } => ErrorKind::Permission,
            Error::DatabaseClosed | Error::StorageUnavailable { .. } | Error::Storage(_) | Error::Io(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Error::NotFound { entity, id }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        let (code, extended_code) = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => (failure.code, failure.extended_code),
            _ => return Error::Storage(err),
        };
        if extended_code == rusqlite::ffi::SQLITE_READONLY_DBMOVED {
            return Error::ConnectionLost(err);
        }

        match code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::ReadOnly | ErrorCode::DatabaseCorrupt => Error::Transient(err),
            ErrorCode::CannotOpen => Error::ConnectionLost(err),
            ErrorCode::NotADatabase => Error::Corruption(err),
            ErrorCode::ConstraintViolation => Error::ConstraintViolation(err),
            _ => Error::Storage(err),
        }
    }
}

/// Returns `true` when a raw SQLite error is a uniqueness violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
