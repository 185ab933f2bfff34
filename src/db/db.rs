use super::categories::Categories;
use super::connection::ConnectionGuard;
use super::recovery::{self, FileStatus, RecoveryReason};
use super::retry::RetryExecutor;
use super::schema::SchemaInitializer;
use super::sessions::Sessions;
use super::tasks::Tasks;
use super::unit_of_work::TransactionCoordinator;
use crate::libs::clock::Clock;
use crate::libs::config::Config;
use crate::libs::data_storage::DataStorage;
use crate::libs::error::{Error, Result};
use crate::timer::SessionStateMachine;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What [`Db::open`] found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// An existing database was opened.
    Opened,
    /// No database existed; an empty one was created.
    Created,
    /// The files were unusable and were replaced by an empty database.
    Recreated(RecoveryReason),
}

impl OpenOutcome {
    /// `true` when previous history may have been lost.
    pub fn is_recreated(&self) -> bool {
        matches!(self, OpenOutcome::Recreated(_))
    }

    /// The outcome as the error callers show to the user, if any.
    pub fn as_error(&self) -> Option<Error> {
        self.is_recreated().then_some(Error::DatabaseRecreated)
    }
}

/// What [`Db::repair`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The database passed the check and was left alone.
    Healthy,
    /// The files were deleted and an empty schema created in their place.
    Rebuilt(RecoveryReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub path: PathBuf,
    pub file_size: u64,
    pub tables: Vec<String>,
    pub wal_present: bool,
    pub shm_present: bool,
    pub schema_version: i32,
    pub integrity: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.integrity == "ok" && ["Categories", "Tasks", "TaskTags", "Sessions"].iter().all(|table| self.tables.iter().any(|t| t == table))
    }
}

/// Entry point to the store: owns the connection guard and hands out
/// repositories and the session timer that share it.
pub struct Db {
    guard: Arc<ConnectionGuard>,
    executor: RetryExecutor,
}

impl Db {
    /// Confirms the storage location is writable, discards unusable files,
    /// and opens the database.
    pub async fn open(config: &Config) -> Result<(Db, OpenOutcome)> {
        config.storage().ensure_writable()?;

        let path = config.database_path();
        let outcome = match recovery::prepare(&path)? {
            FileStatus::Healthy => OpenOutcome::Opened,
            FileStatus::Missing => OpenOutcome::Created,
            FileStatus::Damaged(reason) => OpenOutcome::Recreated(reason),
        };

        let settings = &config.database;
        let guard = Arc::new(ConnectionGuard::open(&path, settings.connection_options())?);
        let executor = RetryExecutor::new(guard.clone(), settings.retry_policy()).seed_on_rebuild(settings.seed_default_categories);
        let db = Db { guard, executor };

        if settings.seed_default_categories && outcome != OpenOutcome::Opened {
            db.executor
                .run("schema.seed", |conn| SchemaInitializer::seed_default_categories(conn))
                .await?;
        }

        match outcome {
            OpenOutcome::Recreated(reason) => warn!(path = %path.display(), %reason, "database recreated"),
            _ => info!(path = %path.display(), ?outcome, "database ready"),
        }
        Ok((db, outcome))
    }

    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    pub fn tasks(&self) -> Tasks {
        Tasks::new(self.executor.clone())
    }

    pub fn categories(&self) -> Categories {
        Categories::new(self.executor.clone())
    }

    pub fn sessions(&self) -> Sessions {
        Sessions::new(self.executor.clone())
    }

    pub fn transactions(&self) -> TransactionCoordinator {
        TransactionCoordinator::new(self.executor.clone())
    }

    /// A session timer bound to this database.
    pub fn timer(&self, clock: Arc<dyn Clock>) -> SessionStateMachine {
        SessionStateMachine::new(self.sessions(), self.tasks(), clock)
    }

    /// Compacts the file and refreshes planner statistics.
    pub async fn optimize(&self) -> Result<()> {
        self.executor
            .run_with_backoff("db.optimize", |conn| {
                conn.execute_batch("VACUUM; ANALYZE;")?;
                Ok(())
            })
            .await?;
        info!("database optimized");
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let (tables, schema_version, integrity) = self
            .executor
            .run("db.health", |conn| {
                let tables = {
                    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")?;
                    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                };
                let version = SchemaInitializer::version(conn)?;
                let integrity: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
                Ok((tables, version, integrity))
            })
            .await?;

        let path = self.path().to_path_buf();
        let [wal, shm] = recovery::sidecar_paths(&path);
        Ok(HealthReport {
            file_size: fs::metadata(&path)?.len(),
            wal_present: wal.exists(),
            shm_present: shm.exists(),
            path,
            tables,
            schema_version,
            integrity,
        })
    }

    /// Checks that the data directory is still writable, then inspects the
    /// open database. A damaged database is rebuilt, and `force` rebuilds a
    /// healthy one too. Default categories are inserted after a rebuild when
    /// `seed_defaults` is set.
    pub async fn repair(&self, force: bool, seed_defaults: bool) -> Result<RepairOutcome> {
        let directory = match self.path().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        DataStorage::at(directory).ensure_writable()?;

        let reason = if force {
            RecoveryReason::Requested
        } else {
            let check = self
                .executor
                .run("db.check", |conn| {
                    let integrity: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
                    Ok(integrity == "ok" && SchemaInitializer::has_schema(conn)?)
                })
                .await;
            match check {
                Ok(true) => return Ok(RepairOutcome::Healthy),
                Ok(false) | Err(Error::DatabaseRecreated) => RecoveryReason::Unreadable,
                Err(err) => return Err(err),
            }
        };

        warn!(path = %self.path().display(), %reason, "rebuilding database");
        self.guard.rebuild(seed_defaults).await?;
        Ok(RepairOutcome::Rebuilt(reason))
    }

    /// Checkpoints and closes the connection. Repositories and timers
    /// created from this database fail afterwards.
    pub async fn close(&self) -> Result<()> {
        self.guard.close().await
    }
}
