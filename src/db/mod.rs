//! Persistence layer for the pricis core.
//!
//! A single SQLite file holds categories, tasks, their tags and the timed
//! sessions. Everything here is built around one connection:
//!
//! - [`connection::ConnectionGuard`] owns the handle and serializes access
//!   with a FIFO async lock. It reopens a lost handle on demand.
//! - [`retry::RetryExecutor`] runs each operation under that lock, retrying
//!   lock contention and lost connections a bounded number of times and
//!   rebuilding the file once if it turns out to be corrupt.
//! - [`unit_of_work::TransactionCoordinator`] groups multi-statement writes
//!   into one `IMMEDIATE` transaction.
//! - [`tasks`], [`categories`] and [`sessions`] are the repositories. Each
//!   has a synchronous row handle (`TaskRows`, ...) that runs on a connection
//!   or a transaction, and an async repository that routes through the
//!   executor.
//! - [`db::Db`] wires it all together and is what callers open.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pricis::db::db::Db;
//! use pricis::libs::config::Config;
//!
//! # async fn run() -> pricis::libs::error::Result<()> {
//! let (db, outcome) = Db::open(&Config::read()?).await?;
//! if outcome.is_recreated() {
//!     eprintln!("database was reset");
//! }
//!
//! let work = db.categories().create("Work", Some("#FF5733")).await?;
//! let task = db.tasks().create("Write report", Some(work)).await?;
//! db.tasks().replace_tags(task, ["q3", "urgent"]).await?;
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Schema
//!
//! Tables keep their PascalCase names (`Categories`, `Tasks`, `TaskTags`,
//! `Sessions`) so databases written by earlier releases open unchanged.
//! Child rows are removed explicitly by the repositories before their parent;
//! the declarative `ON DELETE` clauses are kept only as a backstop.

pub mod categories;
pub mod connection;
pub mod db;
pub mod recovery;
pub mod retry;
pub mod schema;
pub mod sessions;
pub mod tasks;
pub mod unit_of_work;
