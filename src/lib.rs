//! # Pricis - local time tracking core
//!
//! Tracks time spent on tasks, grouped by category and tags, in a single
//! embedded SQLite database that survives lock contention, lost handles and
//! corrupted files.
//!
//! ## Features
//!
//! - **Resilient storage**: one guarded connection, bounded retries, automatic
//!   recovery from unreadable files
//! - **Atomic writes**: multi-table changes run as one transaction
//! - **Session timer**: a single running session with pause-aware elapsed time
//! - **Summaries**: tracked time per task and per category
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pricis::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod commands;
pub mod db;
pub mod libs;
pub mod timer;
