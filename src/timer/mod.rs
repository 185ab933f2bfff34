//! Session timer: one active session at a time, with pause-aware elapsed
//! time.
//!
//! ```rust,no_run
//! use pricis::db::db::Db;
//! use pricis::libs::{clock::SystemClock, config::Config};
//! use std::sync::Arc;
//!
//! # async fn run() -> pricis::libs::error::Result<()> {
//! let (db, _) = Db::open(&Config::read()?).await?;
//! let task_id = db.tasks().create_or_get("Write report", None).await?;
//!
//! let timer = db.timer(Arc::new(SystemClock));
//! timer.start(Some(task_id)).await?;
//! timer.pause().await?;
//! timer.resume().await?;
//! let stopped = timer.stop(Some("first draft")).await?;
//! println!("{}s", stopped.elapsed.num_seconds());
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod state;

pub use controller::{SessionStateMachine, StoppedSession};
pub use state::{TimerSnapshot, TimerState};
