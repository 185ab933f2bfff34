//! Bounded retry of store operations.
//!
//! Each attempt leases the guarded connection, runs the operation, and gives
//! the lease back before any delay, so queued callers make progress while a
//! contended operation waits. Branching is done on [`ErrorKind`] only:
//!
//! - `Transient`: wait `delay`, try again.
//! - `ConnectionLost`: drop the handle, wait, try again on a reopened handle.
//! - `Corruption`: rebuild the database once and report
//!   [`Error::DatabaseRecreated`].
//! - anything else: returned as is.
//!
//! [`ErrorKind`]: crate::libs::error::ErrorKind

use super::connection::ConnectionGuard;
use crate::libs::error::{Error, Result};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Cap for the exponential schedule.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    Fixed,
    Exponential,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    fn delay_for(&self, retry: u32, backoff: Backoff) -> Duration {
        match backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                self.delay.saturating_mul(factor).min(MAX_BACKOFF)
            }
        }
    }
}

#[derive(Clone)]
pub struct RetryExecutor {
    guard: Arc<ConnectionGuard>,
    policy: RetryPolicy,
    seed_on_rebuild: bool,
}

impl RetryExecutor {
    pub fn new(guard: Arc<ConnectionGuard>, policy: RetryPolicy) -> Self {
        Self {
            guard,
            policy,
            seed_on_rebuild: false,
        }
    }

    /// Seed the default categories when corruption forces a rebuild.
    pub fn seed_on_rebuild(mut self, seed: bool) -> Self {
        self.seed_on_rebuild = seed;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub(crate) fn guard(&self) -> &Arc<ConnectionGuard> {
        &self.guard
    }

    /// Runs `op` with the fixed delay between attempts.
    pub async fn run<T, F>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnMut(&mut Connection) -> Result<T> + Send,
        T: Send,
    {
        self.execute(label, Backoff::Fixed, op).await
    }

    /// Runs `op`, doubling the delay after every failed attempt. Used for
    /// long maintenance statements that compete with regular traffic.
    pub async fn run_with_backoff<T, F>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnMut(&mut Connection) -> Result<T> + Send,
        T: Send,
    {
        self.execute(label, Backoff::Exponential, op).await
    }

    async fn execute<T, F>(&self, label: &str, backoff: Backoff, mut op: F) -> Result<T>
    where
        F: FnMut(&mut Connection) -> Result<T> + Send,
        T: Send,
    {
        let mut retries = 0;

        loop {
            let outcome = {
                let mut lease = self.guard.lock().await;
                let outcome = lease.connection().and_then(&mut op);
                if matches!(outcome, Err(Error::ConnectionLost(_))) {
                    lease.invalidate();
                }
                outcome
            };

            let err = match outcome {
                Ok(value) => {
                    if retries > 0 {
                        debug!(operation = label, retries, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if err.kind().is_retryable() && retries < self.policy.max_retries {
                retries += 1;
                let delay = self.policy.delay_for(retries, backoff);
                warn!(
                    operation = label,
                    attempt = retries,
                    max_retries = self.policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying database operation"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if let Error::Corruption(source) = &err {
                error!(operation = label, error = %source, "database corruption detected, rebuilding");
                self.guard.rebuild(self.seed_on_rebuild).await?;
                return Err(Error::DatabaseRecreated);
            }

            if err.kind().is_retryable() {
                warn!(operation = label, retries, error = %err, "retries exhausted");
            }
            return Err(err);
        }
    }
}
