//! Atomic multi-statement writes.
//!
//! [`TransactionCoordinator::run_in_transaction`] opens an `IMMEDIATE`
//! transaction inside a single retry attempt and hands the work a
//! [`UnitOfWork`] whose row handles all run on that transaction. The work
//! either commits as a whole or is rolled back and its error re-raised. Lock
//! contention on `BEGIN` or `COMMIT` retries the whole unit, so `work` may run
//! more than once and must only touch the store.

use super::categories::CategoryRows;
use super::retry::RetryExecutor;
use super::sessions::SessionRows;
use super::tasks::TaskRows;
use crate::libs::error::{Error, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct TransactionCoordinator {
    executor: RetryExecutor,
}

impl TransactionCoordinator {
    pub fn new(executor: RetryExecutor) -> Self {
        Self { executor }
    }

    pub async fn run_in_transaction<T, F>(&self, label: &str, mut work: F) -> Result<T>
    where
        F: FnMut(&UnitOfWork<'_>) -> Result<T> + Send,
        T: Send,
    {
        self.executor.run(label, |conn| UnitOfWork::run(conn, &mut work)).await
    }
}

/// Transaction-scoped access to the repositories' row operations.
pub struct UnitOfWork<'c> {
    tx: Transaction<'c>,
}

impl<'c> UnitOfWork<'c> {
    /// Starts a write transaction. Fails if `conn` is already inside one.
    pub fn begin(conn: &'c mut Connection) -> Result<Self> {
        if !conn.is_autocommit() {
            return Err(Error::TransactionAlreadyActive);
        }
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!("transaction started");
        Ok(Self { tx })
    }

    /// Runs `work` in a fresh transaction on `conn`, committing on success.
    pub fn run<T>(conn: &'c mut Connection, work: impl FnOnce(&UnitOfWork<'c>) -> Result<T>) -> Result<T> {
        let uow = Self::begin(conn)?;
        match work(&uow) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(err) => {
                uow.rollback();
                Err(err)
            }
        }
    }

    pub fn tasks(&self) -> TaskRows<'_> {
        TaskRows::new(&self.tx)
    }

    pub fn categories(&self) -> CategoryRows<'_> {
        CategoryRows::new(&self.tx)
    }

    pub fn sessions(&self) -> SessionRows<'_> {
        SessionRows::new(&self.tx)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        debug!("transaction committed");
        Ok(())
    }

    /// Rolls back; a failed rollback is logged since the original error is
    /// the one the caller needs.
    pub fn rollback(self) {
        match self.tx.rollback() {
            Ok(()) => debug!("transaction rolled back"),
            Err(err) => warn!(error = %err, "transaction rollback failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::SchemaInitializer;

    fn connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        SchemaInitializer::initialize(&mut conn).unwrap();
        conn
    }

    fn category_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM Categories", [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn commits_on_success() {
        let mut conn = connection();
        UnitOfWork::run(&mut conn, |uow| {
            uow.categories().insert("Work", "#FF5733")?;
            uow.categories().insert("Home", "#FFFFFF")
        })
        .unwrap();
        assert_eq!(category_count(&conn), 2);
    }

    #[test]
    fn rolls_back_when_work_fails() {
        let mut conn = connection();
        let result: Result<()> = UnitOfWork::run(&mut conn, |uow| {
            uow.categories().insert("Work", "#FF5733")?;
            Err(Error::NoActiveTask)
        });
        assert!(matches!(result, Err(Error::NoActiveTask)));
        assert_eq!(category_count(&conn), 0);
    }

    #[test]
    fn nested_transaction_is_rejected() {
        let mut conn = connection();
        conn.execute_batch("BEGIN").unwrap();
        let rejected = matches!(UnitOfWork::begin(&mut conn), Err(Error::TransactionAlreadyActive));
        conn.execute_batch("ROLLBACK").unwrap();
        assert!(rejected);
    }
}
