//! Category repository.

use super::retry::RetryExecutor;
use super::unit_of_work::TransactionCoordinator;
use crate::libs::category::{validate_category_name, validate_color, Category};
use crate::libs::error::{is_unique_violation, Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

const INSERT_CATEGORY: &str = "INSERT INTO Categories (Name, Color) VALUES (?1, ?2)";
const SELECT_CATEGORIES: &str = "SELECT Id, Name, COALESCE(Color, '#FFFFFF') FROM Categories";
const DETACH_TASKS: &str = "UPDATE Tasks SET CategoryId = NULL WHERE CategoryId = ?1";
const DELETE_CATEGORY: &str = "DELETE FROM Categories WHERE Id = ?1";

pub struct CategoryRows<'c> {
    conn: &'c Connection,
}

impl<'c> CategoryRows<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, name: &str, color: &str) -> Result<i64> {
        match self.conn.execute(INSERT_CATEGORY, params![name, color]) {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if is_unique_violation(&err) => Err(Error::DuplicateName {
                entity: "category",
                name: name.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub fn list(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_CATEGORIES} ORDER BY Name"))?;
        let rows = stmt.query_map([], map_category)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, category_id: i64) -> Result<Option<Category>> {
        let sql = format!("{SELECT_CATEGORIES} WHERE Id = ?1");
        Ok(self.conn.query_row(&sql, [category_id], map_category).optional()?)
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        let sql = format!("{SELECT_CATEGORIES} WHERE Name = ?1");
        Ok(self.conn.query_row(&sql, [name.trim()], map_category).optional()?)
    }

    /// Clears the category from its tasks, then deletes it. Must run inside
    /// a transaction to be atomic.
    pub fn delete(&self, category_id: i64) -> Result<usize> {
        let detached = self.conn.execute(DETACH_TASKS, [category_id])?;
        let deleted = self.conn.execute(DELETE_CATEGORY, [category_id])?;
        if deleted == 0 {
            return Err(Error::not_found("category", category_id));
        }
        Ok(detached)
    }
}

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
    })
}

#[derive(Clone)]
pub struct Categories {
    executor: RetryExecutor,
    transactions: TransactionCoordinator,
}

impl Categories {
    pub fn new(executor: RetryExecutor) -> Self {
        Self {
            transactions: TransactionCoordinator::new(executor.clone()),
            executor,
        }
    }

    /// Creates a category; `color` defaults to white.
    pub async fn create(&self, name: &str, color: Option<&str>) -> Result<i64> {
        let name = validate_category_name(name)?;
        let color = validate_color(color)?;
        let id = self
            .executor
            .run("category.create", |conn| CategoryRows::new(conn).insert(&name, &color))
            .await?;
        info!(category_id = id, name = %name, "category created");
        Ok(id)
    }

    /// All categories ordered by name.
    pub async fn list(&self) -> Result<Vec<Category>> {
        self.executor.run("category.list", |conn| CategoryRows::new(conn).list()).await
    }

    pub async fn get(&self, category_id: i64) -> Result<Category> {
        self.executor
            .run("category.get", |conn| CategoryRows::new(conn).get(category_id))
            .await?
            .ok_or_else(|| Error::not_found("category", category_id))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.executor.run("category.get_by_name", |conn| CategoryRows::new(conn).get_by_name(name)).await
    }

    /// Deletes the category; tasks that used it become uncategorized.
    pub async fn delete(&self, category_id: i64) -> Result<()> {
        let detached = self
            .transactions
            .run_in_transaction("category.delete", |uow| uow.categories().delete(category_id))
            .await?;
        info!(category_id, detached_tasks = detached, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::SchemaInitializer;
    use crate::db::tasks::TaskRows;

    fn connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        SchemaInitializer::initialize(&mut conn).unwrap();
        conn
    }

    #[test]
    fn list_is_ordered_by_name() {
        let conn = connection();
        let rows = CategoryRows::new(&conn);
        rows.insert("Work", "#FF5733").unwrap();
        rows.insert("Personal", "#33FF57").unwrap();

        let names: Vec<_> = rows.list().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Personal", "Work"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let conn = connection();
        let rows = CategoryRows::new(&conn);
        rows.insert("Work", "#FFFFFF").unwrap();
        assert!(matches!(rows.insert("Work", "#000000"), Err(Error::DuplicateName { entity: "category", .. })));
    }

    #[test]
    fn delete_detaches_tasks() {
        let conn = connection();
        let category = CategoryRows::new(&conn).insert("Work", "#FFFFFF").unwrap();
        let tasks = TaskRows::new(&conn);
        let task = tasks.insert("Write report", Some(category)).unwrap();

        assert_eq!(CategoryRows::new(&conn).delete(category).unwrap(), 1);

        let task = tasks.get(task).unwrap().unwrap();
        assert_eq!(task.category_id, None);
        assert!(CategoryRows::new(&conn).get_by_name("Work").unwrap().is_none());
    }
}
