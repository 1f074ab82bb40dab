//! SQLite-backed executor.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Used when `warehouse.backend = "sqlite"` and as the fixture warehouse in
//! tests.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use tracing::{debug, info};

use analyst_core::Table;

use crate::error::WarehouseError;
use crate::executor::{normalize_statement, SqlExecutor};

pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, WarehouseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WarehouseError::Connect(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| WarehouseError::Connect(format!("Failed to open database: {}", e)))?;

        info!("SQLite warehouse opened at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database.
    pub fn in_memory() -> Result<Self, WarehouseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| WarehouseError::Connect(format!("Failed to open in-memory db: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a batch of statements, e.g. fixture DDL and inserts.
    pub fn execute_batch(&self, sql: &str) -> Result<(), WarehouseError> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| WarehouseError::query_failed(sql, e))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, WarehouseError> {
        self.conn
            .lock()
            .map_err(|e| WarehouseError::Connect(format!("Database lock poisoned: {}", e)))
    }

    fn query(&self, statement: &str) -> Result<Table, WarehouseError> {
        let sql = normalize_statement(statement);
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| WarehouseError::query_failed(statement, e))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(to_json))
                    .collect::<Result<Vec<Value>, _>>()
            })
            .map_err(|e| WarehouseError::query_failed(statement, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WarehouseError::query_failed(statement, e))?;

        debug!(rows = rows.len(), columns = width, "SQLite query complete");
        Ok(Table::new(columns, rows))
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn run(&self, statement: &str) -> Result<Table, WarehouseError> {
        self.query(statement)
    }
}

impl std::fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteExecutor").finish()
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> SqliteExecutor {
        let db = SqliteExecutor::in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE sales (region TEXT, year INTEGER, revenue REAL);
             INSERT INTO sales VALUES ('EMEA', 2023, 120.5);
             INSERT INTO sales VALUES ('APAC', 2023, 98.0);
             INSERT INTO sales VALUES ('AMER', 2022, 210.0);",
        )
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_run_returns_columns_and_rows() {
        let db = fixture();
        let table = db
            .run("SELECT region, revenue FROM sales WHERE year = 2023 ORDER BY region;")
            .await
            .unwrap();
        assert_eq!(table.columns, vec!["region", "revenue"]);
        assert_eq!(
            table.rows,
            vec![
                vec![json!("APAC"), json!(98.0)],
                vec![json!("EMEA"), json!(120.5)],
            ]
        );
    }

    #[tokio::test]
    async fn test_run_empty_result_keeps_columns() {
        let db = fixture();
        let table = db
            .run("SELECT region FROM sales WHERE year = 1999")
            .await
            .unwrap();
        assert_eq!(table.columns, vec!["region"]);
        assert_eq!(table.row_count(), 0);
    }

    #[tokio::test]
    async fn test_run_maps_null_and_integer() {
        let db = SqliteExecutor::in_memory().unwrap();
        let table = db.run("SELECT NULL AS a, 42 AS b").await.unwrap();
        assert_eq!(table.rows, vec![vec![Value::Null, json!(42)]]);
    }

    #[tokio::test]
    async fn test_bad_sql_is_query_failed() {
        let db = fixture();
        let err = db.run("SELECT * FROM missing_table").await.unwrap_err();
        match err {
            WarehouseError::QueryFailed { statement, message } => {
                assert_eq!(statement, "SELECT * FROM missing_table");
                assert!(message.contains("missing_table"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("warehouse.db");
        let db = SqliteExecutor::open(&path).unwrap();
        db.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        assert!(path.exists());
        let table = db.run("SELECT x FROM t").await.unwrap();
        assert_eq!(table.row_count(), 1);
    }
}
