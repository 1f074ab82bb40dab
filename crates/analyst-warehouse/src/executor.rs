use analyst_core::Table;
use async_trait::async_trait;

use crate::error::WarehouseError;

/// Runs one SQL statement on an established connection.
///
/// Every call is an independent autocommit query. No row limit is applied;
/// callers decide how to present large results.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn run(&self, statement: &str) -> Result<Table, WarehouseError>;
}

/// Trim surrounding whitespace and a trailing semicolon.
pub fn normalize_statement(statement: &str) -> &str {
    let trimmed = statement.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end()
}
