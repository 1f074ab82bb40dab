//! Error types for warehouse access.

/// Errors from opening the warehouse or executing a statement.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("failed to connect to warehouse: {0}")]
    Connect(String),
    #[error("query failed: {message} (statement: {statement})")]
    QueryFailed { statement: String, message: String },
}

impl WarehouseError {
    pub fn query_failed(statement: &str, message: impl ToString) -> Self {
        WarehouseError::QueryFailed {
            statement: statement.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_failed_display_carries_statement() {
        let err = WarehouseError::query_failed("SELECT * FROM nope", "no such table: nope");
        assert_eq!(
            err.to_string(),
            "query failed: no such table: nope (statement: SELECT * FROM nope)"
        );
    }

    #[test]
    fn test_connect_display() {
        let err = WarehouseError::Connect("incorrect username or password".to_string());
        assert_eq!(
            err.to_string(),
            "failed to connect to warehouse: incorrect username or password"
        );
    }
}
