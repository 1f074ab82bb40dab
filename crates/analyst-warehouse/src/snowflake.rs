//! Snowflake-backed executor.
//!
//! Opens one session with password authentication at startup and reuses it
//! for every statement. Values arrive as strings from the connector; columns
//! Snowflake reports as `fixed` or `real` are converted to JSON numbers so
//! charts can plot them.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use snowflake_connector_rs::{
    SnowflakeAuthMethod, SnowflakeClient, SnowflakeClientConfig, SnowflakeRow, SnowflakeSession,
};
use tracing::{debug, info};

use analyst_core::config::SnowflakeConfig;
use analyst_core::{Credentials, Table};

use crate::error::WarehouseError;
use crate::executor::{normalize_statement, SqlExecutor};

pub struct SnowflakeExecutor {
    session: SnowflakeSession,
}

impl SnowflakeExecutor {
    /// Log in with the environment credentials and open a session on the
    /// configured warehouse, role, database and schema.
    pub async fn connect(
        credentials: &Credentials,
        config: &SnowflakeConfig,
    ) -> Result<Self, WarehouseError> {
        let client = SnowflakeClient::new(
            &credentials.user,
            SnowflakeAuthMethod::Password(credentials.password.clone()),
            SnowflakeClientConfig {
                account: credentials.account.clone(),
                role: Some(config.role.clone()),
                warehouse: Some(config.warehouse.clone()),
                database: Some(config.database.clone()),
                schema: Some(config.schema.clone()),
                timeout: Some(Duration::from_secs(config.query_timeout_secs)),
            },
        )
        .map_err(|e| WarehouseError::Connect(e.to_string()))?;

        let session = client
            .create_session()
            .await
            .map_err(|e| WarehouseError::Connect(e.to_string()))?;

        info!(
            account = %credentials.account,
            warehouse = %config.warehouse,
            role = %config.role,
            "Snowflake session established"
        );

        Ok(Self { session })
    }
}

#[async_trait]
impl SqlExecutor for SnowflakeExecutor {
    async fn run(&self, statement: &str) -> Result<Table, WarehouseError> {
        let sql = normalize_statement(statement);
        debug!(statement = %sql, "Executing generated SQL");

        let rows = self
            .session
            .query(sql)
            .await
            .map_err(|e| WarehouseError::query_failed(statement, e))?;

        Ok(rows_to_table(&rows))
    }
}

impl std::fmt::Debug for SnowflakeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeExecutor").finish()
    }
}

/// Column name plus whether the column holds numbers.
fn column_layout(row: &SnowflakeRow) -> Vec<(String, bool)> {
    row.column_types()
        .into_iter()
        .map(|col| {
            let numeric = matches!(col.column_type().snowflake_type(), "fixed" | "real");
            (col.name().to_string(), numeric)
        })
        .collect()
}

fn rows_to_table(rows: &[SnowflakeRow]) -> Table {
    // The connector only exposes column metadata per row.
    let layout = rows.first().map(column_layout).unwrap_or_default();

    let data = rows
        .iter()
        .map(|row| {
            layout
                .iter()
                .map(|(name, numeric)| match row.get::<String>(name) {
                    Ok(raw) if *numeric => parse_number(&raw),
                    Ok(raw) => Value::String(raw),
                    Err(_) => Value::Null,
                })
                .collect()
        })
        .collect();

    Table::new(layout.into_iter().map(|(name, _)| name).collect(), data)
}

fn parse_number(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
