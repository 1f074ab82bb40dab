//! Warehouse access for generated SQL.
//!
//! Defines the [`SqlExecutor`] seam used by the turn renderer and two
//! implementations: a Snowflake session opened once with environment
//! credentials, and a SQLite database for offline demos and fixtures.

pub mod error;
pub mod executor;
pub mod snowflake;
pub mod sqlite;

pub use error::WarehouseError;
pub use executor::{normalize_statement, SqlExecutor};
pub use snowflake::SnowflakeExecutor;
pub use sqlite::SqliteExecutor;
