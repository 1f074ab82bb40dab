use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

/// Top-level configuration for the analyst front-end.
///
/// Loaded from `~/.analyst/config.toml` by default. Each section corresponds
/// to one collaborator: the assistant's presentation, the Snowflake account
/// objects, the warehouse backend, the chat session limits, the retry policy
/// for the remote call and the HTTP server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalystConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub snowflake: SnowflakeConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AnalystConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalystConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// How the assistant presents itself in the chat page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Display name shown as the page title and in the about section.
    pub name: String,
    /// One-line description for the about section.
    pub description: String,
    pub app_icon: String,
    pub assistant_icon: String,
    pub user_icon: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Supply Chain Analyst".to_string(),
            description: "Sample Description. Powered by Snowflake and AI.".to_string(),
            app_icon: "imgs/app_icon.png".to_string(),
            assistant_icon: "imgs/bot_icon.png".to_string(),
            user_icon: "imgs/user_icon.png".to_string(),
        }
    }
}

/// Snowflake account objects used by both the analyst endpoint and the
/// warehouse connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowflakeConfig {
    /// Account host, e.g. `myorg-myaccount.snowflakecomputing.com`.
    pub host: String,
    pub port: u16,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    /// Stage holding the semantic model file.
    pub stage: String,
    /// Semantic model file name inside the stage.
    pub file: String,
    pub role: String,
    /// Timeout for a single SQL execution in seconds.
    pub query_timeout_secs: u64,
    /// Timeout for a single analyst request in seconds.
    pub assistant_timeout_secs: u64,
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self {
            host: "localhost.snowflakecomputing.com".to_string(),
            port: 443,
            warehouse: "CORTEX_ANALYST_WH".to_string(),
            database: "CORTEX_ANALYST_DEMO".to_string(),
            schema: "REVENUE_TIMESERIES".to_string(),
            stage: "RAW_DATA".to_string(),
            file: "revenue_timeseries.yaml".to_string(),
            role: "CORTEX_USER_ROLE".to_string(),
            query_timeout_secs: 60,
            assistant_timeout_secs: 120,
        }
    }
}

impl SnowflakeConfig {
    /// Stage path of the semantic model artifact: `@DB.SCHEMA.STAGE/file`.
    pub fn semantic_model_file(&self) -> String {
        format!(
            "@{}.{}.{}/{}",
            self.database, self.schema, self.stage, self.file
        )
    }

    /// Base URL of the account, omitting the port when it is the HTTPS default.
    pub fn base_url(&self) -> String {
        if self.port == 443 {
            format!("https://{}", self.host)
        } else {
            format!("https://{}:{}", self.host, self.port)
        }
    }
}

/// Which engine executes the generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    Snowflake,
    Sqlite,
}

/// Warehouse backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub backend: WarehouseBackend,
    /// Database file for the SQLite backend. Empty means in-memory.
    pub sqlite_path: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            backend: WarehouseBackend::Snowflake,
            sqlite_path: String::new(),
        }
    }
}

/// Chat session limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum utterance length in characters.
    pub max_message_length: usize,
    /// Characters of the question kept in a sidebar label.
    pub sidebar_label_chars: usize,
    /// Number of most recent messages listed in the sidebar.
    pub recent_messages: usize,
    /// Idle minutes after which a session is discarded.
    pub session_timeout_minutes: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            sidebar_label_chars: 20,
            recent_messages: 5,
            session_timeout_minutes: 60,
        }
    }
}

/// Retry policy for transport failures of the analyst request.
///
/// Responses with an error status are never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Delay before the first retry; grows linearly with the attempt number.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 500,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AnalystConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.assistant.name, "Supply Chain Analyst");
        assert_eq!(config.snowflake.port, 443);
        assert_eq!(config.warehouse.backend, WarehouseBackend::Snowflake);
        assert_eq!(config.chat.max_message_length, 2000);
        assert_eq!(config.chat.sidebar_label_chars, 20);
        assert_eq!(config.chat.recent_messages, 5);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.server.port, 8501);
    }

    #[test]
    fn test_example_config_parses() {
        let config: AnalystConfig =
            toml::from_str(include_str!("../../../config.example.toml")).unwrap();
        assert_eq!(config.snowflake.host, "myaccount.snowflakecomputing.com");
        assert_eq!(
            config.snowflake.semantic_model_file(),
            "@CORTEX_ANALYST_DEMO.REVENUE_TIMESERIES.RAW_DATA/revenue_timeseries.yaml"
        );
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[assistant]
name = "Revenue Analyst"
description = "Answers revenue questions."

[snowflake]
host = "acme-prod.snowflakecomputing.com"
port = 443
warehouse = "ANALYST_WH"
database = "SALES"
schema = "PUBLIC"
stage = "MODELS"
file = "revenue.yaml"
role = "ANALYST"

[warehouse]
backend = "sqlite"
sqlite_path = "/tmp/fixture.db"

[retry]
max_retries = 0
backoff_ms = 10
"#;
        let file = create_temp_config(content);
        let config = AnalystConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.assistant.name, "Revenue Analyst");
        assert_eq!(config.snowflake.host, "acme-prod.snowflakecomputing.com");
        assert_eq!(config.snowflake.role, "ANALYST");
        assert_eq!(config.warehouse.backend, WarehouseBackend::Sqlite);
        assert_eq!(config.warehouse.sqlite_path, "/tmp/fixture.db");
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[assistant]
name = "Ops Analyst"
"#;
        let file = create_temp_config(content);
        let config = AnalystConfig::load(file.path()).unwrap();
        assert_eq!(config.assistant.name, "Ops Analyst");
        // Remaining fields use defaults
        assert_eq!(config.assistant.user_icon, "imgs/user_icon.png");
        assert_eq!(config.snowflake.stage, "RAW_DATA");
        assert_eq!(config.chat.session_timeout_minutes, 60);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AnalystConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.snowflake.database, "CORTEX_ANALYST_DEMO");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = AnalystConfig::load(file.path());
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let file = create_temp_config("[warehouse]\nbackend = \"oracle\"\n");
        assert!(AnalystConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = AnalystConfig::default();
        config.snowflake.file = "orders.yaml".to_string();
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = AnalystConfig::load(&path).unwrap();
        assert_eq!(reloaded.snowflake.file, "orders.yaml");
        assert_eq!(reloaded.server.bind, "127.0.0.1");
    }

    #[test]
    fn test_semantic_model_file_path() {
        let snowflake = SnowflakeConfig::default();
        assert_eq!(
            snowflake.semantic_model_file(),
            "@CORTEX_ANALYST_DEMO.REVENUE_TIMESERIES.RAW_DATA/revenue_timeseries.yaml"
        );
    }

    #[test]
    fn test_base_url_omits_default_port() {
        let mut snowflake = SnowflakeConfig {
            host: "acme.snowflakecomputing.com".to_string(),
            ..SnowflakeConfig::default()
        };
        assert_eq!(snowflake.base_url(), "https://acme.snowflakecomputing.com");

        snowflake.port = 8443;
        assert_eq!(
            snowflake.base_url(),
            "https://acme.snowflakecomputing.com:8443"
        );
    }
}
