//! CLI argument definitions for the analyst server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Chat with your warehouse: questions go to Cortex Analyst, the SQL it
/// writes runs against your data, and answers come back as tables and charts.
#[derive(Parser, Debug)]
#[command(name = "analyst", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// HTTP server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Address to bind the HTTP server to.
    #[arg(short = 'b', long = "bind")]
    pub bind: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// `.env` file holding the Snowflake credentials. Defaults to `./.env`
    /// when present.
    #[arg(short = 'e', long = "env-file")]
    pub env_file: Option<PathBuf>,

    /// Write a default configuration file to the config path and exit.
    #[arg(long = "write-config")]
    pub write_config: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ANALYST_CONFIG env var > ~/.analyst/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ANALYST_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --port flag > ANALYST_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        std::env::var("ANALYST_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    /// Priority: --bind flag > config file value.
    pub fn resolve_bind(&self, config_bind: &str) -> String {
        self.bind
            .clone()
            .unwrap_or_else(|| config_bind.to_string())
    }

    /// Priority: --log-level flag > config file value. `RUST_LOG` still wins
    /// over both when the subscriber is built.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".analyst").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".analyst").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let args = CliArgs::parse_from([
            "analyst",
            "--config",
            "/etc/analyst.toml",
            "-p",
            "9000",
            "--bind",
            "0.0.0.0",
            "--log-level",
            "debug",
            "--env-file",
            "prod.env",
        ]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/analyst.toml"));
        assert_eq!(args.resolve_port(8501), 9000);
        assert_eq!(args.resolve_bind("127.0.0.1"), "0.0.0.0");
        assert_eq!(args.resolve_log_level("info"), "debug");
        assert_eq!(args.env_file, Some(PathBuf::from("prod.env")));
    }

    #[test]
    fn test_config_values_used_without_flags() {
        let args = CliArgs::parse_from(["analyst"]);
        assert_eq!(args.resolve_bind("127.0.0.1"), "127.0.0.1");
        assert_eq!(args.resolve_log_level("warn"), "warn");
        assert!(args.env_file.is_none());
        assert!(!args.write_config);
    }

    #[test]
    fn test_write_config_flag() {
        let args = CliArgs::parse_from(["analyst", "--write-config", "-c", "/tmp/a.toml"]);
        assert!(args.write_config);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/a.toml"));
    }

    #[test]
    fn test_default_config_path_file_name() {
        assert!(default_config_path().ends_with("config.toml"));
    }
}
