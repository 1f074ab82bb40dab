//! Analyst server binary - composition root.
//!
//! 1. Load the `.env` file and the TOML configuration
//! 2. Open the warehouse (Snowflake session or SQLite file)
//! 3. Build the Cortex Analyst client
//! 4. Serve the chat page and session API

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;

use analyst_api::routes;
use analyst_api::state::AppState;
use analyst_chat::{CortexAnalystClient, RetryPolicy, SessionRegistry};
use analyst_core::config::{AnalystConfig, WarehouseBackend};
use analyst_core::Credentials;
use analyst_warehouse::{SnowflakeExecutor, SqlExecutor, SqliteExecutor};

use cli::CliArgs;

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Write the default configuration to `path`, refusing to overwrite an
/// existing file.
fn write_default_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!("{} already exists", path.display()).into());
    }
    AnalystConfig::default().save(path)?;
    Ok(())
}

/// Open the warehouse named by the config and return it with the analyst
/// token.
async fn open_warehouse(
    config: &AnalystConfig,
) -> Result<(Arc<dyn SqlExecutor>, String), Box<dyn std::error::Error>> {
    match config.warehouse.backend {
        WarehouseBackend::Snowflake => {
            let credentials = Credentials::from_env()?;
            let executor = SnowflakeExecutor::connect(&credentials, &config.snowflake).await?;
            Ok((Arc::new(executor), credentials.token))
        }
        WarehouseBackend::Sqlite => {
            let token = Credentials::token_from_env()?;
            let executor = if config.warehouse.sqlite_path.is_empty() {
                tracing::warn!("No sqlite_path configured, using an empty in-memory database");
                SqliteExecutor::in_memory()?
            } else {
                SqliteExecutor::open(&expand_home(&config.warehouse.sqlite_path))?
            };
            Ok((Arc::new(executor), token))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Credentials come from the environment, so .env goes first.
    let env_loaded = match &args.env_file {
        Some(path) => Some(dotenvy::from_path(path).map(|_| path.clone())?),
        None => dotenvy::dotenv().ok(),
    };

    // Tracing. RUST_LOG > --log-level > config. The config level is applied
    // through the reload handle once the file has been read.
    let from_env = tracing_subscriber::EnvFilter::try_from_default_env().ok();
    let rust_log_set = from_env.is_some();
    let initial = from_env
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new(args.resolve_log_level("info")));
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting analyst v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = env_loaded {
        tracing::info!(path = %path.display(), "Environment file loaded");
    }

    let config_file = args.resolve_config_path();
    if args.write_config {
        write_default_config(&config_file)?;
        tracing::info!(path = %config_file.display(), "Default configuration written");
        return Ok(());
    }

    let config = AnalystConfig::load_or_default(&config_file);
    if !rust_log_set {
        let level = args.resolve_log_level(&config.general.log_level);
        filter_handle.modify(|f| *f = tracing_subscriber::EnvFilter::new(&level))?;
    }

    // Warehouse.
    let (executor, token) = match open_warehouse(&config).await {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!(error = %e, backend = ?config.warehouse.backend, "Failed to open warehouse");
            return Err(e);
        }
    };

    // Analyst client.
    let client = CortexAnalystClient::new(
        &config.snowflake,
        token,
        RetryPolicy::from(&config.retry),
    )?;
    tracing::info!(
        endpoint = %client.endpoint(),
        semantic_model = %config.snowflake.semantic_model_file(),
        "Analyst client ready"
    );

    let registry = SessionRegistry::new(Arc::new(client), executor, config.chat.clone());

    // === HTTP server ===

    let port = args.resolve_port(config.server.port);
    let addr = format!("{}:{}", args.resolve_bind(&config.server.bind), port);

    let mut config = config;
    config.server.port = port;
    let router = routes::create_router(AppState::new(config, registry));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind, is another instance running?");
            tracing::error!("Try: analyst --port {}", port.saturating_add(1));
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "API server listening");
    tracing::info!("Chat at http://{}/", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
