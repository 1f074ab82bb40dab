//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use analyst_chat::SessionRegistry;
use analyst_core::config::AnalystConfig;

/// Shared application state, cloned into every handler by axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration. Read-only while the server runs.
    pub config: Arc<AnalystConfig>,
    /// Live chat sessions.
    pub registry: Arc<SessionRegistry>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AnalystConfig, registry: SessionRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            start_time: Instant::now(),
        }
    }
}
