//! Analyst API crate - axum HTTP surface over the chat sessions.
//!
//! Serves the embedded chat page and a small JSON API: session lifecycle,
//! message and suggestion triggers, rendered history, and the sidebar.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
