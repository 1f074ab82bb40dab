//! Analyst UI crate - the embedded chat page.
//!
//! The page is a single self-contained HTML file with inline CSS and
//! JavaScript, embedded at compile time via `include_str!`. It talks to the
//! session endpoints of the API crate and draws result charts as inline SVG,
//! so it needs no CDN or build step.
//!
//! ```rust,ignore
//! use analyst_ui::chat_page::CHAT_HTML;
//!
//! async fn index() -> axum::response::Html<&'static str> {
//!     axum::response::Html(CHAT_HTML)
//! }
//! ```

pub mod chat_page;

pub use chat_page::CHAT_HTML;
