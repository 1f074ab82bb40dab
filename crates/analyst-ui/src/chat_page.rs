//! The chat page served at `/`.
//!
//! One column of turns with a composer at the bottom, and a sidebar holding
//! the about text, the chat-history labels and the most recent messages.
//! Clicking a chat-history label expands its question and answer in place,
//! drawn from the cached results the sidebar endpoint returns.
//! Suggestion chips post their key back to the session; SQL results are shown
//! as a table plus line/bar/area tabs drawn as inline SVG.

/// The complete self-contained chat page.
///
/// Talks to the API on the same origin:
///
/// - `GET /about` for the assistant name and description
/// - `POST /sessions` to start a session, kept in `sessionStorage`
/// - `POST /sessions/{id}/messages` and `POST /sessions/{id}/suggestions`
/// - `GET /sessions/{id}/history` and `GET /sessions/{id}/sidebar`
pub const CHAT_HTML: &str = include_str!("../assets/chat.html");
