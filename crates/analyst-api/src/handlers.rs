//! Route handler functions for all API endpoints.
//!
//! Handlers that touch a session claim it for the whole request through
//! [`SessionHandle::begin`](analyst_chat::SessionHandle::begin), so a second
//! request for a busy session gets 409 instead of waiting.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use analyst_chat::{RenderedTurn, SessionSummary, Sidebar};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AboutResponse {
    pub name: String,
    pub description: String,
    pub app_icon: String,
    pub assistant_icon: String,
    pub user_icon: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedSession {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub key: String,
}

/// Turns produced by a trigger, or the whole history for `GET .../history`.
#[derive(Debug, Serialize)]
pub struct TurnsResponse {
    pub session_id: Uuid,
    pub turns: Vec<RenderedTurn>,
}

// =============================================================================
// Static endpoints
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        sessions: state.registry.len(),
    })
}

/// GET / - the chat page.
pub async fn index() -> impl IntoResponse {
    Html(analyst_ui::CHAT_HTML)
}

/// GET /about - assistant name, description and icon paths.
pub async fn about(State(state): State<AppState>) -> Json<AboutResponse> {
    let assistant = &state.config.assistant;
    Json(AboutResponse {
        name: assistant.name.clone(),
        description: assistant.description.clone(),
        app_icon: assistant.app_icon.clone(),
        assistant_icon: assistant.assistant_icon.clone(),
        user_icon: assistant.user_icon.clone(),
    })
}

// =============================================================================
// Sessions
// =============================================================================

/// POST /sessions
pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let handle = state.registry.create();
    (StatusCode::CREATED, Json(CreatedSession { id: handle.id() }))
}

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.registry.list())
}

/// DELETE /sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.registry.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/{id}/messages - run a cycle for typed text.
///
/// Only the typed text runs here. Chips go through
/// [`select_suggestion`], which runs the pending suggestion in the same
/// request.
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnsResponse>, ApiError> {
    let handle = state.registry.get(id)?;
    let mut chat = handle.begin()?;

    let outcome = chat.submit(&req.text).await?;

    Ok(Json(TurnsResponse {
        session_id: id,
        turns: vec![outcome.user, outcome.assistant],
    }))
}

/// POST /sessions/{id}/suggestions - select a chip and run it as the next
/// utterance.
pub async fn select_suggestion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SuggestionRequest>,
) -> Result<Json<TurnsResponse>, ApiError> {
    let handle = state.registry.get(id)?;
    let mut chat = handle.begin()?;

    let suggestion = chat.select_suggestion(&req.key)?;
    info!(session_id = %id, key = %req.key, %suggestion, "Suggestion selected");

    let turns = match chat.run_pending().await? {
        Some(outcome) => vec![outcome.user, outcome.assistant],
        None => Vec::new(),
    };

    Ok(Json(TurnsResponse {
        session_id: id,
        turns,
    }))
}

/// GET /sessions/{id}/history - every turn, rendered from cached results.
pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TurnsResponse>, ApiError> {
    let handle = state.registry.get(id)?;
    let mut chat = handle.begin()?;
    let turns = chat.redraw(None).await?;

    Ok(Json(TurnsResponse {
        session_id: id,
        turns,
    }))
}

/// GET /sessions/{id}/sidebar
pub async fn sidebar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sidebar>, ApiError> {
    let handle = state.registry.get(id)?;
    let chat = handle.begin()?;
    let sidebar = chat.sidebar();
    Ok(Json(sidebar))
}
