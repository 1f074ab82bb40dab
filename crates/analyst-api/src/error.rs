//! API error types and JSON error response formatting.
//!
//! Every failure leaves the server as `{error, message, details}` with a
//! status code chosen by what went wrong: the user's input, the session, the
//! analyst service, or the generated SQL.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use analyst_chat::{AssistantError, ChatError};
use analyst_warehouse::WarehouseError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "bad_gateway").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 - empty or oversized message, unknown suggestion key.
    BadRequest(String),
    /// 404 - no such session.
    NotFound(String),
    /// 409 - a turn is already running for the session.
    Conflict(String),
    /// 422 - the generated SQL failed to execute.
    UnprocessableEntity { message: String, details: Value },
    /// 502 - the analyst service answered with an error or garbage.
    BadGateway { message: String, details: Value },
    /// 504 - the analyst service could not be reached.
    GatewayTimeout(String),
    /// 503 - the warehouse connection is unusable.
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::UnprocessableEntity { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "query_failed",
                message,
                Some(details),
            ),
            ApiError::BadGateway { message, details } => {
                (StatusCode::BAD_GATEWAY, "bad_gateway", message, Some(details))
            }
            ApiError::GatewayTimeout(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", msg, None)
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), %message, "Request failed");
        }

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let message = err.to_string();
        match err {
            ChatError::EmptyMessage
            | ChatError::MessageTooLong(_)
            | ChatError::UnknownSuggestion(_) => ApiError::BadRequest(message),
            ChatError::SessionNotFound(_) => ApiError::NotFound(message),
            ChatError::TurnInProgress(_) => ApiError::Conflict(message),
            ChatError::Assistant(err) => err.into(),
            ChatError::Query(err) => err.into(),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        let message = err.to_string();
        match err {
            AssistantError::Transport(_) => ApiError::GatewayTimeout(message),
            AssistantError::RequestFailed {
                request_id,
                status,
                body,
            } => ApiError::BadGateway {
                message,
                details: json!({"request_id": request_id, "status": status, "body": body}),
            },
            AssistantError::Decode { request_id, .. } => ApiError::BadGateway {
                message,
                details: json!({"request_id": request_id}),
            },
            AssistantError::Config(_) => ApiError::Internal(message),
        }
    }
}

impl From<WarehouseError> for ApiError {
    fn from(err: WarehouseError) -> Self {
        let message = err.to_string();
        match err {
            WarehouseError::QueryFailed { statement, .. } => ApiError::UnprocessableEntity {
                message,
                details: json!({"statement": statement}),
            },
            WarehouseError::Connect(_) => ApiError::ServiceUnavailable(message),
        }
    }
}
