//! Client for the hosted analyst (natural language to SQL) endpoint.
//!
//! Every call is single-turn: the service is stateless per request and prior
//! turns are never resent.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use analyst_core::config::{RetryConfig, SnowflakeConfig};
use analyst_core::ContentPart;

use crate::error::AssistantError;

pub const MESSAGE_PATH: &str = "/api/v2/cortex/analyst/message";
pub const REQUEST_ID_HEADER: &str = "X-Snowflake-Request-Id";

/// Decoded answer of one analyst call.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantResponse {
    /// Taken from the `X-Snowflake-Request-Id` response header.
    pub request_id: Option<String>,
    pub content: Vec<ContentPart>,
}

/// Sends one utterance to the remote assistant.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn send(&self, utterance: &str) -> Result<AssistantResponse, AssistantError>;
}

/// How transport failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

#[derive(Deserialize)]
struct AnalystReply {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Vec<ContentPart>,
}

/// Request body for one question against the semantic model.
pub fn build_request_body(utterance: &str, semantic_model_file: &str) -> serde_json::Value {
    json!({
        "messages": [
            {"role": "user", "content": [{"type": "text", "text": utterance}]}
        ],
        "semantic_model_file": semantic_model_file,
    })
}

/// Cortex Analyst REST client.
pub struct CortexAnalystClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    semantic_model_file: String,
    retry: RetryPolicy,
}

impl fmt::Debug for CortexAnalystClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CortexAnalystClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("semantic_model_file", &self.semantic_model_file)
            .field("retry", &self.retry)
            .finish()
    }
}

impl CortexAnalystClient {
    pub fn new(
        config: &SnowflakeConfig,
        token: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.assistant_timeout_secs))
            .build()
            .map_err(|e| AssistantError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}{}", config.base_url(), MESSAGE_PATH),
            token: token.into(),
            semantic_model_file: config.semantic_model_file(),
            retry,
        })
    }

    /// Point the client at a different base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint = format!("{}{}", base_url.trim_end_matches('/'), MESSAGE_PATH);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(
        &self,
        body: &serde_json::Value,
    ) -> Result<AssistantResponse, AssistantError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Snowflake Token=\"{}\"", self.token),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AssistantError::Transport(e.to_string()))?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let text = response
            .text()
            .await
            .map_err(|e| AssistantError::Transport(e.to_string()))?;

        if status.as_u16() >= 400 {
            return Err(AssistantError::RequestFailed {
                request_id,
                status: status.as_u16(),
                body: text,
            });
        }

        let reply: AnalystReply =
            serde_json::from_str(&text).map_err(|e| AssistantError::Decode {
                request_id: request_id.clone(),
                message: e.to_string(),
            })?;

        let total = reply.message.content.len();
        let content: Vec<ContentPart> = reply
            .message
            .content
            .into_iter()
            .filter(|part| !matches!(part, ContentPart::Unknown))
            .collect();
        if content.len() < total {
            warn!(
                request_id = ?request_id,
                skipped = total - content.len(),
                "Skipped analyst content parts of unknown type"
            );
        }

        Ok(AssistantResponse {
            request_id,
            content,
        })
    }
}

#[async_trait]
impl Assistant for CortexAnalystClient {
    async fn send(&self, utterance: &str) -> Result<AssistantResponse, AssistantError> {
        let body = build_request_body(utterance, &self.semantic_model_file);
        let mut attempt = 0;

        loop {
            debug!(endpoint = %self.endpoint, attempt, "Analyst request");
            match self.send_once(&body).await {
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "Retrying analyst request");
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
