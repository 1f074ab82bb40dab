//! The request/response cycle of one chat session.
//!
//! A cycle appends the user turn, asks the assistant, renders (and caches) the
//! answer, then appends the assistant turn. A failure at any step after the
//! first ends the cycle with the user turn kept and no assistant turn.

use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use analyst_core::config::ChatConfig;
use analyst_core::{format_timestamp, ChatHistoryEntry, Role, Turn};

use crate::client::Assistant;
use crate::error::ChatError;
use crate::render::{resolve_chip, RenderedBlock, TurnRenderer};
use crate::session::{ChatSession, Sidebar};

/// View-model of one turn in history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTurn {
    pub index: usize,
    pub role: Role,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub blocks: Vec<RenderedBlock>,
}

/// The two turns a successful cycle appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub user: RenderedTurn,
    pub assistant: RenderedTurn,
}

pub struct TurnLoop {
    session: ChatSession,
    assistant: Arc<dyn Assistant>,
    renderer: TurnRenderer,
    limits: ChatConfig,
}

impl TurnLoop {
    pub fn new(assistant: Arc<dyn Assistant>, renderer: TurnRenderer, limits: ChatConfig) -> Self {
        Self {
            session: ChatSession::new(),
            assistant,
            renderer,
            limits,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn sidebar(&self) -> Sidebar {
        self.session
            .sidebar(self.limits.sidebar_label_chars, self.limits.recent_messages)
    }

    /// Run one cycle for a typed message.
    pub async fn submit(&mut self, text: &str) -> Result<TurnOutcome, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.limits.max_message_length {
            return Err(ChatError::MessageTooLong(self.limits.max_message_length));
        }

        self.cycle(text).await
    }

    /// Run a cycle for the pending suggestion, if one is queued.
    ///
    /// The suggestion is taken before the cycle starts so a failing cycle does
    /// not leave it queued.
    pub async fn run_pending(&mut self) -> Result<Option<TurnOutcome>, ChatError> {
        match self.session.take_pending() {
            Some(suggestion) => {
                info!(suggestion = %suggestion, "Running selected suggestion");
                self.submit(&suggestion).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Queue the suggestion behind chip `key`. Returns its text.
    pub fn select_suggestion(&mut self, key: &str) -> Result<String, ChatError> {
        let label = self
            .session
            .history()
            .iter()
            .enumerate()
            .find_map(|(i, turn)| resolve_chip(&turn.content, i, key))
            .ok_or_else(|| ChatError::UnknownSuggestion(key.to_string()))?;

        self.session.set_pending(label.clone());
        Ok(label)
    }

    /// Render the whole history from cached results.
    ///
    /// A `click` matching a chip key queues that suggestion; it runs on the
    /// next `run_pending`.
    pub async fn redraw(&mut self, click: Option<&str>) -> Result<Vec<RenderedTurn>, ChatError> {
        let mut rendered = Vec::with_capacity(self.session.len());
        let mut selected = None;

        for (index, turn) in self.session.history_mut().iter_mut().enumerate() {
            let outcome = self
                .renderer
                .render(&mut turn.content, turn.request_id.as_deref(), index, click)
                .await?;
            if outcome.selected_suggestion.is_some() {
                selected = outcome.selected_suggestion;
            }
            rendered.push(RenderedTurn {
                index,
                role: turn.role,
                timestamp: turn.timestamp.clone(),
                request_id: outcome.request_id,
                blocks: outcome.blocks,
            });
        }

        if let Some(suggestion) = selected {
            self.session.set_pending(suggestion);
        }
        Ok(rendered)
    }

    async fn cycle(&mut self, text: &str) -> Result<TurnOutcome, ChatError> {
        let timestamp = format_timestamp(Local::now());

        self.session.push_turn(Turn::user(text, timestamp.clone()));
        let user = RenderedTurn {
            index: self.session.len() - 1,
            role: Role::User,
            timestamp: timestamp.clone(),
            request_id: None,
            blocks: vec![RenderedBlock::Markdown {
                text: text.to_string(),
            }],
        };

        let response = self.assistant.send(text).await.map_err(|e| {
            warn!(error = %e, "Analyst request failed");
            e
        })?;

        let index = self.session.len();
        let mut content = response.content;
        let outcome = self
            .renderer
            .render(&mut content, response.request_id.as_deref(), index, None)
            .await
            .map_err(|e| {
                warn!(error = %e, "Generated SQL failed");
                e
            })?;

        self.session.push_turn(Turn::assistant(
            content.clone(),
            response.request_id.clone(),
            timestamp.clone(),
        ));
        self.session.record_history(ChatHistoryEntry {
            question: text.to_string(),
            response: content,
            timestamp: timestamp.clone(),
        });

        info!(
            request_id = ?response.request_id,
            turns = self.session.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            user,
            assistant: RenderedTurn {
                index,
                role: Role::Assistant,
                timestamp,
                request_id: outcome.request_id,
                blocks: outcome.blocks,
            },
        })
    }
}

impl std::fmt::Debug for TurnLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnLoop")
            .field("turns", &self.session.len())
            .field("pending", &self.session.pending())
            .finish()
    }
}
