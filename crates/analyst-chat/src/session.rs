//! Per-session conversation state.

use serde::Serialize;

use analyst_core::{ChatHistoryEntry, Role, Turn};

use crate::render::{cached_blocks, RenderedBlock};

/// Everything one user session remembers: the turns, at most one pending
/// suggestion, and the sidebar's question/answer log. Lives in memory only.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<Turn>,
    pending: Option<String>,
    chat_history: Vec<ChatHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarEntry {
    pub label: String,
    pub question: String,
    pub timestamp: String,
    pub response: Vec<analyst_core::ContentPart>,
    /// `response` ready to draw, from the cached SQL results.
    pub blocks: Vec<RenderedBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentMessage {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sidebar {
    pub entries: Vec<SidebarEntry>,
    pub recent: Vec<RecentMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Mutable access for caching SQL results on existing turns.
    pub fn history_mut(&mut self) -> &mut [Turn] {
        &mut self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Queue a suggestion, replacing any that was not yet consumed.
    pub fn set_pending(&mut self, suggestion: impl Into<String>) {
        self.pending = Some(suggestion.into());
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Consume the pending suggestion, leaving none behind.
    pub fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn record_history(&mut self, entry: ChatHistoryEntry) {
        self.chat_history.push(entry);
    }

    pub fn chat_history(&self) -> &[ChatHistoryEntry] {
        &self.chat_history
    }

    /// Sidebar contents: one labelled entry per answered question and the
    /// last `recent` messages with their first text part.
    pub fn sidebar(&self, label_chars: usize, recent: usize) -> Sidebar {
        let entries = self
            .chat_history
            .iter()
            .map(|entry| SidebarEntry {
                label: entry.label(label_chars),
                question: entry.question.clone(),
                timestamp: entry.timestamp.clone(),
                response: entry.response.clone(),
                blocks: cached_blocks(&entry.response),
            })
            .collect();

        let skip = self.history.len().saturating_sub(recent);
        let recent = self.history[skip..]
            .iter()
            .map(|turn| RecentMessage {
                role: turn.role,
                text: turn.first_text().unwrap_or_default().to_string(),
            })
            .collect();

        Sidebar { entries, recent }
    }
}
