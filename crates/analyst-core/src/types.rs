use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Display format for turn timestamps, e.g. `2024-03-01 14:05:09`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a local time the way turns and sidebar entries display it.
pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

// =============================================================================
// Conversation
// =============================================================================

/// Author of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One typed unit of a turn's payload.
///
/// The wire tags match the analyst service's `message.content[].type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Markdown text, displayed verbatim.
    Text { text: String },
    /// Follow-up questions offered as clickable chips.
    Suggestions { suggestions: Vec<String> },
    /// Generated SQL plus the result of its first execution.
    Sql {
        statement: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Table>,
    },
    /// Any part type this client does not understand.
    #[serde(other)]
    Unknown,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn sql(statement: impl Into<String>) -> Self {
        ContentPart::Sql {
            statement: statement.into(),
            result: None,
        }
    }
}

/// One message in the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentPart>,
    pub timestamp: String,
    /// Analyst request id; only set on assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Turn {
    /// A user turn holding a single text part.
    pub fn user(text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::text(text)],
            timestamp: timestamp.into(),
            request_id: None,
        }
    }

    pub fn assistant(
        content: Vec<ContentPart>,
        request_id: Option<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content,
            timestamp: timestamp.into(),
            request_id,
        }
    }

    /// Text of the first text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A completed question/answer pair listed in the chat-history sidebar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub question: String,
    pub response: Vec<ContentPart>,
    pub timestamp: String,
}

impl ChatHistoryEntry {
    /// Sidebar label: the question cut to `max_chars` characters, then the
    /// timestamp in parentheses.
    pub fn label(&self, max_chars: usize) -> String {
        let truncated: String = self.question.chars().take(max_chars).collect();
        format!("{} : ({})", truncated, self.timestamp)
    }
}

// =============================================================================
// Tabular results
// =============================================================================

/// Rows and column names returned by a SQL execution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
