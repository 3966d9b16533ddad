//! Chat Models
//!
//! Messages, citations and the session state owned by the controller.

use chrono::{DateTime, Utc};
use doc_chat_core::CitationPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scope::ScopeFilter;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A passage the answer was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub excerpt_text: String,
    pub source_file: String,
    /// Relevance in `[0, 1]`, 0 when the agent did not score the passage
    pub relevance_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Citation {
    pub fn new(
        excerpt_text: impl Into<String>,
        source_file: impl Into<String>,
        relevance_score: f64,
    ) -> Self {
        Self {
            excerpt_text: excerpt_text.into(),
            source_file: source_file.into(),
            relevance_score: clamp_unit(relevance_score),
            page: None,
        }
    }
}

impl From<CitationPayload> for Citation {
    fn from(payload: CitationPayload) -> Self {
        Self {
            excerpt_text: payload.excerpt_text,
            source_file: payload.source_file,
            relevance_score: clamp_unit(payload.relevance_score.unwrap_or(0.0)),
            page: payload.page,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Derived metadata, attached when a turn completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
    pub confidence_score: f64,
    pub sources_count: usize,
    pub search_strategy: String,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    pub timestamp: DateTime<Utc>,
    /// Set while the assistant message is still being streamed into
    #[serde(default)]
    pub in_flight: bool,
    /// Set when the turn that produced this message failed
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            citations: Vec::new(),
            metadata: None,
            timestamp: Utc::now(),
            in_flight: false,
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    /// Empty assistant message that the current turn streams into.
    pub fn assistant_placeholder() -> Self {
        let mut message = Self::new(MessageRole::Assistant, String::new());
        message.in_flight = true;
        message
    }

    /// Finalized assistant message (used for history replay).
    pub fn assistant(content: impl Into<String>, citations: Vec<Citation>) -> Self {
        let mut message = Self::new(MessageRole::Assistant, content.into());
        message.citations = citations;
        message
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// Lifecycle of the session with respect to the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Sending,
    Streaming,
    Error,
}

impl SessionStatus {
    /// Whether a turn is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionStatus::Sending | SessionStatus::Streaming)
    }
}

/// The conversation as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Assigned by the agent on the first completed turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub messages: Vec<Message>,
    pub scope: ScopeFilter,
    pub status: SessionStatus,
}

impl ChatSession {
    pub fn new(scope: ScopeFilter) -> Self {
        Self {
            session_id: None,
            messages: Vec::new(),
            scope,
            status: SessionStatus::Idle,
        }
    }
}
