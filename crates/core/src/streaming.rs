//! Agent Stream Event Types
//!
//! Wire-level event types delivered by the remote RAG agent over its
//! server-sent event stream, plus the adapter trait that turns raw transport
//! lines into those events. Shared by the agent crate (transport) and the
//! application crate (session controller).

use serde::{Deserialize, Serialize};

/// One event of the agent's response stream, discriminated by `event`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Human-readable progress message
    Status { message: String },

    /// The agent started running a tool
    ToolStart { tool_name: String },

    /// The agent finished running a tool
    ToolEnd { tool_name: String },

    /// Answer token. `accumulated` carries the full answer so far when the
    /// agent supplies it.
    Token {
        #[serde(default)]
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accumulated: Option<String>,
    },

    /// Authoritative citation list for the current answer
    Citations {
        #[serde(default)]
        citations: Vec<CitationPayload>,
    },

    /// Token usage information
    Usage(UsageReport),

    /// Stream complete
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        processing_time_ms: Option<f64>,
    },

    /// Error during streaming
    Error {
        #[serde(default)]
        error: String,
    },

    /// Event kind this client does not know about
    #[serde(other)]
    Unknown,
}

impl AgentStreamEvent {
    /// Whether no further events may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// The wire discriminant, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::Token { .. } => "token",
            Self::Citations { .. } => "citations",
            Self::Usage(_) => "usage",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// A citation as delivered by the agent.
///
/// Field names vary between agent versions, so the common spellings are
/// accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitationPayload {
    #[serde(default, alias = "text", alias = "excerpt", alias = "content")]
    pub excerpt_text: String,
    #[serde(default, alias = "file", alias = "file_name", alias = "source")]
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Token usage reported by the agent. Informational only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Errors that can occur during stream adaptation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed
    InvalidFormat(String),
    /// JSON/data parsing error
    ParseError(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Trait for adapting a raw transport stream to agent events.
///
/// Implementations are fed one line at a time (without the trailing newline)
/// and may buffer across lines.
pub trait StreamAdapter: Send + Sync {
    /// Returns the adapter name for logging and identification.
    fn adapter_name(&self) -> &'static str;

    /// Adapt a raw stream line to events.
    ///
    /// A single input line may produce zero, one, or multiple events.
    fn adapt(&mut self, input: &str) -> Result<Vec<AgentStreamEvent>, AdapterError>;

    /// Flush anything still buffered once the transport reaches end of stream.
    fn finish(&mut self) -> Result<Vec<AgentStreamEvent>, AdapterError> {
        Ok(vec![])
    }

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {}
}
