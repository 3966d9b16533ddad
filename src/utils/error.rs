//! Error Handling
//!
//! Unified error types for the session controller.
//! Uses thiserror for ergonomic error definitions.

use doc_chat_agent::AgentError;
use doc_chat_core::CoreError;
use thiserror::Error;

/// Controller-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (e.g. missing organization identity)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested scope cannot be turned into valid filters
    #[error("Scope resolution error: {0}")]
    Scope(String),

    /// A turn is already in flight for this session
    #[error("Session busy: a query is already in flight")]
    SessionBusy,

    /// `retry` was called before any query was sent
    #[error("No prior query to retry")]
    NoPriorQuery,

    /// The chat session is not open
    #[error("Chat session is not open")]
    SessionClosed,

    /// Connection failure or non-success HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or failed stream
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for controller errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a scope resolution error
    pub fn scope(msg: impl Into<String>) -> Self {
        Self::Scope(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Config { message } => AppError::Config(message),
            AgentError::ParseError { message } => AppError::Protocol(message),
            other => AppError::Transport(other.to_string()),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(msg) => AppError::Config(msg),
            CoreError::Serialization(e) => AppError::Serialization(e),
            CoreError::Validation(msg) => AppError::Validation(msg),
            CoreError::Parse(msg) => AppError::Protocol(msg),
            CoreError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Convert AppError to a string suitable for host IPC responses
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
