//! Agent Wire Types
//!
//! Request/response bodies exchanged with the remote RAG agent, the client
//! configuration, and the agent error type.

use std::fmt;
use std::str::FromStr;

use doc_chat_core::streaming::{AgentStreamEvent, CitationPayload};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retrieval strategy requested from the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Semantic,
    Keyword,
    #[default]
    Hybrid,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Semantic => "semantic",
            SearchMode::Keyword => "keyword",
            SearchMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "semantic" => Ok(SearchMode::Semantic),
            "keyword" => Ok(SearchMode::Keyword),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(format!("Unknown search mode: {}", other)),
        }
    }
}

/// File filter sent to the agent: a single name or a disjunctive list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileFilter {
    Single(String),
    Multiple(Vec<String>),
}

impl FileFilter {
    /// Build a filter from file names. One name stays scalar, several become
    /// a list, none yields no filter.
    pub fn from_names(mut names: Vec<String>) -> Option<Self> {
        match names.len() {
            0 => None,
            1 => names.pop().map(FileFilter::Single),
            _ => Some(FileFilter::Multiple(names)),
        }
    }
}

/// Streaming chat request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub organization_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_filter: Option<FileFilter>,
    pub search_mode: SearchMode,
    pub max_sources: u32,
    pub include_tool_events: bool,
}

/// Non-streaming request body: the chat request minus `include_tool_events`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub organization_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_filter: Option<&'a FileFilter>,
    pub search_mode: SearchMode,
    pub max_sources: u32,
}

impl<'a> From<&'a ChatRequest> for QueryRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            query: &request.query,
            organization_name: &request.organization_name,
            session_id: request.session_id.as_deref(),
            folder_filter: request.folder_filter.as_deref(),
            file_filter: request.file_filter.as_ref(),
            search_mode: request.search_mode,
            max_sources: request.max_sources,
        }
    }
}

/// Non-streaming response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<CitationPayload>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueryResponse {
    /// Replay the response as the event sequence a stream would have
    /// delivered, so it can go through the same consumer.
    pub fn into_events(self) -> Vec<AgentStreamEvent> {
        if !self.success {
            let error = self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Agent reported an unsuccessful query".to_string());
            return vec![AgentStreamEvent::Error { error }];
        }

        vec![
            AgentStreamEvent::Token {
                token: String::new(),
                accumulated: Some(self.answer),
            },
            AgentStreamEvent::Citations {
                citations: self.citations,
            },
            AgentStreamEvent::Done {
                session_id: self.session_id,
                processing_time_ms: self.processing_time_ms,
            },
        ]
    }
}

/// Connection settings for the remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL of the agent service
    pub base_url: String,
    /// Streaming chat endpoint, relative to `base_url`
    pub stream_path: String,
    /// Non-streaming query endpoint, relative to `base_url`
    pub query_path: String,
    /// Health endpoint, relative to `base_url`
    pub health_path: String,
    /// Bearer token, if the agent requires one
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Proxy URL (http, https or socks5)
    pub proxy_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            stream_path: "/api/chat/stream".to_string(),
            query_path: "/api/chat/query".to_string(),
            health_path: "/health".to_string(),
            api_key: None,
            proxy_url: None,
        }
    }
}

/// Errors raised while talking to the remote agent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Server error: {message}")]
    ServerError { message: String, status: Option<u16> },

    #[error("Streaming unavailable: {message}")]
    StreamingUnavailable { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("{message}")]
    Other { message: String },
}

/// Result type alias for agent errors
pub type AgentResult<T> = Result<T, AgentError>;

impl AgentError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }
}
