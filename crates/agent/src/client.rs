//! Agent Client Trait
//!
//! Defines the interface the session controller uses to reach the remote
//! RAG agent.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::types::{AgentError, AgentResult, ChatRequest, QueryResponse};
use doc_chat_core::streaming::AgentStreamEvent;

/// Trait that all agent transports must implement.
///
/// Provides a unified interface for:
/// - Streaming chat (stream_chat)
/// - Single-shot queries when streaming is unavailable (query)
/// - Health checking
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Returns the client name for identification.
    fn name(&self) -> &'static str;

    /// Stream a chat response via a channel.
    ///
    /// Events are sent in the order the transport delivers them. The call
    /// returns once a terminal event has been forwarded, the stream ends, or
    /// `cancel` fires (in which case it returns `AgentError::Cancelled` and the
    /// underlying connection is dropped).
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<AgentStreamEvent>,
        cancel: CancellationToken,
    ) -> AgentResult<()>;

    /// Send the request to the non-streaming endpoint.
    async fn query(&self, request: ChatRequest) -> AgentResult<QueryResponse>;

    /// Check if the agent is reachable.
    async fn health_check(&self) -> AgentResult<()>;
}

/// Map a non-success HTTP status to an agent error.
pub fn parse_http_error(status: u16, body: &str) -> AgentError {
    match status {
        401 => AgentError::AuthenticationFailed {
            message: "Invalid or missing credentials".to_string(),
        },
        403 => AgentError::AuthenticationFailed {
            message: "Access denied".to_string(),
        },
        400 | 422 => AgentError::InvalidRequest {
            message: body.to_string(),
        },
        429 => AgentError::RateLimited {
            message: body.to_string(),
        },
        500..=599 => AgentError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => AgentError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Map a non-success status from the streaming endpoint. Statuses meaning the
/// endpoint does not exist become `StreamingUnavailable` so callers can fall
/// back to the query endpoint.
pub fn parse_stream_http_error(status: u16, body: &str) -> AgentError {
    match status {
        404 | 405 | 501 => AgentError::StreamingUnavailable {
            message: format!("HTTP {}", status),
        },
        _ => parse_http_error(status, body),
    }
}
