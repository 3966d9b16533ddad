//! Doc Chat Agent
//!
//! Client side of the remote retrieval-augmented agent:
//! - Wire types for the streaming and non-streaming chat endpoints
//! - The `AgentClient` trait and its reqwest implementation
//! - The SSE stream adapter and the HTTP client factory

pub mod client;
pub mod http_client;
pub mod rag_agent;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use client::{parse_http_error, parse_stream_http_error, AgentClient};
pub use http_client::build_http_client;
pub use rag_agent::{forward_event_stream, RagAgentClient};
pub use streaming_adapters::SseEventAdapter;
pub use types::*;
