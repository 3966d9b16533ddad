//! Agent Stream Adapters
//!
//! Each adapter turns one transport framing into `AgentStreamEvent`s.

pub mod sse;

pub use sse::SseEventAdapter;
