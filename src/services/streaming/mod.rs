//! Streaming
//!
//! Consumption of the agent's response stream.

pub mod consumer;

pub use consumer::{
    StreamEventConsumer, TurnTransition, GENERATING_PROGRESS, INCOMPLETE_STREAM_ERROR,
    SEARCHING_PROGRESS,
};
