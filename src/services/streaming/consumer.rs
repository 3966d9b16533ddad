//! Stream Event Consumer
//!
//! Folds agent stream events into immutable transitions of the in-flight
//! assistant message. The consumer never touches session state itself; the
//! controller applies each transition under its own lock.

use doc_chat_core::{AgentStreamEvent, UsageReport};
use tracing::debug;

use crate::models::chat::Citation;

/// Progress shown while the retrieval tool runs
pub const SEARCHING_PROGRESS: &str = "Searching documents...";
/// Progress shown once retrieval finished and the answer is being written
pub const GENERATING_PROGRESS: &str = "Generating answer...";
/// Protocol error for streams that close without a terminal event
pub const INCOMPLETE_STREAM_ERROR: &str = "stream ended before completion";

/// One change to the in-flight turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnTransition {
    /// Progress line changed; content untouched
    Progress(String),
    /// Full answer text after this event
    ContentUpdated(String),
    /// Authoritative citation list
    CitationsReplaced(Vec<Citation>),
    /// Informational token usage
    UsageReported(UsageReport),
    /// The turn finished successfully
    Completed {
        content: String,
        citations: Vec<Citation>,
        session_id: Option<String>,
        processing_time_ms: Option<f64>,
    },
    /// The turn failed with an agent-reported or protocol error
    Failed { error: String },
}

impl TurnTransition {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Per-turn stream state machine.
#[derive(Debug)]
pub struct StreamEventConsumer {
    retrieval_tool: String,
    content: String,
    citations: Vec<Citation>,
    finished: bool,
    events_seen: usize,
}

impl StreamEventConsumer {
    pub fn new(retrieval_tool: impl Into<String>) -> Self {
        Self {
            retrieval_tool: retrieval_tool.into(),
            content: String::new(),
            citations: Vec::new(),
            finished: false,
            events_seen: 0,
        }
    }

    /// Fold one event. Returns `None` for events with no visible effect and
    /// for anything delivered after the turn finished.
    pub fn consume(&mut self, event: AgentStreamEvent) -> Option<TurnTransition> {
        if self.finished {
            debug!(
                "[StreamEventConsumer] dropping {} event after terminal event",
                event.kind()
            );
            return None;
        }
        self.events_seen += 1;

        match event {
            AgentStreamEvent::Status { message } => Some(TurnTransition::Progress(message)),
            AgentStreamEvent::ToolStart { tool_name } => {
                if tool_name == self.retrieval_tool {
                    Some(TurnTransition::Progress(SEARCHING_PROGRESS.to_string()))
                } else {
                    Some(TurnTransition::Progress(format!("Running {}...", tool_name)))
                }
            }
            AgentStreamEvent::ToolEnd { tool_name } => (tool_name == self.retrieval_tool)
                .then(|| TurnTransition::Progress(GENERATING_PROGRESS.to_string())),
            AgentStreamEvent::Token { token, accumulated } => {
                match accumulated {
                    Some(full) => self.content = full,
                    None => self.content.push_str(&token),
                }
                Some(TurnTransition::ContentUpdated(self.content.clone()))
            }
            AgentStreamEvent::Citations { citations } => {
                self.citations = citations.into_iter().map(Citation::from).collect();
                Some(TurnTransition::CitationsReplaced(self.citations.clone()))
            }
            AgentStreamEvent::Usage(report) => Some(TurnTransition::UsageReported(report)),
            AgentStreamEvent::Done {
                session_id,
                processing_time_ms,
            } => {
                self.finished = true;
                Some(TurnTransition::Completed {
                    content: self.content.clone(),
                    citations: self.citations.clone(),
                    session_id: session_id.filter(|id| !id.is_empty()),
                    processing_time_ms,
                })
            }
            AgentStreamEvent::Error { error } => {
                self.finished = true;
                let error = if error.trim().is_empty() {
                    "agent reported an error".to_string()
                } else {
                    error
                };
                Some(TurnTransition::Failed { error })
            }
            AgentStreamEvent::Unknown => {
                debug!("[StreamEventConsumer] skipping unknown event");
                None
            }
        }
    }

    /// The transport closed. Yields a protocol failure unless a terminal
    /// event was already seen.
    pub fn finish(&mut self) -> Option<TurnTransition> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(TurnTransition::Failed {
            error: INCOMPLETE_STREAM_ERROR.to_string(),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn events_seen(&self) -> usize {
        self.events_seen
    }
}
