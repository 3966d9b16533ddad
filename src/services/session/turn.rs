//! Turn Execution
//!
//! A turn runs as its own task: a transport task feeds agent events into an
//! mpsc channel, and the turn task folds them through the consumer and applies
//! each transition to the shared state.

use std::sync::Arc;

use doc_chat_agent::{AgentClient, AgentError, AgentResult, ChatRequest};
use doc_chat_core::AgentStreamEvent;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::chat::{Message, MessageMetadata, SessionStatus};
use crate::models::history::HistoryEntry;
use crate::models::scope::EffectiveFilter;
use crate::services::confidence::ConfidenceAggregator;
use crate::services::history::HistoryManager;
use crate::services::streaming::{StreamEventConsumer, TurnTransition};
use crate::utils::error::{AppError, AppResult};

use super::state::{ControllerState, SessionUpdate};

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The answer was finalized
    Completed(Message),
    /// The turn failed; the placeholder now carries the error text
    Failed(AppError),
    /// The turn was cancelled or superseded
    Cancelled,
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed(_))
    }
}

/// Handle to a running turn. Dropping it does not stop the turn.
#[derive(Debug)]
pub struct TurnHandle {
    message_id: String,
    join: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    pub(crate) fn new(message_id: String, join: JoinHandle<TurnOutcome>) -> Self {
        Self { message_id, join }
    }

    /// Id of the assistant message this turn writes to
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the turn to end.
    pub async fn wait(self) -> AppResult<TurnOutcome> {
        self.join
            .await
            .map_err(|e| AppError::internal(format!("Turn task failed: {}", e)))
    }
}

/// Text shown in place of the answer when a turn fails.
pub fn failure_text(error: &AppError) -> String {
    let detail = match error {
        AppError::Transport(msg) | AppError::Protocol(msg) => msg.clone(),
        other => other.to_string(),
    };
    format!("Error: {}", detail)
}

enum Step {
    Continue,
    Stale,
    Finished(TurnOutcome),
}

/// Everything one turn needs, detached from the controller.
pub(crate) struct TurnRunner {
    pub agent: Arc<dyn AgentClient>,
    pub state: Arc<RwLock<ControllerState>>,
    pub history: Arc<RwLock<HistoryManager>>,
    pub updates: broadcast::Sender<SessionUpdate>,
    pub request: ChatRequest,
    pub filter: EffectiveFilter,
    pub generation: u64,
    pub message_id: String,
    pub cancel: CancellationToken,
    pub streaming_enabled: bool,
    pub retrieval_tool: String,
    pub search_strategy: String,
    pub event_buffer: usize,
}

impl TurnRunner {
    pub fn spawn(self) -> TurnHandle {
        let message_id = self.message_id.clone();
        TurnHandle::new(message_id, tokio::spawn(self.run()))
    }

    async fn run(self) -> TurnOutcome {
        let (tx, mut rx) = mpsc::channel::<AgentStreamEvent>(self.event_buffer.max(1));
        let transport = tokio::spawn(transport(
            self.agent.clone(),
            self.request.clone(),
            self.streaming_enabled,
            tx,
            self.cancel.clone(),
        ));
        let mut consumer = StreamEventConsumer::new(self.retrieval_tool.clone());

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    transport.abort();
                    debug!("[TurnRunner] turn {} cancelled", self.generation);
                    return TurnOutcome::Cancelled;
                }
                event = rx.recv() => event,
            };
            let Some(event) = event else { break };

            debug!("[TurnRunner] received {} event", event.kind());
            let transition = consumer.consume(event);
            match self.apply(transition, consumer.events_seen()).await {
                Step::Continue => {}
                Step::Stale => {
                    transport.abort();
                    return TurnOutcome::Cancelled;
                }
                Step::Finished(outcome) => {
                    transport.abort();
                    return outcome;
                }
            }
        }

        // Channel closed: the transport has finished
        let result = match transport.await {
            Ok(result) => result,
            Err(e) => Err(AgentError::Other {
                message: format!("transport task failed: {}", e),
            }),
        };

        let error = match result {
            Err(AgentError::Cancelled) if self.cancel.is_cancelled() => {
                return TurnOutcome::Cancelled;
            }
            Err(e) => {
                warn!("[TurnRunner] transport failed: {}", e);
                AppError::from(e)
            }
            Ok(()) => match consumer.finish() {
                Some(TurnTransition::Failed { error }) => AppError::protocol(error),
                _ => return TurnOutcome::Cancelled,
            },
        };
        self.fail(error).await
    }

    /// Apply one event's transition under a single write lock.
    async fn apply(&self, transition: Option<TurnTransition>, events_seen: usize) -> Step {
        let mut updates = Vec::new();
        let mut state = self.state.write().await;
        if !state.is_current(self.generation) {
            return Step::Stale;
        }

        if state.session.status == SessionStatus::Sending {
            state.session.status = SessionStatus::Streaming;
            updates.push(SessionUpdate::StatusChanged(SessionStatus::Streaming));
        }

        let Some(transition) = transition else {
            drop(state);
            self.broadcast(updates);
            return Step::Continue;
        };

        match transition {
            TurnTransition::Progress(progress) => {
                state.progress = Some(progress.clone());
                updates.push(SessionUpdate::Progress(Some(progress)));
            }
            TurnTransition::ContentUpdated(content) => {
                if let Some(message) = state.message_mut(&self.message_id) {
                    message.content = content;
                    updates.push(SessionUpdate::MessageUpdated(message.clone()));
                }
            }
            TurnTransition::CitationsReplaced(citations) => {
                if let Some(message) = state.message_mut(&self.message_id) {
                    message.citations = citations;
                    updates.push(SessionUpdate::MessageUpdated(message.clone()));
                }
            }
            TurnTransition::UsageReported(report) => {
                debug!("[TurnRunner] usage: {:?}", report);
                state.usage = Some(report);
            }
            TurnTransition::Completed {
                content,
                citations,
                session_id,
                processing_time_ms,
            } => {
                let metadata = MessageMetadata {
                    processing_time_seconds: processing_time_ms.map(|ms| ms / 1000.0),
                    confidence_score: ConfidenceAggregator::new().score(&citations),
                    sources_count: citations.len(),
                    search_strategy: self.search_strategy.clone(),
                };

                let Some(message) = state.message_mut(&self.message_id) else {
                    return Step::Stale;
                };
                message.content = content;
                message.citations = citations;
                message.metadata = Some(metadata);
                message.in_flight = false;
                let finalized = message.clone();

                if let Some(id) = session_id {
                    state.session.session_id = Some(id);
                }
                state.session.status = SessionStatus::Idle;
                state.progress = None;
                state.active = None;
                drop(state);

                info!(
                    "[TurnRunner] turn {} completed with {} citation(s) after {} event(s)",
                    self.generation,
                    finalized.citations.len(),
                    events_seen
                );
                self.history.write().await.add_entry(HistoryEntry::new(
                    self.request.query.clone(),
                    finalized.content.clone(),
                    finalized.citations.clone(),
                    self.filter.clone(),
                ));

                updates.push(SessionUpdate::MessageUpdated(finalized.clone()));
                updates.push(SessionUpdate::Progress(None));
                updates.push(SessionUpdate::StatusChanged(SessionStatus::Idle));
                updates.push(SessionUpdate::TurnFinished {
                    message_id: self.message_id.clone(),
                    status: SessionStatus::Idle,
                });
                self.broadcast(updates);
                return Step::Finished(TurnOutcome::Completed(finalized));
            }
            TurnTransition::Failed { error } => {
                let error = AppError::protocol(error);
                Self::fail_locked(&mut state, &self.message_id, &error, &mut updates);
                drop(state);
                self.broadcast(updates);
                return Step::Finished(TurnOutcome::Failed(error));
            }
        }

        drop(state);
        self.broadcast(updates);
        Step::Continue
    }

    async fn fail(&self, error: AppError) -> TurnOutcome {
        let mut updates = Vec::new();
        {
            let mut state = self.state.write().await;
            if !state.is_current(self.generation) {
                return TurnOutcome::Cancelled;
            }
            Self::fail_locked(&mut state, &self.message_id, &error, &mut updates);
        }
        self.broadcast(updates);
        TurnOutcome::Failed(error)
    }

    fn fail_locked(
        state: &mut ControllerState,
        message_id: &str,
        error: &AppError,
        updates: &mut Vec<SessionUpdate>,
    ) {
        warn!("[TurnRunner] turn failed: {}", error);
        if let Some(message) = state.message_mut(message_id) {
            message.content = failure_text(error);
            message.citations.clear();
            message.in_flight = false;
            message.is_error = true;
            updates.push(SessionUpdate::MessageUpdated(message.clone()));
        }
        state.session.status = SessionStatus::Error;
        state.progress = None;
        state.active = None;
        updates.push(SessionUpdate::Progress(None));
        updates.push(SessionUpdate::StatusChanged(SessionStatus::Error));
        updates.push(SessionUpdate::TurnFinished {
            message_id: message_id.to_string(),
            status: SessionStatus::Error,
        });
    }

    fn broadcast(&self, updates: Vec<SessionUpdate>) {
        for update in updates {
            // No subscribers is fine
            let _ = self.updates.send(update);
        }
    }
}

/// Deliver the agent's events for `request` into `tx`, falling back to the
/// non-streaming endpoint when streaming is disabled or unsupported.
pub(crate) async fn transport(
    agent: Arc<dyn AgentClient>,
    request: ChatRequest,
    streaming_enabled: bool,
    tx: mpsc::Sender<AgentStreamEvent>,
    cancel: CancellationToken,
) -> AgentResult<()> {
    if streaming_enabled {
        match agent
            .stream_chat(request.clone(), tx.clone(), cancel.clone())
            .await
        {
            Err(AgentError::StreamingUnavailable { message }) => {
                info!(
                    "[TurnRunner] {} streaming unavailable ({}), using query endpoint",
                    agent.name(),
                    message
                );
            }
            other => return other,
        }
    }

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AgentError::Cancelled),
        response = agent.query(request) => response?,
    };

    for event in response.into_events() {
        if tx.send(event).await.is_err() {
            return Err(AgentError::Cancelled);
        }
    }
    Ok(())
}
