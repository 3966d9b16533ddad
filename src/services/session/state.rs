//! Controller State
//!
//! Everything the controller and its current turn share behind one lock.

use doc_chat_core::UsageReport;
use tokio_util::sync::CancellationToken;

use crate::models::chat::{ChatSession, Message, SessionStatus};
use crate::models::scope::{AttachedDocument, ScopeFilter};

/// Content left in a placeholder whose turn was cancelled
pub const CANCELLED_NOTICE: &str = "Response cancelled.";

/// Change notification for observers of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// The session was opened, restored or cleared
    Reset,
    StatusChanged(SessionStatus),
    /// A message was appended or changed
    MessageUpdated(Message),
    /// A message was removed from the log (retry)
    MessageRemoved(String),
    Progress(Option<String>),
    /// A turn reached its final state
    TurnFinished {
        message_id: String,
        status: SessionStatus,
    },
}

/// The query a retry re-issues.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LastQuery {
    pub query: String,
    pub scope: ScopeFilter,
}

/// Bookkeeping for the turn in flight.
#[derive(Debug)]
pub(crate) struct ActiveTurn {
    pub generation: u64,
    pub message_id: String,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub(crate) struct ControllerState {
    pub session: ChatSession,
    pub open: bool,
    pub documents: Vec<AttachedDocument>,
    pub folder_hint: Option<String>,
    pub progress: Option<String>,
    pub usage: Option<UsageReport>,
    pub last_query: Option<LastQuery>,
    /// Bumped whenever a turn starts or is superseded
    pub generation: u64,
    pub active: Option<ActiveTurn>,
}

impl ControllerState {
    pub fn new(scope: ScopeFilter) -> Self {
        Self {
            session: ChatSession::new(scope),
            open: false,
            documents: Vec::new(),
            folder_hint: None,
            progress: None,
            usage: None,
            last_query: None,
            generation: 0,
            active: None,
        }
    }

    /// Whether updates from `generation` may still be applied.
    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|turn| turn.generation == generation && !turn.cancel.is_cancelled())
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.session.messages.iter_mut().rev().find(|m| m.id == id)
    }

    /// Stop the in-flight turn. With `notice`, its placeholder is finalized
    /// with a cancellation notice; otherwise it is left for the caller to
    /// discard. Returns the finalized placeholder, if any.
    pub fn cancel_active(&mut self, notice: bool) -> Option<Message> {
        let turn = self.active.take()?;
        turn.cancel.cancel();
        self.generation += 1;
        self.progress = None;
        self.session.status = SessionStatus::Idle;

        if !notice {
            return None;
        }
        let message = self.message_mut(&turn.message_id)?;
        message.content = CANCELLED_NOTICE.to_string();
        message.citations.clear();
        message.in_flight = false;
        Some(message.clone())
    }

    /// Reset the conversation for a newly opened chat.
    pub fn reset(
        &mut self,
        scope: ScopeFilter,
        documents: Vec<AttachedDocument>,
        folder_hint: Option<String>,
    ) {
        self.cancel_active(false);
        self.session = ChatSession::new(scope);
        self.open = true;
        self.documents = documents;
        self.folder_hint = folder_hint;
        self.usage = None;
        self.last_query = None;
    }
}
