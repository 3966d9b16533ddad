//! Session Controller
//!
//! Owns the chat session: the message log, the agent-assigned session id and
//! the turn in flight. All mutations go through one `RwLock`, shared with the
//! task of the current turn.

use std::sync::Arc;

use doc_chat_agent::{AgentClient, ChatRequest, RagAgentClient};
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::models::chat::{ChatSession, Message, MessageRole, SessionStatus};
use crate::models::history::HistoryEntry;
use crate::models::scope::{AttachedDocument, EffectiveFilter, ScopeFilter, SessionSnapshot};
use crate::models::settings::ChatConfig;
use crate::services::directory::{FolderDirectory, OrganizationDirectory};
use crate::services::history::HistoryManager;
use crate::services::scope_resolver::ScopeResolver;
use crate::utils::error::{AppError, AppResult};

use super::state::{ActiveTurn, ControllerState, LastQuery, SessionUpdate};
use super::turn::{TurnHandle, TurnRunner};

/// Capacity of the update broadcast channel
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Drives one document chat.
#[derive(Clone)]
pub struct SessionController {
    agent: Arc<dyn AgentClient>,
    config: ChatConfig,
    organizations: Arc<dyn OrganizationDirectory>,
    folders: Arc<dyn FolderDirectory>,
    resolver: ScopeResolver,
    state: Arc<RwLock<ControllerState>>,
    history: Arc<RwLock<HistoryManager>>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionController {
    pub fn new(
        agent: Arc<dyn AgentClient>,
        config: ChatConfig,
        organizations: Arc<dyn OrganizationDirectory>,
        folders: Arc<dyn FolderDirectory>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let scope = Self::default_scope(&config);
        Self {
            agent,
            config,
            organizations,
            folders,
            resolver: ScopeResolver::new(),
            state: Arc::new(RwLock::new(ControllerState::new(scope))),
            history: Arc::new(RwLock::new(HistoryManager::new())),
            updates,
        }
    }

    /// Controller whose directories are served by one value.
    pub fn with_directory<D>(
        agent: Arc<dyn AgentClient>,
        config: ChatConfig,
        directory: Arc<D>,
    ) -> Self
    where
        D: OrganizationDirectory + FolderDirectory + 'static,
    {
        Self::new(agent, config, directory.clone(), directory)
    }

    /// Controller talking to the HTTP agent described by `config`.
    pub fn connect<D>(config: ChatConfig, directory: Arc<D>) -> AppResult<Self>
    where
        D: OrganizationDirectory + FolderDirectory + 'static,
    {
        config.validate()?;
        let agent = RagAgentClient::new(config.agent.clone())?;
        Ok(Self::with_directory(Arc::new(agent), config, directory))
    }

    fn default_scope(config: &ChatConfig) -> ScopeFilter {
        ScopeFilter::organization(config.default_max_sources)
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Receive change notifications for this session.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    fn broadcast(&self, updates: impl IntoIterator<Item = SessionUpdate>) {
        for update in updates {
            let _ = self.updates.send(update);
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Open a chat about one document.
    pub async fn open_single(&self, document: AttachedDocument) {
        let hint = self.derive_folder_hint(&document);
        self.open_with(vec![document], hint).await;
    }

    /// Open a chat about several documents. No folder hint is derived.
    pub async fn open_multi(&self, documents: Vec<AttachedDocument>) {
        self.open_with(documents, None).await;
    }

    /// Reconstruct a chat from caller-held state after a reload.
    pub async fn restore(&self, snapshot: SessionSnapshot) {
        self.open_with(snapshot.documents, snapshot.folder_name).await;
    }

    async fn open_with(&self, documents: Vec<AttachedDocument>, folder_hint: Option<String>) {
        info!(
            "[SessionController] opening chat with {} document(s)",
            documents.len()
        );
        self.state
            .write()
            .await
            .reset(Self::default_scope(&self.config), documents, folder_hint);
        self.broadcast([
            SessionUpdate::Reset,
            SessionUpdate::StatusChanged(SessionStatus::Idle),
        ]);
    }

    fn derive_folder_hint(&self, document: &AttachedDocument) -> Option<String> {
        if let Some(name) = document.folder_name.as_ref().filter(|n| !n.is_empty()) {
            return Some(name.clone());
        }
        let folder_id = document.folder_id.as_deref()?;
        let org_id = self.config.organization_id.as_deref()?;
        self.folders.folder_name(org_id, folder_id)
    }

    /// Close the chat. The log is kept; any turn in flight is cancelled.
    pub async fn close(&self) {
        let mut updates = Vec::new();
        {
            let mut state = self.state.write().await;
            if let Some(message) = state.cancel_active(true) {
                let message_id = message.id.clone();
                updates.push(SessionUpdate::MessageUpdated(message));
                updates.push(SessionUpdate::Progress(None));
                updates.push(SessionUpdate::StatusChanged(state.session.status));
                updates.push(SessionUpdate::TurnFinished {
                    message_id,
                    status: state.session.status,
                });
            }
            state.open = false;
            state.folder_hint = None;
        }
        info!("[SessionController] chat closed");
        self.broadcast(updates);
    }

    /// Empty the log and forget the session id. The chat stays open.
    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            state.cancel_active(false);
            state.session.messages.clear();
            state.session.session_id = None;
            state.session.status = SessionStatus::Idle;
            state.usage = None;
        }
        debug!("[SessionController] chat cleared");
        self.broadcast([
            SessionUpdate::Reset,
            SessionUpdate::StatusChanged(SessionStatus::Idle),
        ]);
    }

    /// Stop the turn in flight, if any. Its placeholder keeps a cancellation
    /// notice. Returns whether a turn was cancelled.
    pub async fn cancel(&self) -> bool {
        let cancelled = self.state.write().await.cancel_active(true);
        match cancelled {
            Some(message) => {
                info!("[SessionController] turn cancelled");
                let message_id = message.id.clone();
                self.broadcast([
                    SessionUpdate::MessageUpdated(message),
                    SessionUpdate::Progress(None),
                    SessionUpdate::StatusChanged(SessionStatus::Idle),
                    SessionUpdate::TurnFinished {
                        message_id,
                        status: SessionStatus::Idle,
                    },
                ]);
                true
            }
            None => false,
        }
    }

    /// Change the default scope of later queries.
    pub async fn set_scope(&self, scope: ScopeFilter) -> AppResult<()> {
        self.resolver.validate(&scope)?;
        self.state.write().await.session.scope = scope;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Turns
    // ------------------------------------------------------------------

    /// Send a query. `scope` overrides the session scope for this query only.
    pub async fn send(
        &self,
        query: impl Into<String>,
        scope: Option<ScopeFilter>,
    ) -> AppResult<TurnHandle> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(AppError::validation("Query cannot be empty"));
        }

        let state = self.state.write().await;
        Self::ensure_ready(&state)?;
        let scope = scope.unwrap_or_else(|| state.session.scope.clone());
        let (request, filter) = self.prepare(&state, &query, &scope)?;
        Ok(self.begin_turn(state, query, scope, request, filter, true))
    }

    /// Re-issue the last query with the same scope, replacing its answer.
    pub async fn retry(&self) -> AppResult<TurnHandle> {
        let mut state = self.state.write().await;
        let last = state.last_query.clone().ok_or(AppError::NoPriorQuery)?;
        Self::ensure_ready(&state)?;
        let (request, filter) = self.prepare(&state, &last.query, &last.scope)?;

        let mut updates = Vec::new();
        if state
            .session
            .messages
            .last()
            .is_some_and(|m| m.role == MessageRole::Assistant)
        {
            if let Some(removed) = state.session.messages.pop() {
                updates.push(SessionUpdate::MessageRemoved(removed.id));
            }
        }
        let reuse_user = state
            .session
            .messages
            .last()
            .is_some_and(|m| m.is_user() && m.content == last.query);
        self.broadcast(updates);

        info!("[SessionController] retrying last query");
        Ok(self.begin_turn(state, last.query, last.scope, request, filter, !reuse_user))
    }

    fn ensure_ready(state: &ControllerState) -> AppResult<()> {
        if !state.open {
            return Err(AppError::SessionClosed);
        }
        if state.session.status.is_busy() {
            return Err(AppError::SessionBusy);
        }
        Ok(())
    }

    /// Resolve organization and scope into a request. Nothing is mutated.
    fn prepare(
        &self,
        state: &ControllerState,
        query: &str,
        scope: &ScopeFilter,
    ) -> AppResult<(ChatRequest, EffectiveFilter)> {
        let org_id = self
            .config
            .organization_id
            .as_deref()
            .ok_or_else(|| AppError::config("No organization configured"))?;
        let organization_name = self
            .organizations
            .organization_name(org_id)
            .ok_or_else(|| AppError::config(format!("Unknown organization: {}", org_id)))?;

        self.resolver.validate(scope)?;
        let filter = self
            .resolver
            .resolve(scope, &state.documents, state.folder_hint.as_deref());

        let request = ChatRequest {
            query: query.to_string(),
            organization_name,
            session_id: state.session.session_id.clone(),
            folder_filter: filter.folder_filter.clone(),
            file_filter: filter.file_filter.clone(),
            search_mode: self.config.search_mode,
            max_sources: filter.max_sources,
            include_tool_events: self.config.include_tool_events,
        };
        Ok((request, filter))
    }

    fn begin_turn(
        &self,
        mut state: tokio::sync::RwLockWriteGuard<'_, ControllerState>,
        query: String,
        scope: ScopeFilter,
        request: ChatRequest,
        filter: EffectiveFilter,
        append_user: bool,
    ) -> TurnHandle {
        let mut updates = Vec::new();
        if append_user {
            let user = Message::user(query.clone());
            updates.push(SessionUpdate::MessageUpdated(user.clone()));
            state.session.messages.push(user);
        }
        let placeholder = Message::assistant_placeholder();
        let message_id = placeholder.id.clone();
        updates.push(SessionUpdate::MessageUpdated(placeholder.clone()));
        state.session.messages.push(placeholder);

        state.session.status = SessionStatus::Sending;
        state.progress = None;
        state.generation += 1;
        let generation = state.generation;
        let cancel = CancellationToken::new();
        state.active = Some(ActiveTurn {
            generation,
            message_id: message_id.clone(),
            cancel: cancel.clone(),
        });
        state.last_query = Some(LastQuery { query, scope });
        drop(state);

        updates.push(SessionUpdate::StatusChanged(SessionStatus::Sending));
        self.broadcast(updates);
        debug!(
            "[SessionController] starting turn {} via {}",
            generation,
            self.agent.name()
        );

        TurnRunner {
            agent: self.agent.clone(),
            state: self.state.clone(),
            history: self.history.clone(),
            updates: self.updates.clone(),
            request,
            filter,
            generation,
            message_id,
            cancel,
            streaming_enabled: self.config.streaming_enabled,
            retrieval_tool: self.config.retrieval_tool_name.clone(),
            search_strategy: self.config.search_mode.to_string(),
            event_buffer: self.config.event_buffer,
        }
        .spawn()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Copy of the current session.
    pub async fn snapshot(&self) -> ChatSession {
        self.state.read().await.session.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.session.messages.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.session.status
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.read().await.session.session_id.clone()
    }

    /// Progress line of the turn in flight.
    pub async fn progress(&self) -> Option<String> {
        self.state.read().await.progress.clone()
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.open
    }

    /// Folder used to scope caches for this chat.
    pub async fn cache_hint(&self) -> Option<String> {
        self.state.read().await.folder_hint.clone()
    }

    pub async fn documents(&self) -> Vec<AttachedDocument> {
        self.state.read().await.documents.clone()
    }

    pub async fn scope(&self) -> ScopeFilter {
        self.state.read().await.session.scope.clone()
    }

    /// Usage reported by the agent for the latest turn.
    pub async fn usage(&self) -> Option<doc_chat_core::UsageReport> {
        self.state.read().await.usage.clone()
    }

    /// Completed turns, most recent first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().await.entries().cloned().collect()
    }

    /// Replay a history entry as a standalone exchange.
    pub async fn view_history_entry(&self, id: &str) -> AppResult<Vec<Message>> {
        self.history
            .read()
            .await
            .view_entry(id)
            .ok_or_else(|| AppError::not_found(format!("History entry not found: {}", id)))
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }

    /// Check that the agent is reachable.
    pub async fn health_check(&self) -> AppResult<()> {
        self.agent.health_check().await?;
        debug!("[SessionController] {} agent is healthy", self.agent.name());
        Ok(())
    }
}
