//! Doc Chat - Document Chat Session Controller
//!
//! Client-side controller for conversational chat over an organization's
//! documents, backed by a remote retrieval-augmented agent.
//! It includes:
//! - The session controller (send, retry, cancel, open/close/clear)
//! - Stream consumption and confidence scoring
//! - Scope resolution and query history
//! - Storage layer (JSON config)
//! - Data models and utilities

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export the agent-side types callers need
pub use doc_chat_agent::{
    AgentClient, AgentConfig, AgentError, ChatRequest, FileFilter, RagAgentClient, SearchMode,
};
pub use doc_chat_core::{AgentStreamEvent, CitationPayload};

pub use models::chat::{ChatSession, Citation, Message, MessageMetadata, MessageRole, SessionStatus};
pub use models::history::HistoryEntry;
pub use models::scope::{
    AttachedDocument, EffectiveFilter, ScopeFilter, ScopeTarget, SessionSnapshot,
};
pub use models::settings::{ChatConfig, ChatSettingsUpdate};
pub use services::{
    ConfidenceAggregator, FolderDirectory, HistoryManager, OrganizationDirectory, ScopeResolver,
    SessionController, SessionUpdate, StaticDirectory, StreamEventConsumer, TurnHandle,
    TurnOutcome, TurnTransition,
};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
