//! Services
//!
//! Business logic of the document chat: scope resolution, stream
//! consumption, confidence scoring, history and the session controller.

pub mod confidence;
pub mod directory;
pub mod history;
pub mod scope_resolver;
pub mod session;
pub mod streaming;

pub use confidence::ConfidenceAggregator;
pub use directory::{FolderDirectory, OrganizationDirectory, StaticDirectory};
pub use history::HistoryManager;
pub use scope_resolver::ScopeResolver;
pub use session::{SessionController, SessionUpdate, TurnHandle, TurnOutcome};
pub use streaming::{StreamEventConsumer, TurnTransition};
