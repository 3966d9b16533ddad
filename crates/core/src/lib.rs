//! Doc Chat Core
//!
//! Foundational error types and wire-level stream event definitions for the
//! document chat workspace. This crate has no dependency on HTTP, async
//! runtimes or session state.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `streaming` - Agent stream event types, citation payloads and the adapter trait
//!
//! ## Design Principles
//!
//! 1. **Only serde/thiserror** - keeps build times minimal
//! 2. **Trait-based abstractions** - adapters can be swapped or mocked in tests
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, AgentStreamEvent, CitationPayload, StreamAdapter, UsageReport};
