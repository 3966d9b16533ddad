//! Scope Models
//!
//! What a query searches over, and the concrete filters it resolves to.

use doc_chat_agent::FileFilter;
use serde::{Deserialize, Serialize};

/// Fallback for `max_sources` when nothing else is configured
pub const DEFAULT_MAX_SOURCES: u32 = 10;

/// Search target of a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScopeTarget {
    /// Everything the organization owns
    Organization,
    /// One folder
    Folder { folder_name: String },
    /// An explicit set of files. `folder_hint` only scopes caches.
    DocumentSet {
        file_names: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        folder_hint: Option<String>,
    },
}

/// Scope of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub target: ScopeTarget,
    pub max_sources: u32,
}

impl ScopeFilter {
    pub fn organization(max_sources: u32) -> Self {
        Self {
            target: ScopeTarget::Organization,
            max_sources,
        }
    }

    pub fn folder(folder_name: impl Into<String>, max_sources: u32) -> Self {
        Self {
            target: ScopeTarget::Folder {
                folder_name: folder_name.into(),
            },
            max_sources,
        }
    }

    pub fn documents(file_names: Vec<String>, max_sources: u32) -> Self {
        Self {
            target: ScopeTarget::DocumentSet {
                file_names,
                folder_hint: None,
            },
            max_sources,
        }
    }

    /// Attach a cache hint to a document-set scope. Other targets are unchanged.
    pub fn with_folder_hint(mut self, hint: impl Into<String>) -> Self {
        if let ScopeTarget::DocumentSet { folder_hint, .. } = &mut self.target {
            *folder_hint = Some(hint.into());
        }
        self
    }
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self::organization(DEFAULT_MAX_SOURCES)
    }
}

/// A document attached to the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
}

impl AttachedDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder_id: None,
            folder_name: None,
        }
    }

    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_folder_name(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = Some(folder_name.into());
        self
    }
}

/// Concrete filter values for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_filter: Option<FileFilter>,
    pub max_sources: u32,
    /// Folder used to scope client-side caches; never sent to the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_hint: Option<String>,
}

impl EffectiveFilter {
    /// Unfiltered organization-wide search
    pub fn unfiltered(max_sources: u32) -> Self {
        Self {
            folder_filter: None,
            file_filter: None,
            max_sources,
            cache_hint: None,
        }
    }
}

/// Caller-held state used to reconstruct a chat after a reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub documents: Vec<AttachedDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
}
