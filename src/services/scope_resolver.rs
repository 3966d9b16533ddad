//! Scope Resolver
//!
//! Turns a query scope plus the documents attached to the chat into the
//! concrete filters sent to the agent.

use doc_chat_agent::FileFilter;

use crate::models::scope::{AttachedDocument, EffectiveFilter, ScopeFilter, ScopeTarget};
use crate::utils::error::{AppError, AppResult};

/// Stateless scope resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeResolver;

impl ScopeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Reject scopes that cannot produce a meaningful request.
    pub fn validate(&self, scope: &ScopeFilter) -> AppResult<()> {
        if scope.max_sources == 0 {
            return Err(AppError::scope("max_sources must be at least 1"));
        }

        match &scope.target {
            ScopeTarget::Organization => Ok(()),
            ScopeTarget::Folder { folder_name } => {
                if folder_name.trim().is_empty() {
                    Err(AppError::scope("folder scope requires a folder name"))
                } else {
                    Ok(())
                }
            }
            ScopeTarget::DocumentSet { file_names, .. } => {
                if file_names.is_empty() {
                    return Err(AppError::scope("document set scope requires at least one file"));
                }
                if file_names.iter().any(|name| name.trim().is_empty()) {
                    return Err(AppError::scope("document set contains an empty file name"));
                }
                Ok(())
            }
        }
    }

    /// Resolve the effective filter for a query.
    ///
    /// Explicit document sets win. Otherwise the attached documents narrow the
    /// search by file name. A folder filter is only produced for folder scope,
    /// whatever folder metadata the documents carry.
    pub fn resolve(
        &self,
        scope: &ScopeFilter,
        attached: &[AttachedDocument],
        session_hint: Option<&str>,
    ) -> EffectiveFilter {
        let mut filter = EffectiveFilter::unfiltered(scope.max_sources);

        match &scope.target {
            ScopeTarget::DocumentSet {
                file_names,
                folder_hint,
            } => {
                filter.file_filter = FileFilter::from_names(file_names.clone());
                filter.cache_hint = folder_hint.clone();
            }
            ScopeTarget::Folder { folder_name } => {
                filter.folder_filter = Some(folder_name.clone());
                filter.file_filter = Self::attached_filter(attached);
            }
            ScopeTarget::Organization => {
                filter.file_filter = Self::attached_filter(attached);
            }
        }

        if filter.cache_hint.is_none() {
            filter.cache_hint = session_hint.map(str::to_string);
        }

        filter
    }

    fn attached_filter(attached: &[AttachedDocument]) -> Option<FileFilter> {
        FileFilter::from_names(attached.iter().map(|doc| doc.name.clone()).collect())
    }
}
