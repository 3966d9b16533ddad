//! Directory Collaborators
//!
//! Lookups the controller needs from the surrounding platform: the display
//! name of an organization and the name of a folder.

use std::collections::HashMap;

/// Resolves organization identifiers to the name the agent indexes under.
pub trait OrganizationDirectory: Send + Sync {
    fn organization_name(&self, org_id: &str) -> Option<String>;
}

/// Resolves folder identifiers to folder names.
pub trait FolderDirectory: Send + Sync {
    fn folder_name(&self, org_id: &str, folder_id: &str) -> Option<String>;
}

/// In-memory directory backed by hash maps.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    organizations: HashMap<String, String>,
    folders: HashMap<(String, String), String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(mut self, org_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.organizations.insert(org_id.into(), name.into());
        self
    }

    pub fn with_folder(
        mut self,
        org_id: impl Into<String>,
        folder_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.folders
            .insert((org_id.into(), folder_id.into()), name.into());
        self
    }
}

impl OrganizationDirectory for StaticDirectory {
    fn organization_name(&self, org_id: &str) -> Option<String> {
        self.organizations.get(org_id).cloned()
    }
}

impl FolderDirectory for StaticDirectory {
    fn folder_name(&self, org_id: &str, folder_id: &str) -> Option<String> {
        self.folders
            .get(&(org_id.to_string(), folder_id.to_string()))
            .cloned()
    }
}
