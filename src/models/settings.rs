//! Settings Models
//!
//! Chat configuration and settings data structures.

use doc_chat_agent::{AgentConfig, SearchMode};
use doc_chat_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

use super::scope::DEFAULT_MAX_SOURCES;

/// Chat configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Remote agent connection settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Organization the chat queries on behalf of
    #[serde(default)]
    pub organization_id: Option<String>,
    /// `max_sources` used when a scope does not set one
    #[serde(default = "default_max_sources")]
    pub default_max_sources: u32,
    /// Retrieval strategy requested from the agent
    #[serde(default)]
    pub search_mode: SearchMode,
    /// Ask the agent to emit tool_start/tool_end events
    #[serde(default = "default_true")]
    pub include_tool_events: bool,
    /// Use the streaming endpoint; when false every turn uses the query endpoint
    #[serde(default = "default_true")]
    pub streaming_enabled: bool,
    /// Tool name the agent uses for document retrieval
    #[serde(default = "default_retrieval_tool_name")]
    pub retrieval_tool_name: String,
    /// Capacity of the per-turn event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_sources() -> u32 {
    DEFAULT_MAX_SOURCES
}

fn default_true() -> bool {
    true
}

fn default_retrieval_tool_name() -> String {
    "search_documents".to_string()
}

fn default_event_buffer() -> usize {
    64
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            organization_id: None,
            default_max_sources: default_max_sources(),
            search_mode: SearchMode::default(),
            include_tool_events: true,
            streaming_enabled: true,
            retrieval_tool_name: default_retrieval_tool_name(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatSettingsUpdate {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub proxy_url: Option<String>,
    pub organization_id: Option<String>,
    pub default_max_sources: Option<u32>,
    pub search_mode: Option<SearchMode>,
    pub include_tool_events: Option<bool>,
    pub streaming_enabled: Option<bool>,
    pub retrieval_tool_name: Option<String>,
    pub event_buffer: Option<usize>,
}

impl ChatConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: ChatSettingsUpdate) {
        if let Some(base_url) = update.base_url {
            self.agent.base_url = base_url;
        }
        if let Some(api_key) = update.api_key {
            self.agent.api_key = Some(api_key).filter(|k| !k.is_empty());
        }
        if let Some(proxy_url) = update.proxy_url {
            self.agent.proxy_url = Some(proxy_url).filter(|p| !p.is_empty());
        }
        if let Some(organization_id) = update.organization_id {
            self.organization_id = Some(organization_id).filter(|o| !o.is_empty());
        }
        if let Some(max) = update.default_max_sources {
            self.default_max_sources = max;
        }
        if let Some(mode) = update.search_mode {
            self.search_mode = mode;
        }
        if let Some(enabled) = update.include_tool_events {
            self.include_tool_events = enabled;
        }
        if let Some(enabled) = update.streaming_enabled {
            self.streaming_enabled = enabled;
        }
        if let Some(name) = update.retrieval_tool_name {
            self.retrieval_tool_name = name;
        }
        if let Some(buffer) = update.event_buffer {
            self.event_buffer = buffer;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        let base_url = self.agent.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CoreError::validation(format!(
                "Invalid agent base_url: {}. Must start with http:// or https://",
                self.agent.base_url
            )));
        }

        for (name, path) in [
            ("stream_path", &self.agent.stream_path),
            ("query_path", &self.agent.query_path),
            ("health_path", &self.agent.health_path),
        ] {
            if path.trim().is_empty() {
                return Err(CoreError::validation(format!("{} cannot be empty", name)));
            }
        }

        if self.default_max_sources == 0 {
            return Err(CoreError::validation("default_max_sources must be at least 1"));
        }

        if self.retrieval_tool_name.trim().is_empty() {
            return Err(CoreError::validation("retrieval_tool_name cannot be empty"));
        }

        if self.event_buffer == 0 {
            return Err(CoreError::validation("event_buffer must be at least 1"));
        }

        Ok(())
    }
}
