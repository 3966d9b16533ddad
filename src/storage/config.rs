//! JSON Configuration Management
//!
//! Handles reading and writing the chat configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::models::settings::{ChatConfig, ChatSettingsUpdate};
use crate::utils::error::AppResult;
use crate::utils::paths::{config_path, ensure_dir, ensure_doc_chat_dir};

/// Configuration service for managing chat settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: ChatConfig,
}

impl ConfigService {
    /// Create a config service backed by `~/.doc-chat/config.json`, loading
    /// the existing file or writing defaults
    pub fn new() -> AppResult<Self> {
        ensure_doc_chat_dir()?;
        Self::open(config_path()?)
    }

    /// Create a config service backed by an arbitrary file
    pub fn open(config_path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = config_path.into();
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = ChatConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            info!(
                "[ConfigService] wrote default configuration to {}",
                config_path.display()
            );
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<ChatConfig> {
        let content = fs::read_to_string(path)?;
        let config: ChatConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &ChatConfig) -> AppResult<()> {
        config.validate()?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &ChatConfig {
        &self.config
    }

    /// Get a clone of the current configuration
    pub fn get_config_clone(&self) -> ChatConfig {
        self.config.clone()
    }

    /// Update the configuration with a partial update.
    ///
    /// The update is validated before anything is written; an invalid update
    /// leaves both memory and disk untouched.
    pub fn update_config(&mut self, update: ChatSettingsUpdate) -> AppResult<ChatConfig> {
        let mut next = self.config.clone();
        next.apply_update(update);
        Self::save_to_file(&self.config_path, &next)?;
        self.config = next;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        let api_key = self.config.agent.api_key.take();
        self.config = Self::load_from_file(&self.config_path)?;
        // The API key is never written to disk
        self.config.agent.api_key = api_key;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = ChatConfig::default();
        self.save()
    }

    /// Check if the config service is healthy
    pub fn is_healthy(&self) -> bool {
        self.config_path.exists() && self.config.validate().is_ok()
    }
}
