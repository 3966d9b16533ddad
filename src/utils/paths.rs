//! Path Utilities
//!
//! Resolves the doc chat configuration directory (~/.doc-chat/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the doc chat directory (~/.doc-chat/)
pub fn doc_chat_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".doc-chat"))
}

/// Get the config file path (~/.doc-chat/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(doc_chat_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the doc chat directory, creating if it doesn't exist
pub fn ensure_doc_chat_dir() -> AppResult<PathBuf> {
    let path = doc_chat_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
