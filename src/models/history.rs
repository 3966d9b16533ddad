//! History Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::Citation;
use super::scope::EffectiveFilter;

/// A completed query/response pair. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query: String,
    pub response: String,
    pub citations: Vec<Citation>,
    pub filters: EffectiveFilter,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        citations: Vec<Citation>,
        filters: EffectiveFilter,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            response: response.into(),
            citations,
            filters,
            timestamp: Utc::now(),
        }
    }
}
