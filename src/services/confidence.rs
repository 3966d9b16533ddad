//! Confidence Aggregator

use crate::models::chat::Citation;

/// Score used when the agent returned citations but scored none of them
pub const UNSCORED_CONFIDENCE: f64 = 0.8;

/// Derives an answer confidence from its citations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceAggregator;

impl ConfidenceAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Mean relevance of the citations, in `[0, 1]`.
    pub fn score(&self, citations: &[Citation]) -> f64 {
        if citations.is_empty() {
            return 0.0;
        }

        let mean =
            citations.iter().map(|c| c.relevance_score).sum::<f64>() / citations.len() as f64;
        if mean == 0.0 {
            return UNSCORED_CONFIDENCE;
        }
        if mean.is_nan() {
            return 0.0;
        }
        mean.clamp(0.0, 1.0)
    }
}
