//! Pipeline configuration.
//!
//! Every tunable the pipeline depends on lives here so tests and
//! embedders can inject their own values. Defaults mirror the behavior
//! the extraction heuristics were tuned against.

use std::time::Duration;

use serde::Serialize;

/// Tunables for the whole analysis pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Two fields whose y-centroids differ by at most this many pixels
    /// sort as the same row.
    pub same_row_tolerance_px: f32,
    /// Band height when grouping sorted fields into reading-order lines.
    pub line_band_tolerance_px: f32,
    /// Inclusive token-set similarity threshold (0–100) for accepting a
    /// fuzzy vocabulary match.
    pub fuzzy_threshold: f64,
    /// Age after which the vocabulary snapshot is reloaded in full.
    pub vocabulary_ttl: Duration,
    /// Age after which the safety-embedding index is reloaded in full.
    pub safety_index_ttl: Duration,
    /// Lifetime of per-name enrichment cache entries.
    pub enrichment_ttl: Duration,
    /// How many safety-index neighbours to retrieve per unresolved name.
    pub retriever_top_k: usize,
    /// Minimum cosine similarity for a retriever hit.
    pub retriever_threshold: f32,
    /// Higher bar a hit must clear before its details are quoted as
    /// safety context in the generative prompt.
    pub context_confidence: f32,
    /// Unresolved names per generative-service call.
    pub llm_batch_size: usize,
    /// Per-call deadline for the generative text service.
    pub llm_timeout: Duration,
    /// Per-call deadline for the embedding service.
    pub embed_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            same_row_tolerance_px: 6.0,
            line_band_tolerance_px: 8.0,
            fuzzy_threshold: 75.0,
            vocabulary_ttl: Duration::from_secs(60 * 60),
            safety_index_ttl: Duration::from_secs(60 * 60),
            enrichment_ttl: Duration::from_secs(30 * 60),
            retriever_top_k: 2,
            retriever_threshold: 0.5,
            context_confidence: 0.6,
            llm_batch_size: 10,
            llm_timeout: Duration::from_secs(20),
            embed_timeout: Duration::from_secs(10),
        }
    }
}
