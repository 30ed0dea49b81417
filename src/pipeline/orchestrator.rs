//! End-to-end label analysis.
//!
//! Ties the per-image stages (reconstruct, extract, tokenize, match)
//! to the shared enrichment cascade and risk bucketing. Per-image
//! pipelines run concurrently; their matched names merge in
//! first-occurrence order so every unique ingredient is enriched
//! exactly once per request, however many photos it spans.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::models::{normalize_name, EnrichedIngredient, RawOcrField};
use crate::pipeline::enrichment::{EnrichError, EnrichmentCascade};
use crate::pipeline::matching::{MatchError, VocabularyMatcher};
use crate::pipeline::risk::{aggregate, RiskBuckets};
use crate::pipeline::{extract, reconstruct, tokenize};

/// Errors that abort an analysis request. Everything else degrades.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The caller sent images with no OCR fields at all — a contract
    /// violation, distinct from a label that simply has no ingredients.
    #[error("No OCR fields supplied")]
    NoFields,
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Enrich(#[from] EnrichError),
}

/// What one image contributed, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ImageDiagnostics {
    /// All OCR fields in reading order, space-joined.
    pub full_text: String,
    /// Cleaned ingredients block; empty when no header was detected.
    pub ingredients_block: String,
    /// Candidate tokens the block produced.
    pub tokens: Vec<String>,
}

/// Complete analysis of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanAnalysis {
    /// Enriched records, one per unique matched ingredient, in
    /// first-occurrence order across images.
    pub ingredients: Vec<EnrichedIngredient>,
    pub risk: RiskBuckets,
    /// Per-image diagnostics, in input order.
    pub images: Vec<ImageDiagnostics>,
}

/// The analysis entry point.
pub struct Analyzer {
    matcher: Arc<VocabularyMatcher>,
    cascade: Arc<EnrichmentCascade>,
    config: PipelineConfig,
}

impl Analyzer {
    pub fn new(
        matcher: Arc<VocabularyMatcher>,
        cascade: Arc<EnrichmentCascade>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            matcher,
            cascade,
            config,
        }
    }

    /// Analyze one scan: one or more images' OCR fields.
    ///
    /// A label with no detectable ingredients section yields an empty
    /// (but well-formed) analysis; only a scan with zero OCR fields
    /// across all images is rejected.
    pub async fn analyze(&self, images: &[Vec<RawOcrField>]) -> Result<ScanAnalysis, AnalysisError> {
        if images.iter().all(|fields| fields.is_empty()) {
            return Err(AnalysisError::NoFields);
        }

        let per_image = join_all(images.iter().map(|fields| self.analyze_image(fields))).await;

        let mut diagnostics = Vec::with_capacity(per_image.len());
        let mut merged: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for outcome in per_image {
            let (diag, names) = outcome?;
            for name in names {
                if seen.insert(normalize_name(&name)) {
                    merged.push(name);
                }
            }
            diagnostics.push(diag);
        }

        tracing::debug!(
            images = images.len(),
            matched = merged.len(),
            "scan matched ingredient names"
        );

        let ingredients = self.cascade.enrich(&merged).await?;
        let risk = aggregate(&ingredients);

        Ok(ScanAnalysis {
            ingredients,
            risk,
            images: diagnostics,
        })
    }

    async fn analyze_image(
        &self,
        fields: &[RawOcrField],
    ) -> Result<(ImageDiagnostics, Vec<String>), MatchError> {
        let reconstructed = reconstruct::reconstruct(fields, &self.config);
        let block = extract::extract_ingredients_block(&reconstructed.full_text);
        let tokens = tokenize::tokenize(&block);
        let names = self.matcher.match_tokens(&tokens).await?;

        Ok((
            ImageDiagnostics {
                full_text: reconstructed.full_text,
                ingredients_block: block,
                tokens,
            },
            names,
        ))
    }
}
