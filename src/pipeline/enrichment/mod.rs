//! Tiered ingredient enrichment.
//!
//! Resolves matched ingredient names into full records through a fixed
//! cascade: per-name TTL cache, curated dataset, generated-knowledge
//! store, then the generative service grounded by retrieved safety
//! context. Dataset failures surface as errors; generative-service
//! failures never do — affected names get deterministic fallback
//! records instead. Every generated record, fallback included, is
//! written back to the cache and the knowledge store, so a degraded
//! upstream answers warm instead of being re-hammered; the cache TTL
//! bounds how long a fallback sticks.

pub mod parser;
pub mod prompt;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use crate::cache::TtlCache;
use crate::config::PipelineConfig;
use crate::models::{normalize_name, EnrichedIngredient, IngredientRecord, Resolution};
use crate::pipeline::retrieval::{RetrievalError, SafetyMatch, VectorRetriever};
use crate::services::llm::LlmClient;
use crate::stores::{CuratedSource, KnowledgeStore, StoreError};

/// Errors from the enrichment cascade. Only dataset and retrieval
/// contract failures — the generative tier degrades instead of erroring.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// The enrichment cascade.
pub struct EnrichmentCascade {
    curated: Arc<dyn CuratedSource>,
    knowledge: Arc<dyn KnowledgeStore>,
    retriever: Arc<VectorRetriever>,
    llm: Arc<dyn LlmClient>,
    cache: TtlCache<EnrichedIngredient>,
    batch_size: usize,
    llm_timeout: Duration,
    context_confidence: f32,
}

impl EnrichmentCascade {
    pub fn new(
        curated: Arc<dyn CuratedSource>,
        knowledge: Arc<dyn KnowledgeStore>,
        retriever: Arc<VectorRetriever>,
        llm: Arc<dyn LlmClient>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            curated,
            knowledge,
            retriever,
            llm,
            cache: TtlCache::new(config.enrichment_ttl),
            batch_size: config.llm_batch_size.max(1),
            llm_timeout: config.llm_timeout,
            context_confidence: config.context_confidence,
        }
    }

    /// Enrich a list of matched names.
    ///
    /// Duplicate names (case- and spacing-insensitive) coalesce into one
    /// record. Output preserves first-occurrence input order and always
    /// has one entry per distinct name.
    pub async fn enrich(&self, names: &[String]) -> Result<Vec<EnrichedIngredient>, EnrichError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        // Distinct names, first occurrence wins.
        let mut order: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for name in names {
            if seen.insert(normalize_name(name)) {
                order.push(name.clone());
            }
        }

        let mut resolved: HashMap<String, EnrichedIngredient> = HashMap::new();

        // Tier 0: per-name cache.
        for name in &order {
            let key = normalize_name(name);
            if let Some(hit) = self.cache.get(&key) {
                resolved.insert(key, hit);
            }
        }

        // Tier 1: curated dataset.
        let missing = unresolved(&order, &resolved);
        if !missing.is_empty() {
            for record in self.curated.find_by_names(&missing).await? {
                self.admit(&mut resolved, record);
            }
        }

        // Tier 2: generated-knowledge store.
        let missing = unresolved(&order, &resolved);
        if !missing.is_empty() {
            for record in self.knowledge.find_by_names(&missing).await? {
                self.admit(&mut resolved, record);
            }
        }

        // Tier 3: generative service, batched, grounded by safety
        // context.
        let missing = unresolved(&order, &resolved);
        if !missing.is_empty() {
            tracing::info!(unresolved = missing.len(), "generative enrichment");
            let context = self.safety_context(&missing).await?;

            let batches = missing
                .chunks(self.batch_size)
                .map(|chunk| self.enrich_batch(chunk, &context));
            for batch in join_all(batches).await {
                for (requested, enriched) in batch {
                    resolved.insert(normalize_name(&requested), enriched);
                }
            }
        }

        // One record per distinct name, unconditionally: a name no tier
        // mapped still gets a deterministic fallback.
        Ok(order
            .iter()
            .map(|name| {
                resolved
                    .remove(&normalize_name(name))
                    .unwrap_or_else(|| fallback_for(name, "No record produced for this name"))
            })
            .collect())
    }

    /// Drop expired cache entries; reads already treat them as misses.
    pub fn sweep_cache(&self) {
        self.cache.sweep();
    }

    fn admit(&self, resolved: &mut HashMap<String, EnrichedIngredient>, record: IngredientRecord) {
        // Key by the name's own normalization, not the stored
        // `normalized_name` field — a stale dataset column must not
        // leave the requested name unmapped.
        let key = normalize_name(&record.name);
        let enriched = EnrichedIngredient {
            resolution: Resolution::Resolved,
            record,
        };
        self.cache.insert(&key, enriched.clone());
        resolved.insert(key, enriched);
    }

    /// Retrieve safety context for every unresolved name in parallel and
    /// keep only hits clearing the confidence bar.
    async fn safety_context(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, Vec<SafetyMatch>>, EnrichError> {
        let lookups = names.iter().map(|name| self.retriever.retrieve(name));
        let mut context = HashMap::new();
        for (name, outcome) in names.iter().zip(join_all(lookups).await) {
            let confident: Vec<SafetyMatch> = outcome?
                .into_iter()
                .filter(|m| m.similarity >= self.context_confidence)
                .collect();
            if !confident.is_empty() {
                context.insert(name.clone(), confident);
            }
        }
        Ok(context)
    }

    /// One generative call for one batch. Never fails: every service or
    /// parse problem becomes fallback records for the whole batch.
    async fn enrich_batch(
        &self,
        chunk: &[String],
        context: &HashMap<String, Vec<SafetyMatch>>,
    ) -> Vec<(String, EnrichedIngredient)> {
        let user = prompt::user_prompt(chunk, context);
        let outcome =
            tokio::time::timeout(self.llm_timeout, self.llm.generate(prompt::SYSTEM_PROMPT, &user))
                .await;

        let out: Vec<(String, EnrichedIngredient)> = match outcome {
            Ok(Ok(content)) => match parser::parse_records(&content, chunk) {
                Ok(records) => chunk
                    .iter()
                    .enumerate()
                    .map(|(i, requested)| match records.get(i) {
                        Some(record) => (
                            requested.clone(),
                            EnrichedIngredient {
                                record: record.clone(),
                                resolution: Resolution::Resolved,
                            },
                        ),
                        None => (
                            requested.clone(),
                            fallback_for(requested, "Missing from generative reply"),
                        ),
                    })
                    .collect(),
                Err(e) => {
                    tracing::warn!(batch = chunk.len(), error = %e, "generative reply unusable");
                    fallback_batch(chunk, "Generative reply could not be parsed")
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(batch = chunk.len(), error = %e, "generative service failed");
                fallback_batch(chunk, "Generative service failed")
            }
            Err(_) => {
                tracing::warn!(batch = chunk.len(), "generative service timed out");
                fallback_batch(chunk, "Generative service timed out")
            }
        };

        // Every record, fallback included, is written back. Write-back
        // runs detached so a caller abandoning the request does not
        // lose it; the cache TTL bounds how long a fallback answers
        // warm.
        for (requested, enriched) in &out {
            self.cache.insert(&normalize_name(requested), enriched.clone());
            let knowledge = Arc::clone(&self.knowledge);
            let record = enriched.record.clone();
            tokio::spawn(async move {
                if let Err(e) = knowledge.upsert(&record).await {
                    tracing::warn!(name = %record.name, error = %e, "knowledge write-back failed");
                }
            });
        }
        out
    }
}

fn unresolved(order: &[String], resolved: &HashMap<String, EnrichedIngredient>) -> Vec<String> {
    order
        .iter()
        .filter(|name| !resolved.contains_key(&normalize_name(name)))
        .cloned()
        .collect()
}

fn fallback_for(name: &str, reason: &str) -> EnrichedIngredient {
    EnrichedIngredient {
        record: IngredientRecord::fallback(name, reason),
        resolution: Resolution::Fallback,
    }
}

fn fallback_batch(chunk: &[String], reason: &str) -> Vec<(String, EnrichedIngredient)> {
    chunk
        .iter()
        .map(|name| (name.clone(), fallback_for(name, reason)))
        .collect()
}
