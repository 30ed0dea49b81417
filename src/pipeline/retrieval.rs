//! Safety-context retrieval over the precomputed embedding index.
//!
//! Embeds an unresolved ingredient name and ranks safety records by
//! cosine similarity against a TTL-bound snapshot of the index. The
//! embedding service is assumed unreliable: when a call fails or times
//! out the retriever degrades to case-insensitive substring matching at
//! a fixed nominal similarity instead of surfacing the failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::services::embedding::EmbeddingClient;
use crate::stores::{SafetyIndexSource, StoreError};

/// Nominal similarity assigned to substring-fallback hits. Below any
/// confident embedding hit, above nothing at all.
const FALLBACK_SIMILARITY: f32 = 0.5;

/// Errors from safety-context retrieval.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Safety index unavailable: {0}")]
    Index(#[from] StoreError),
    /// All embeddings in one index share a fixed dimension; a query
    /// vector of a different length is a contract violation, never a
    /// zero score.
    #[error("Embedding dimension mismatch: query has {query}, index has {index}")]
    DimensionMismatch { query: usize, index: usize },
}

/// One ranked safety-index hit.
#[derive(Debug, Clone)]
pub struct SafetyMatch {
    pub name: String,
    pub risk: String,
    pub details: String,
    pub similarity: f32,
}

struct IndexSnapshot {
    records: Vec<crate::models::SafetyRecord>,
    /// Dimension of the first non-empty embedding; `None` for an index
    /// with no vectors.
    dimension: Option<usize>,
    loaded_at: Instant,
}

/// Embedding-similarity retriever with substring degradation.
pub struct VectorRetriever {
    index: Arc<dyn SafetyIndexSource>,
    embedder: Arc<dyn EmbeddingClient>,
    ttl: Duration,
    embed_timeout: Duration,
    top_k: usize,
    threshold: f32,
    snapshot: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl VectorRetriever {
    pub fn new(
        index: Arc<dyn SafetyIndexSource>,
        embedder: Arc<dyn EmbeddingClient>,
        config: &crate::config::PipelineConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            ttl: config.safety_index_ttl,
            embed_timeout: config.embed_timeout,
            top_k: config.retriever_top_k,
            threshold: config.retriever_threshold,
            snapshot: RwLock::new(None),
        }
    }

    /// Retrieve up to `top_k` safety records relevant to a name, best
    /// first. Embedding failure degrades to substring matching; an
    /// empty result is a normal outcome.
    pub async fn retrieve(&self, name: &str) -> Result<Vec<SafetyMatch>, RetrievalError> {
        let snapshot = self.fresh_snapshot().await?;
        if snapshot.records.is_empty() {
            return Ok(Vec::new());
        }

        let embedded =
            match tokio::time::timeout(self.embed_timeout, self.embedder.embed(name)).await {
                Ok(Ok(vector)) => Some(vector),
                Ok(Err(e)) => {
                    tracing::warn!(name, error = %e, "embedding failed, degrading to substring search");
                    None
                }
                Err(_) => {
                    tracing::warn!(name, "embedding timed out, degrading to substring search");
                    None
                }
            };

        match embedded {
            Some(query) => self.rank_by_similarity(&snapshot, &query),
            None => Ok(self.substring_search(&snapshot, name)),
        }
    }

    fn rank_by_similarity(
        &self,
        snapshot: &IndexSnapshot,
        query: &[f32],
    ) -> Result<Vec<SafetyMatch>, RetrievalError> {
        if let Some(dimension) = snapshot.dimension {
            if query.len() != dimension {
                return Err(RetrievalError::DimensionMismatch {
                    query: query.len(),
                    index: dimension,
                });
            }
        }

        let mut scored: Vec<SafetyMatch> = snapshot
            .records
            .iter()
            .filter(|r| !r.embedding.is_empty())
            .map(|r| SafetyMatch {
                name: r.name.clone(),
                risk: r.risk.clone(),
                details: r.details.clone(),
                similarity: cosine_similarity(query, &r.embedding),
            })
            .filter(|m| m.similarity >= self.threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.top_k);
        Ok(scored)
    }

    /// Case-insensitive substring match over names and details, used
    /// when no query vector is available.
    fn substring_search(&self, snapshot: &IndexSnapshot, name: &str) -> Vec<SafetyMatch> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        snapshot
            .records
            .iter()
            .filter(|r| {
                let record_name = r.name.to_lowercase();
                record_name.contains(&needle)
                    || needle.contains(&record_name)
                    || r.details.to_lowercase().contains(&needle)
            })
            .take(self.top_k)
            .map(|r| SafetyMatch {
                name: r.name.clone(),
                risk: r.risk.clone(),
                details: r.details.clone(),
                similarity: FALLBACK_SIMILARITY,
            })
            .collect()
    }

    async fn fresh_snapshot(&self) -> Result<Arc<IndexSnapshot>, RetrievalError> {
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.loaded_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(snapshot));
                }
            }
        }

        let mut guard = self.snapshot.write().await;
        if let Some(snapshot) = guard.as_ref() {
            if snapshot.loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(snapshot));
            }
        }

        let records = self.index.load_all().await?;
        let dimension = records
            .iter()
            .find(|r| !r.embedding.is_empty())
            .map(|r| r.embedding.len());
        tracing::info!(records = records.len(), "safety index snapshot reloaded");

        let snapshot = Arc::new(IndexSnapshot {
            records,
            dimension,
            loaded_at: Instant::now(),
        });
        *guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

/// Cosine similarity between two equal-length vectors. A zero-norm
/// vector scores 0 against everything, as do mismatched lengths — the
/// retriever validates dimensions before ranking, so a mismatch here
/// only happens for callers that opted out of that check.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::models::SafetyRecord;
    use crate::services::embedding::{deterministic_vector, MockEmbeddingClient};
    use crate::stores::InMemorySafetyIndex;

    fn record(name: &str, embedding: Vec<f32>, details: &str) -> SafetyRecord {
        SafetyRecord {
            name: name.into(),
            embedding,
            risk: "high".into(),
            details: details.into(),
        }
    }

    fn retriever(records: Vec<SafetyRecord>, embedder: MockEmbeddingClient) -> VectorRetriever {
        VectorRetriever::new(
            Arc::new(InMemorySafetyIndex::new(records)),
            Arc::new(embedder),
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.5, 0.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_norm_is_zero() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[], &[]).abs() < 1e-6);
    }

    #[tokio::test]
    async fn retrieves_nearest_record_first() {
        let query_like = deterministic_vector("hydroquinone", 16);
        let unrelated = deterministic_vector("completely different thing", 16);
        let r = retriever(
            vec![
                record("Other", unrelated, ""),
                record("Hydroquinone", query_like, "Banned in EU cosmetics"),
            ],
            MockEmbeddingClient::new(16),
        );

        let matches = r.retrieve("hydroquinone").await.unwrap();
        assert!(!matches.is_empty());
        assert_eq!(matches[0].name, "Hydroquinone");
        assert!((matches[0].similarity - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn results_are_capped_at_top_k() {
        let v = deterministic_vector("glycerin", 16);
        let records = (0..5)
            .map(|i| record(&format!("Entry {i}"), v.clone(), ""))
            .collect();
        let r = retriever(records, MockEmbeddingClient::new(16));

        let matches = r.retrieve("glycerin").await.unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn below_threshold_hits_are_dropped() {
        // Orthogonal to any real embedding in spirit: negate the query.
        let query = deterministic_vector("retinol", 4);
        let opposite: Vec<f32> = query.iter().map(|x| -x).collect();
        let r = retriever(
            vec![record("Opposite", opposite, "")],
            MockEmbeddingClient::new(4),
        );

        let matches = r.retrieve("retinol").await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_error() {
        let r = retriever(
            vec![record("Entry", vec![1.0, 0.0, 0.0], "")],
            MockEmbeddingClient::new(16),
        );

        let err = r.retrieve("glycerin").await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch { query: 16, index: 3 }
        ));
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_substring_search() {
        let r = retriever(
            vec![
                record("Hydroquinone", vec![1.0, 0.0], "Banned in EU cosmetics"),
                record("Glycerin", vec![0.0, 1.0], "Common humectant"),
            ],
            MockEmbeddingClient::failing(2),
        );

        let matches = r.retrieve("hydroquinone").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "Hydroquinone");
        assert!((matches[0].similarity - FALLBACK_SIMILARITY).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn substring_fallback_also_searches_details() {
        let r = retriever(
            vec![record("E-920", vec![1.0], "Also known as carbamide peroxide")],
            MockEmbeddingClient::failing(1),
        );

        let matches = r.retrieve("carbamide").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "E-920");
    }

    #[tokio::test]
    async fn empty_index_returns_no_matches() {
        let r = retriever(vec![], MockEmbeddingClient::new(8));
        let matches = r.retrieve("glycerin").await.unwrap();
        assert!(matches.is_empty());
    }
}
