//! Vocabulary matching.
//!
//! Resolves cleaned tokens to canonical ingredient display names via a
//! process-local vocabulary snapshot: exact case-insensitive lookup
//! first, then token-set similarity against every entry. The snapshot
//! reloads in full once it outlives its TTL; between reloads every
//! request sees the same deterministic iteration order, which is what
//! makes tie-breaking stable.
//!
//! Scan cost is O(tokens × |vocabulary|) per request. Fine at current
//! vocabulary scale; an n-gram pre-filter becomes necessary if the
//! vocabulary grows by orders of magnitude.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::stores::{StoreError, VocabularySource};

/// Errors from vocabulary matching.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Vocabulary unavailable: {0}")]
    Vocabulary(#[from] StoreError),
}

struct Snapshot {
    /// Display names in source order — the tie-break order.
    names: Vec<String>,
    /// Lowercase name → display name, for O(1) exact hits.
    normalized: HashMap<String, String>,
    loaded_at: Instant,
}

/// Token-to-canonical-name matcher over a TTL-bound vocabulary
/// snapshot.
pub struct VocabularyMatcher {
    source: Arc<dyn VocabularySource>,
    ttl: Duration,
    threshold: f64,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl VocabularyMatcher {
    pub fn new(source: Arc<dyn VocabularySource>, ttl: Duration, threshold: f64) -> Self {
        Self {
            source,
            ttl,
            threshold,
            snapshot: RwLock::new(None),
        }
    }

    /// Match tokens against the vocabulary.
    ///
    /// Returns deduplicated canonical display names in first-match
    /// order; ordering relative to the input token stream is not part
    /// of the contract.
    pub async fn match_tokens(&self, tokens: &[String]) -> Result<Vec<String>, MatchError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let snapshot = self.fresh_snapshot().await?;

        let mut matched: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for token in tokens {
            let lower = token.to_lowercase();

            // Exact case-insensitive hit short-circuits the scan.
            if let Some(display) = snapshot.normalized.get(&lower) {
                if seen.insert(display.as_str()) {
                    matched.push(display.clone());
                }
                continue;
            }

            let mut best: Option<&str> = None;
            let mut best_score = 0.0f64;
            for name in &snapshot.names {
                let score = token_set_ratio(&lower, &name.to_lowercase());
                // Strictly-greater keeps the first-encountered entry on
                // ties, which is deterministic per snapshot.
                if score > best_score {
                    best_score = score;
                    best = Some(name.as_str());
                    if best_score >= 100.0 {
                        break;
                    }
                }
            }

            if best_score >= self.threshold {
                if let Some(display) = best {
                    if seen.insert(display) {
                        matched.push(display.to_string());
                    }
                }
            }
        }

        Ok(matched)
    }

    /// Age of the current snapshot, for diagnostics.
    pub async fn snapshot_age(&self) -> Option<Duration> {
        let guard = self.snapshot.read().await;
        guard.as_ref().map(|s| s.loaded_at.elapsed())
    }

    async fn fresh_snapshot(&self) -> Result<Arc<Snapshot>, MatchError> {
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.loaded_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(snapshot));
                }
            }
        }

        let mut guard = self.snapshot.write().await;
        // Another task may have reloaded while we waited for the lock.
        if let Some(snapshot) = guard.as_ref() {
            if snapshot.loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(snapshot));
            }
        }

        let names = self.source.load_names().await?;
        let normalized = names
            .iter()
            .map(|n| (n.to_lowercase(), n.clone()))
            .collect();
        tracing::info!(entries = names.len(), "vocabulary snapshot reloaded");

        let snapshot = Arc::new(Snapshot {
            names,
            normalized,
            loaded_at: Instant::now(),
        });
        *guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

// ═══════════════════════════════════════════════════════════
// Token-set similarity
// ═══════════════════════════════════════════════════════════

/// Token-set similarity (0–100): order- and duplicate-word-insensitive
/// overlap ratio. The score is the best Levenshtein ratio among the
/// sorted intersection string and the two intersection-plus-remainder
/// strings.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = set_a.intersection(&set_b).copied().collect();
    let only_a: Vec<&str> = set_a.difference(&set_b).copied().collect();
    let only_b: Vec<&str> = set_b.difference(&set_a).copied().collect();

    let base = intersection.join(" ");
    let combined_a = join_nonempty(&base, &only_a.join(" "));
    let combined_b = join_nonempty(&base, &only_b.join(" "));

    levenshtein_ratio(&base, &combined_a)
        .max(levenshtein_ratio(&base, &combined_b))
        .max(levenshtein_ratio(&combined_a, &combined_b))
}

fn join_nonempty(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base} {rest}"),
    }
}

/// Levenshtein similarity ratio (0–100) between two strings.
fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let total = (a.chars().count() + b.chars().count()) as f64;
    if total == 0.0 {
        return 100.0;
    }
    let dist = edit_distance(a, b) as f64;
    (total - dist) / total * 100.0
}

/// Levenshtein edit distance, two-row dynamic programming.
fn edit_distance(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n as u32;
    }
    if n == 0 {
        return m as u32;
    }

    let mut prev: Vec<u32> = (0..=n as u32).collect();
    let mut curr = vec![0u32; n + 1];

    for (i, &a_ch) in a_chars.iter().enumerate() {
        curr[0] = (i + 1) as u32;
        for (j, &b_ch) in b_chars.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
