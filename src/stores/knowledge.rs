//! Generated-knowledge store.
//!
//! The only dataset this core writes. Records produced by the
//! generative fallback (real or deterministic) are upserted here keyed
//! by normalized name, so later requests resolve without another
//! generative call.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::StoreError;
use crate::models::{normalize_name, IngredientRecord};

/// Read/write store of generated ingredient knowledge.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Batched lookup by display name. Absent names are simply missing
    /// from the result.
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<IngredientRecord>, StoreError>;

    /// Insert or replace by normalized name. Same-key concurrent
    /// upserts of equivalent records are harmless.
    async fn upsert(&self, record: &IngredientRecord) -> Result<(), StoreError>;
}

/// In-memory knowledge store.
pub struct InMemoryKnowledge {
    by_key: RwLock<HashMap<String, IngredientRecord>>,
}

impl InMemoryKnowledge {
    pub fn new() -> Self {
        Self {
            by_key: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.by_key.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryKnowledge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledge {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<IngredientRecord>, StoreError> {
        let map = self.by_key.read().unwrap_or_else(|e| e.into_inner());
        Ok(names
            .iter()
            .filter_map(|n| map.get(&normalize_name(n)).cloned())
            .collect())
    }

    async fn upsert(&self, record: &IngredientRecord) -> Result<(), StoreError> {
        let mut map = self.by_key.write().unwrap_or_else(|e| e.into_inner());
        map.insert(record.normalized_name.clone(), record.clone());
        Ok(())
    }
}
