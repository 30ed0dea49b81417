//! Curated ingredient metadata source.

use std::collections::HashMap;

use async_trait::async_trait;

use super::StoreError;
use crate::models::IngredientRecord;

/// Read-only curated dataset, keyed by exact display name.
#[async_trait]
pub trait CuratedSource: Send + Sync {
    /// Batched lookup. Names without a curated record are simply absent
    /// from the result; order is not significant.
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<IngredientRecord>, StoreError>;
}

/// In-memory curated dataset.
pub struct InMemoryCurated {
    by_name: HashMap<String, IngredientRecord>,
}

impl InMemoryCurated {
    pub fn new(records: Vec<IngredientRecord>) -> Self {
        Self {
            by_name: records
                .into_iter()
                .map(|r| (r.name.clone(), r))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }
}

#[async_trait]
impl CuratedSource for InMemoryCurated {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<IngredientRecord>, StoreError> {
        Ok(names
            .iter()
            .filter_map(|n| self.by_name.get(n).cloned())
            .collect())
    }
}
