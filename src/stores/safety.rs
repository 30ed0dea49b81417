//! Safety-embedding index source.

use async_trait::async_trait;

use super::StoreError;
use crate::models::SafetyRecord;

/// Read-only source of the precomputed safety-embedding index.
#[async_trait]
pub trait SafetyIndexSource: Send + Sync {
    /// Load the full index. The retriever snapshots and TTL-refreshes
    /// it, so this is called rarely.
    async fn load_all(&self) -> Result<Vec<SafetyRecord>, StoreError>;
}

/// In-memory safety index.
pub struct InMemorySafetyIndex {
    records: Vec<SafetyRecord>,
}

impl InMemorySafetyIndex {
    pub fn new(records: Vec<SafetyRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl SafetyIndexSource for InMemorySafetyIndex {
    async fn load_all(&self) -> Result<Vec<SafetyRecord>, StoreError> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_all_returns_every_record() {
        let index = InMemorySafetyIndex::new(vec![
            SafetyRecord {
                name: "Hydroquinone".into(),
                embedding: vec![1.0, 0.0],
                risk: "restricted".into(),
                details: "Banned in EU cosmetics above 0%".into(),
            },
            SafetyRecord {
                name: "Formaldehyde".into(),
                embedding: vec![0.0, 1.0],
                risk: "high".into(),
                details: "Known sensitizer".into(),
            },
        ]);
        let records = index.load_all().await.unwrap();
        assert_eq!(records.len(), 2);
    }
}
