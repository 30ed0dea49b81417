//! Canonical ingredient vocabulary source.

use async_trait::async_trait;

use super::StoreError;

/// Read-only source of the canonical ingredient display names.
///
/// `load_names` must return a stable, deterministic order per backing
/// dataset state — the matcher's tie-breaking depends on it.
#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn load_names(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory vocabulary with fixed ordering.
pub struct InMemoryVocabulary {
    names: Vec<String>,
}

impl InMemoryVocabulary {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl VocabularySource for InMemoryVocabulary {
    async fn load_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.names.clone())
    }
}
