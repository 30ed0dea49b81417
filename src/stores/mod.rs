//! Dataset seams.
//!
//! The canonical vocabulary, curated metadata, generated-knowledge and
//! safety-embedding datasets live outside this core. Each is reached
//! through an async trait so embedders can back them with whatever
//! storage they run; the in-memory implementations here serve tests and
//! small deployments.

pub mod curated;
pub mod knowledge;
pub mod safety;
pub mod vocabulary;

pub use curated::{CuratedSource, InMemoryCurated};
pub use knowledge::{InMemoryKnowledge, KnowledgeStore};
pub use safety::{InMemorySafetyIndex, SafetyIndexSource};
pub use vocabulary::{InMemoryVocabulary, VocabularySource};

/// Errors from any dataset backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Dataset unavailable: {0}")]
    Unavailable(String),
    #[error("Dataset query failed: {0}")]
    Query(String),
}
