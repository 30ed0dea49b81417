pub mod enrichment;
pub mod extract;
pub mod matching;
pub mod orchestrator;
pub mod reconstruct;
pub mod retrieval;
pub mod risk;
pub mod tokenize;
