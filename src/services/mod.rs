pub mod embedding;
pub mod llm;
