//! Core analysis pipeline for cosmetic ingredient label scans.
//!
//! Takes raw OCR fields from one or more photos of a product label and
//! produces enriched, risk-bucketed ingredient records:
//!
//! 1. reconstruct reading order from bounding-polygon geometry
//! 2. isolate and clean the ingredients section
//! 3. tokenize it into candidate INCI names
//! 4. match tokens against the canonical vocabulary (exact, then fuzzy)
//! 5. enrich matched names through a tiered cascade (cache → curated
//!    dataset → generated-knowledge store → retrieval-grounded
//!    generative fallback)
//! 6. bucket results by risk level
//!
//! External datasets and services are reached through async traits
//! ([`stores`], [`services`]) so embedders supply their own backends;
//! in-memory implementations and deterministic mocks ship for tests and
//! small deployments. [`pipeline::orchestrator::Analyzer`] is the
//! entry point.

pub mod cache;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod stores;

pub use config::PipelineConfig;
pub use models::{EnrichedIngredient, IngredientRecord, RawOcrField, Resolution, RiskLevel, Vertex};
pub use pipeline::orchestrator::{AnalysisError, Analyzer, ImageDiagnostics, ScanAnalysis};
pub use pipeline::risk::RiskBuckets;
