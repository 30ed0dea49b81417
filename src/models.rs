//! Shared data model for the label analysis pipeline.
//!
//! Everything here crosses module boundaries: OCR input fields, the
//! canonical ingredient record, the closed risk-level enum, and safety
//! embedding records. Request-scoped intermediates (lines, tokens) stay
//! plain `String`s inside their pipeline stages.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ═══════════════════════════════════════════════════════════
// OCR input
// ═══════════════════════════════════════════════════════════

/// One vertex of an OCR bounding polygon, in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

/// A raw text fragment from the OCR provider with its bounding polygon.
///
/// Fields with empty polygons still participate in ordering — their
/// coordinates degrade to 0 rather than failing the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOcrField {
    pub text: String,
    #[serde(default)]
    pub bounding_polygon: Vec<Vertex>,
}

impl RawOcrField {
    pub fn new(text: &str, bounding_polygon: Vec<Vertex>) -> Self {
        Self {
            text: text.to_string(),
            bounding_polygon,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Risk level — closed enum
// ═══════════════════════════════════════════════════════════

/// Closed classification of ingredient safety concern.
///
/// Wire form is kebab-case lowercase (`"no-risk"`, `"unknown"`).
/// Parsing is case-insensitive because the curated datasets store
/// capitalized variants (`"Unknown"`, `"No-risk"`); any value outside
/// the five levels fails deserialization so it can never be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    NoRisk,
    LowRisk,
    ModerateRisk,
    HighRisk,
    Unknown,
}

impl RiskLevel {
    /// All levels, in presentation order. Consumers rely on every level
    /// appearing in bucketed output, so iteration order is part of the
    /// contract.
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::NoRisk,
        RiskLevel::LowRisk,
        RiskLevel::ModerateRisk,
        RiskLevel::HighRisk,
        RiskLevel::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::NoRisk => "no-risk",
            RiskLevel::LowRisk => "low-risk",
            RiskLevel::ModerateRisk => "moderate-risk",
            RiskLevel::HighRisk => "high-risk",
            RiskLevel::Unknown => "unknown",
        }
    }

    /// Case-insensitive parse. Returns `None` for anything outside the
    /// closed set.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "no-risk" => Some(RiskLevel::NoRisk),
            "low-risk" => Some(RiskLevel::LowRisk),
            "moderate-risk" => Some(RiskLevel::ModerateRisk),
            "high-risk" => Some(RiskLevel::HighRisk),
            "unknown" => Some(RiskLevel::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RiskLevel::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown risk level: {s:?}")))
    }
}

// ═══════════════════════════════════════════════════════════
// Ingredient records
// ═══════════════════════════════════════════════════════════

/// Canonical, fully-enriched ingredient record.
///
/// `normalized_name` is the unique key across the curated dataset and
/// the generated-knowledge store combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub normalized_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub good_for: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub reason: String,
}

impl IngredientRecord {
    /// Deterministic record for a name the generative fallback could not
    /// resolve. Same name + same reason always yields the same record.
    pub fn fallback(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            normalized_name: normalize_name(name),
            description: "Information not available".to_string(),
            benefits: Vec::new(),
            good_for: Vec::new(),
            risk_level: RiskLevel::Unknown,
            reason: reason.to_string(),
        }
    }
}

/// Lowercase a display name into its unique lookup key.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Which tier produced a record: a real resolution or the deterministic
/// fallback substituted after a generative-service failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Resolved,
    Fallback,
}

/// An enrichment result: the record plus its provenance tag.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedIngredient {
    pub record: IngredientRecord,
    pub resolution: Resolution,
}

// ═══════════════════════════════════════════════════════════
// Safety embedding records
// ═══════════════════════════════════════════════════════════

/// One entry of the precomputed safety-embedding index.
///
/// All embeddings in one index share a single fixed dimension for the
/// lifetime of the index; comparing mismatched dimensions is a contract
/// violation, not a zero score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyRecord {
    pub name: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_round_trips_kebab_case() {
        for level in RiskLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            let back: RiskLevel = serde_json::from_str(&json).unwrap();
            assert_eq!(level, back);
        }
        assert_eq!(serde_json::to_string(&RiskLevel::NoRisk).unwrap(), "\"no-risk\"");
    }

    #[test]
    fn risk_level_parses_capitalized_dataset_variants() {
        assert_eq!(RiskLevel::parse("Unknown"), Some(RiskLevel::Unknown));
        assert_eq!(RiskLevel::parse("No-risk"), Some(RiskLevel::NoRisk));
        assert_eq!(RiskLevel::parse("MODERATE-RISK"), Some(RiskLevel::ModerateRisk));
    }

    #[test]
    fn risk_level_rejects_values_outside_the_closed_set() {
        assert_eq!(RiskLevel::parse("medium"), None);
        let result: Result<RiskLevel, _> = serde_json::from_str("\"safe\"");
        assert!(result.is_err());
    }

    #[test]
    fn record_with_invalid_risk_level_fails_deserialization() {
        let json = r#"{"name":"Parabens","normalized_name":"parabens","risk_level":"scary"}"#;
        let result: Result<IngredientRecord, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn record_defaults_optional_fields() {
        let json = r#"{"name":"Water","normalized_name":"water","risk_level":"no-risk"}"#;
        let record: IngredientRecord = serde_json::from_str(json).unwrap();
        assert!(record.description.is_empty());
        assert!(record.benefits.is_empty());
        assert!(record.good_for.is_empty());
    }

    #[test]
    fn fallback_record_is_deterministic() {
        let a = IngredientRecord::fallback("Niacinamide", "generative service timed out");
        let b = IngredientRecord::fallback("Niacinamide", "generative service timed out");
        assert_eq!(a, b);
        assert_eq!(a.risk_level, RiskLevel::Unknown);
        assert!(a.benefits.is_empty());
        assert_eq!(a.normalized_name, "niacinamide");
    }

    #[test]
    fn normalize_name_collapses_case_and_spacing() {
        assert_eq!(normalize_name("  Sodium   Hyaluronate "), "sodium hyaluronate");
    }

    #[test]
    fn ocr_field_polygon_defaults_to_empty() {
        let field: RawOcrField = serde_json::from_str(r#"{"text":"Glycerin"}"#).unwrap();
        assert!(field.bounding_polygon.is_empty());
    }
}
