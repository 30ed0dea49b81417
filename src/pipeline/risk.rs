//! Risk bucketing of enriched ingredients.
//!
//! Groups enrichment output by risk level into a fixed-shape structure:
//! every level key is always present, empty or not, so consumers never
//! branch on missing keys.

use serde::Serialize;

use crate::models::{EnrichedIngredient, RiskLevel};

/// One ingredient inside a risk bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskEntry {
    pub name: String,
    pub reason: String,
}

/// Enriched ingredients grouped by risk level. Serializes with all five
/// level keys present regardless of content.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RiskBuckets {
    pub no_risk: Vec<RiskEntry>,
    pub low_risk: Vec<RiskEntry>,
    pub moderate_risk: Vec<RiskEntry>,
    pub high_risk: Vec<RiskEntry>,
    pub unknown: Vec<RiskEntry>,
}

impl RiskBuckets {
    pub fn bucket(&self, level: RiskLevel) -> &[RiskEntry] {
        match level {
            RiskLevel::NoRisk => &self.no_risk,
            RiskLevel::LowRisk => &self.low_risk,
            RiskLevel::ModerateRisk => &self.moderate_risk,
            RiskLevel::HighRisk => &self.high_risk,
            RiskLevel::Unknown => &self.unknown,
        }
    }

    fn bucket_mut(&mut self, level: RiskLevel) -> &mut Vec<RiskEntry> {
        match level {
            RiskLevel::NoRisk => &mut self.no_risk,
            RiskLevel::LowRisk => &mut self.low_risk,
            RiskLevel::ModerateRisk => &mut self.moderate_risk,
            RiskLevel::HighRisk => &mut self.high_risk,
            RiskLevel::Unknown => &mut self.unknown,
        }
    }

    /// Total entries across all buckets.
    pub fn len(&self) -> usize {
        RiskLevel::ALL.iter().map(|l| self.bucket(*l).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bucket enriched ingredients by risk level, preserving input order
/// inside each bucket.
pub fn aggregate(enriched: &[EnrichedIngredient]) -> RiskBuckets {
    let mut buckets = RiskBuckets::default();
    for item in enriched {
        buckets.bucket_mut(item.record.risk_level).push(RiskEntry {
            name: item.record.name.clone(),
            reason: item.record.reason.clone(),
        });
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{normalize_name, IngredientRecord, Resolution};

    fn enriched(name: &str, risk: RiskLevel, reason: &str) -> EnrichedIngredient {
        EnrichedIngredient {
            record: IngredientRecord {
                name: name.to_string(),
                normalized_name: normalize_name(name),
                description: String::new(),
                benefits: vec![],
                good_for: vec![],
                risk_level: risk,
                reason: reason.to_string(),
            },
            resolution: Resolution::Resolved,
        }
    }

    #[test]
    fn empty_input_yields_all_empty_buckets() {
        let buckets = aggregate(&[]);
        assert!(buckets.is_empty());
        for level in RiskLevel::ALL {
            assert!(buckets.bucket(level).is_empty());
        }
    }

    #[test]
    fn serialization_always_carries_all_five_keys() {
        let json = serde_json::to_value(aggregate(&[])).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 5);
        for key in ["no-risk", "low-risk", "moderate-risk", "high-risk", "unknown"] {
            assert!(object[key].as_array().unwrap().is_empty(), "missing {key}");
        }
    }

    #[test]
    fn groups_by_risk_level() {
        let input = vec![
            enriched("Water", RiskLevel::NoRisk, "Inert."),
            enriched("Retinol", RiskLevel::ModerateRisk, "Irritation potential."),
            enriched("Glycerin", RiskLevel::NoRisk, "Well tolerated."),
            enriched("Mystery", RiskLevel::Unknown, "Generative service failed"),
        ];
        let buckets = aggregate(&input);
        assert_eq!(buckets.no_risk.len(), 2);
        assert_eq!(buckets.moderate_risk.len(), 1);
        assert_eq!(buckets.unknown.len(), 1);
        assert_eq!(buckets.len(), 4);
    }

    #[test]
    fn entries_preserve_input_order_within_a_bucket() {
        let input = vec![
            enriched("Water", RiskLevel::NoRisk, ""),
            enriched("Glycerin", RiskLevel::NoRisk, ""),
        ];
        let buckets = aggregate(&input);
        assert_eq!(buckets.no_risk[0].name, "Water");
        assert_eq!(buckets.no_risk[1].name, "Glycerin");
    }

    #[test]
    fn entry_carries_the_risk_reason() {
        let input = vec![enriched("Retinol", RiskLevel::ModerateRisk, "Irritation potential.")];
        let buckets = aggregate(&input);
        assert_eq!(buckets.moderate_risk[0].reason, "Irritation potential.");
    }
}
