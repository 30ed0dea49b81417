//! Generative reply parsing.
//!
//! The service is instructed to return a bare JSON array, but real
//! replies arrive with prose preambles, code fences, a single object
//! instead of an array, renamed fields, or risk levels outside the
//! closed set. Parsing is therefore two-stage (direct parse, then
//! bracket extraction) and per-record lenient: a malformed field
//! degrades that field, never the batch.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{normalize_name, IngredientRecord, RiskLevel};

/// Errors from reply parsing. Any of these downgrades the whole batch
/// to fallback records upstream.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No JSON found in generative reply")]
    NoJson,
    #[error("Generative reply is not valid JSON: {0}")]
    Syntax(String),
}

/// First JSON array or object embedded in surrounding prose.
static EMBEDDED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]|\{.*\}").expect("invalid pattern"));

/// Parse a generative reply into records, one per requested name.
///
/// Records pair with `requested` by position. A reply shorter than the
/// request yields fewer records; the caller substitutes fallbacks for
/// the remainder. A reply longer than the request is truncated.
pub fn parse_records(content: &str, requested: &[String]) -> Result<Vec<IngredientRecord>, ParseError> {
    let entries = parse_array_lenient(content)?;

    Ok(entries
        .iter()
        .zip(requested.iter())
        .map(|(entry, requested_name)| record_from_value(entry, requested_name))
        .collect())
}

/// Parse the reply as a JSON array: direct parse first, then extract
/// the first bracketed span from surrounding text. A lone object is
/// wrapped into a one-element array.
fn parse_array_lenient(content: &str) -> Result<Vec<Value>, ParseError> {
    let direct: Result<Value, _> = serde_json::from_str(content.trim());
    let value = match direct {
        Ok(value) => value,
        Err(_) => {
            let embedded = EMBEDDED_JSON.find(content).ok_or(ParseError::NoJson)?;
            serde_json::from_str(embedded.as_str())
                .map_err(|e| ParseError::Syntax(e.to_string()))?
        }
    };

    match value {
        Value::Array(entries) => Ok(entries),
        object @ Value::Object(_) => Ok(vec![object]),
        _ => Err(ParseError::NoJson),
    }
}

/// Build one record from a reply entry, leniently. The requested name
/// wins over a missing or renamed reply name only when the reply gives
/// nothing usable.
fn record_from_value(entry: &Value, requested_name: &str) -> IngredientRecord {
    let name = entry
        .get("name")
        .or_else(|| entry.get("inci_name"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(requested_name);

    let description = entry
        .get("description")
        .or_else(|| entry.get("summary"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    // Anything outside the closed risk set degrades to unknown rather
    // than poisoning stored data.
    let risk_level = entry
        .get("risk_level")
        .and_then(Value::as_str)
        .and_then(RiskLevel::parse)
        .unwrap_or(RiskLevel::Unknown);

    let reason = entry
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    IngredientRecord {
        name: name.to_string(),
        normalized_name: normalize_name(name),
        description,
        benefits: string_array(entry.get("benefits")),
        good_for: string_array(entry.get("good_for")),
        risk_level,
        reason,
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_a_clean_array() {
        let reply = r#"[
            {"name":"Niacinamide","description":"A form of vitamin B3.","benefits":["Brightens skin tone."],"good_for":["aging","pigmentation"],"risk_level":"low-risk","reason":"Well tolerated at common concentrations."}
        ]"#;
        let records = parse_records(reply, &names(&["Niacinamide"])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Niacinamide");
        assert_eq!(records[0].risk_level, RiskLevel::LowRisk);
        assert_eq!(records[0].good_for, vec!["aging", "pigmentation"]);
    }

    #[test]
    fn wraps_a_lone_object_into_an_array() {
        let reply = r#"{"name":"Water","risk_level":"no-risk"}"#;
        let records = parse_records(reply, &names(&["Water"])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].risk_level, RiskLevel::NoRisk);
    }

    #[test]
    fn extracts_json_from_surrounding_prose() {
        let reply = "Here is the requested data:\n```json\n[{\"name\":\"Retinol\",\"risk_level\":\"moderate-risk\"}]\n```\nLet me know if you need more.";
        let records = parse_records(reply, &names(&["Retinol"])).unwrap();
        assert_eq!(records[0].name, "Retinol");
        assert_eq!(records[0].risk_level, RiskLevel::ModerateRisk);
    }

    #[test]
    fn invalid_risk_level_degrades_to_unknown() {
        let reply = r#"[{"name":"Parabens","risk_level":"terrifying"}]"#;
        let records = parse_records(reply, &names(&["Parabens"])).unwrap();
        assert_eq!(records[0].risk_level, RiskLevel::Unknown);
    }

    #[test]
    fn missing_name_falls_back_to_requested_name() {
        let reply = r#"[{"description":"A humectant.","risk_level":"no-risk"}]"#;
        let records = parse_records(reply, &names(&["Glycerin"])).unwrap();
        assert_eq!(records[0].name, "Glycerin");
        assert_eq!(records[0].normalized_name, "glycerin");
    }

    #[test]
    fn accepts_inci_name_and_summary_aliases() {
        let reply = r#"[{"inci_name":"Tocopherol","summary":"Vitamin E.","risk_level":"no-risk"}]"#;
        let records = parse_records(reply, &names(&["Tocopherol"])).unwrap();
        assert_eq!(records[0].name, "Tocopherol");
        assert_eq!(records[0].description, "Vitamin E.");
    }

    #[test]
    fn short_reply_yields_fewer_records() {
        let reply = r#"[{"name":"Water","risk_level":"no-risk"}]"#;
        let records = parse_records(reply, &names(&["Water", "Glycerin"])).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn overlong_reply_is_truncated_to_the_request() {
        let reply = r#"[{"name":"Water","risk_level":"no-risk"},{"name":"Extra","risk_level":"no-risk"}]"#;
        let records = parse_records(reply, &names(&["Water"])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Water");
    }

    #[test]
    fn reply_without_json_is_an_error() {
        let err = parse_records("I cannot help with that.", &names(&["Water"])).unwrap_err();
        assert!(matches!(err, ParseError::NoJson));
    }

    #[test]
    fn broken_json_is_a_syntax_error() {
        let err = parse_records("[{\"name\": \"Water\",", &names(&["Water"])).unwrap_err();
        assert!(matches!(err, ParseError::NoJson | ParseError::Syntax(_)));
    }

    #[test]
    fn non_string_benefit_entries_are_dropped() {
        let reply = r#"[{"name":"Water","benefits":["Hydrates.",42,null],"risk_level":"no-risk"}]"#;
        let records = parse_records(reply, &names(&["Water"])).unwrap();
        assert_eq!(records[0].benefits, vec!["Hydrates."]);
    }
}
