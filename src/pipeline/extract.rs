//! Ingredients-section isolation.
//!
//! Finds the ingredients header in reconstructed label text, truncates
//! at the first unrelated section (directions, warnings, distributor
//! notices, regulatory markers), and scrubs OCR artifacts. Returning an
//! empty string is the expected "no ingredient label detected" outcome,
//! not an error; downstream stages treat it as zero tokens.

use std::sync::LazyLock;

use regex::Regex;

/// Ingredients-section headers, multiple languages and synonyms.
/// Scanned in order; the first pattern that matches anywhere wins.
static HEADER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bingredients?\s*[:：\-]?\s*",
        r"(?i)\bfull\s+ingredients?\s*[:：\-]?\s*",
        r"(?i)\bingredient\s+list\s*[:：\-]?\s*",
        r"전\s*성\s*분\s*[:：\-]?\s*",
        r"성\s*분\s*[:：\-]?\s*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid header pattern"))
    .collect()
});

/// Markers that end the ingredients section: later section headers,
/// company/regulatory notices, and their Korean equivalents.
static END_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Product/company info
        r"(?i)\b(?:is\s+a\s+)?registered\s+trademark",
        r"(?i)\btrademarks?\s+of",
        r"(?i)\bdistributed\s+by\b",
        r"(?i)\bmanufactured\s+(?:by|for)\b",
        r"(?i)\bref\.\s*no",
        r"(?i)\blot\s*[:：]",
        // Section headers
        r"(?i)\bdirections?\s*[:：]",
        r"(?i)\bhow\s+to\s+use\s*[:：]",
        r"(?i)\busage\s*[:：]",
        r"(?i)\bcautions?\s*[:：]",
        r"(?i)\bwarnings?\s*[:：]",
        r"(?i)\bstorage\s*[:：]",
        r"(?i)\bnet\s+(?:weight|wt|content)",
        r"(?i)\bvolume\s*[:：]",
        r"(?i)\bmade\s+in\b",
        // Korean markers
        r"용\s*량",
        r"사\s*용\s*법",
        r"사\s*용\s*방\s*법",
        r"화\s*장\s*품\s*책\s*임\s*판\s*매\s*업\s*자",
        r"주\s*의",
        r"보\s*관\s*방\s*법",
        r"제\s*조\s*업\s*체",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid end marker"))
    .collect()
});

static NBSP_TAB_CR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{00A0}\t\r]+").expect("invalid pattern"));
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("invalid pattern"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s?\[[^\]]*\]").expect("invalid pattern"));
static LONG_DIGIT_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{6,}\b").expect("invalid pattern"));
static KOREAN_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{3131}-\u{318E}\u{AC00}-\u{D7A3}]+").expect("invalid pattern"));
static CONCENTRATION_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\([\d,\.]+\s*(?:ppm|ppb|%|mg|g)\)").expect("invalid pattern"));
static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("invalid pattern"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid pattern"));
static REPEATED_PERIODS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("invalid pattern"));
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[,;]+\s*").expect("invalid pattern"));
static EDGE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[:\-\s,;]+|[:\-\s,;]+$").expect("invalid pattern"));

/// Extract the cleaned ingredients block from full label text.
///
/// Empty result means no ingredients header was detected — an expected
/// outcome that every downstream stage handles as empty input.
pub fn extract_ingredients_block(full_text: &str) -> String {
    if full_text.trim().is_empty() {
        return String::new();
    }

    let normalized = NBSP_TAB_CR.replace_all(full_text, " ");
    let normalized = SPACE_RUNS.replace_all(&normalized, " ");
    let normalized = normalized.trim();

    // First header pattern that matches anywhere wins.
    let start = HEADER_PATTERNS
        .iter()
        .find_map(|re| re.find(normalized).map(|m| m.end()));
    let Some(start) = start else {
        return String::new();
    };

    let tail = &normalized[start..];

    // Truncate at the earliest end marker past position 0. A match at 0
    // is ignored — the header text itself may coincide with a fragment
    // of an end marker.
    let mut end = tail.len();
    for marker in END_MARKERS.iter() {
        if let Some(m) = marker.find(tail) {
            if m.start() > 0 && m.start() < end {
                end = m.start();
            }
        }
    }
    let tail = &tail[..end];

    // Scrub OCR artifacts.
    let tail = BRACKETED.replace_all(tail, " ");
    let tail = LONG_DIGIT_RUNS.replace_all(&tail, " ");
    let tail = KOREAN_RUNS.replace_all(&tail, " ");
    let tail = CONCENTRATION_PARENS.replace_all(&tail, "");

    // Normalize whitespace and separators.
    let tail = NEWLINE_RUNS.replace_all(&tail, " ");
    let tail = WHITESPACE_RUNS.replace_all(&tail, " ");
    let tail = REPEATED_PERIODS.replace_all(&tail, ".");
    let tail = SEPARATOR_RUNS.replace_all(&tail, ", ");

    EDGE_SEPARATORS.replace_all(tail.trim(), "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_block_between_header_and_directions() {
        let text = "Hydrating Toner 150ml Ingredients: Water, Glycerin, Niacinamide. Directions: apply daily.";
        assert_eq!(
            extract_ingredients_block(text),
            "Water, Glycerin, Niacinamide."
        );
    }

    #[test]
    fn no_header_returns_empty() {
        let text = "Hydrating Toner 150ml. Apply to face daily. Made in Korea.";
        assert_eq!(extract_ingredients_block(text), "");
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(extract_ingredients_block(""), "");
        assert_eq!(extract_ingredients_block("   \t \r "), "");
    }

    #[test]
    fn truncates_at_earliest_end_marker() {
        let text = "Ingredients: Water, Glycerin. Made in Korea. Directions: apply.";
        assert_eq!(extract_ingredients_block(text), "Water, Glycerin.");
    }

    #[test]
    fn end_marker_at_position_zero_is_ignored() {
        // "usage:" right after the header must not truncate to nothing.
        let text = "Ingredients usage: Water, Glycerin";
        let block = extract_ingredients_block(text);
        assert!(block.contains("Water"));
    }

    #[test]
    fn strips_bracketed_artifacts_and_lot_numbers() {
        let text = "Ingredients: Water [EWG], Glycerin 1234567, Niacinamide";
        let block = extract_ingredients_block(text);
        assert!(!block.contains('['));
        assert!(!block.contains("1234567"));
        assert!(block.contains("Niacinamide"));
    }

    #[test]
    fn strips_concentration_parentheses() {
        let text = "Ingredients: Madecassoside (8,660 ppm), Glycerin";
        let block = extract_ingredients_block(text);
        assert!(!block.to_lowercase().contains("ppm"));
        assert!(block.contains("Madecassoside"));
    }

    #[test]
    fn korean_header_is_recognized_and_hangul_stripped() {
        let text = "전성분: 정제수 Water, Glycerin 용량 150ml";
        let block = extract_ingredients_block(text);
        assert!(block.contains("Water"));
        assert!(block.contains("Glycerin"));
        assert!(!block.contains("정제수"));
        assert!(!block.contains("150ml"), "volume section must be cut: {block}");
    }

    #[test]
    fn collapses_repeated_separators() {
        let text = "Ingredients: Water ,, Glycerin ;; Niacinamide..";
        let block = extract_ingredients_block(text);
        assert_eq!(block, "Water, Glycerin, Niacinamide.");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        let text = "Ingredients: - Water, Glycerin, ";
        assert_eq!(extract_ingredients_block(text), "Water, Glycerin");
    }

    #[test]
    fn distributor_notice_ends_the_block() {
        let text = "Ingredients: Water, Glycerin Distributed by Acme Beauty Co.";
        assert_eq!(extract_ingredients_block(text), "Water, Glycerin");
    }
}
