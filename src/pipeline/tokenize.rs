//! Ingredient block tokenization.
//!
//! Splits the extracted ingredients block into candidate name tokens:
//! repair known broken-word OCR artifacts, split on separators, drop
//! noise, and re-merge multi-word INCI names that OCR split apart.
//! Tokens come out lowercase; the vocabulary matcher restores display
//! casing from the canonical side.

use std::sync::LazyLock;

use regex::Regex;

/// Known broken-word OCR artifacts, repaired before any splitting.
/// Applied in order; replacements are canonical uppercase fragments.
static BROKEN_WORD_FIXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)METHYLCELLU\s+LOSE", "METHYLCELLULOSE"),
        (r"(?i)HYDROXYPR\s*OPYLTRIMONIUM", "HYDROXYPROPYLTRIMONIUM"),
        (r"(?i)HYDROXYPR\s*OPYL", "HYDROXYPROPYL"),
        (r"(?i)SO\s+DIUM", "SODIUM"),
        (r"(?i)DIUM\s+CHLORIDE", "SODIUM CHLORIDE"),
        (r"(?i)HYALUR\s*ONATE", "HYALURONATE"),
        (r"(?i)HYALUR\s*ONIC", "HYALURONIC"),
        (r"1\.2-HEXANE-\s*DIOL", "1,2-HEXANEDIOL"),
        (r"(?i)BUTYLENE\s+GLYCOL\s+DIOL", "BUTYLENE GLYCOL"),
        (r"(?i)LOSE\s+METHYLCELLU", "METHYLCELLULOSE"),
    ]
    .iter()
    .map(|(p, fixed)| (Regex::new(p).expect("invalid fix pattern"), *fixed))
    .collect()
});

/// Words that frequently appear as the split-off first half of a
/// multi-word INCI name.
const FRAGMENT_PRONE_PREFIXES: &[&str] = &[
    "sodium", "potassium", "calcium", "magnesium",
    "bis", "tri", "di", "mono",
    "ethyl", "butyl", "propyl", "methyl", "iso",
    "hydroxy", "hydroxyethyl", "hydroxypropyl", "hydroxypropyltrimonium",
    "beta", "alpha", "gamma",
    "panax", "centella", "camellia",
    "acetylated", "hydrolyzed", "hydrogenated",
    "disodium", "trisodium", "malachite",
];

/// Non-ingredient words and standalone OCR fragments.
const NOISE_WORDS: &[&str] = &[
    "ewg", "green", "safety", "logo", "certified", "distributor", "manufacturer",
    "ingredients", "ppm", "ppb", "mg", "ans", "del", "ac",
    "ate", "lose", "opyl", "dium", "onate", "onic",
    "ppb)", "(ppb", "ppm)", "(ppm",
];

/// Short tokens that are nonetheless valid INCI abbreviations.
const VALID_SHORT_TOKENS: &[&str] = &[
    "peg", "ppg", "ci", "c12", "c13", "c14", "c15", "c16", "edta", "water", "oil",
];

static CONCENTRATION_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\([^)]*(?:ppm|ppb|%|mg)\)").expect("invalid pattern"));
static SPLIT_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\.\n]+").expect("invalid pattern"));
static COLOR_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^CI\s*\d+").expect("invalid pattern"));
static SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*/\s*").expect("invalid pattern"));
static EDGE_DASHES_DOTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\-\.]+|[\-\.]+$").expect("invalid pattern"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid pattern"));
static NUMERIC_PUNCT_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[0-9\s'"\-\.]+$"#).expect("invalid pattern"));
static TRAILING_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\.,;\-]+$").expect("invalid pattern"));
static CHEMICAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(ate|ide|one|ol|ane|ene|acid|glucan|hyaluronate|glycol|glucoside|",
        r"allantoin|sulfate|chloride|citrate|edta|extract|oil|water|glycerin|",
        r"cellulose|carbomer|tromethamine)",
    ))
    .expect("invalid pattern")
});

/// Split and clean an ingredients block into candidate name tokens.
/// Empty block yields an empty list.
pub fn tokenize(block: &str) -> Vec<String> {
    if block.trim().is_empty() {
        return Vec::new();
    }

    // Brackets out, broken words repaired before splitting.
    let mut cleaned = block.replace(['[', ']'], " ");
    for (re, fixed) in BROKEN_WORD_FIXES.iter() {
        cleaned = re.replace_all(&cleaned, *fixed).into_owned();
    }
    let cleaned = CONCENTRATION_PARENS.replace_all(&cleaned, "");

    // Split on commas, periods and newlines, then sub-split slash-joined
    // dual names (leaf/stem) — but never color-index notations (CI 77491).
    let parts: Vec<String> = SPLIT_SEPARATORS
        .split(&cleaned)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .flat_map(|p| {
            if COLOR_INDEX.is_match(p) {
                vec![p.to_string()]
            } else {
                SLASH.split(p).map(|s| s.trim().to_string()).collect()
            }
        })
        .collect();

    // Single-pass repair: a lone fragment-prone prefix merges with the
    // next token when the merge looks like a chemical name.
    let mut repaired: Vec<String> = Vec::with_capacity(parts.len());
    let mut i = 0;
    while i < parts.len() {
        let token = clean_token(&parts[i]);
        if is_noise_token(&token) {
            i += 1;
            continue;
        }

        let lower = token.to_lowercase();
        let is_lone_prefix =
            !lower.contains(' ') && FRAGMENT_PRONE_PREFIXES.contains(&lower.as_str());
        if is_lone_prefix && i + 1 < parts.len() {
            let next = clean_token(&parts[i + 1]);
            if !is_noise_token(&next) {
                let merged = format!("{token} {next}");
                if CHEMICAL_SUFFIX.is_match(&merged) {
                    repaired.push(merged);
                    i += 2;
                    continue;
                }
            }
        }

        repaired.push(token);
        i += 1;
    }

    // Final pass: trailing punctuation off, whitespace collapsed,
    // lowercase, empties and residual noise dropped.
    repaired
        .iter()
        .map(|t| {
            let t = WHITESPACE_RUNS.replace_all(t, " ");
            TRAILING_PUNCT.replace(t.trim(), "").trim().to_lowercase()
        })
        .filter(|t| !t.is_empty() && !is_noise_token(t))
        .collect()
}

fn clean_token(raw: &str) -> String {
    let t = EDGE_DASHES_DOTS.replace_all(raw, "");
    WHITESPACE_RUNS.replace_all(&t, " ").trim().to_string()
}

/// Tokens that cannot be ingredient names: too short, numeric or
/// punctuation only, Hangul, known noise words, or repeated characters.
fn is_noise_token(token: &str) -> bool {
    let t = token.trim().to_lowercase();
    if t.chars().count() <= 1 {
        return true;
    }
    if NUMERIC_PUNCT_ONLY.is_match(&t) {
        return true;
    }
    if t.chars()
        .any(|c| ('\u{3131}'..='\u{318E}').contains(&c) || ('\u{AC00}'..='\u{D7A3}').contains(&c))
    {
        return true;
    }
    if NOISE_WORDS.contains(&t.as_str()) {
        return true;
    }
    let len = t.chars().count();
    let is_valid_short = VALID_SHORT_TOKENS.contains(&t.as_str());
    if len < 3 && !is_valid_short {
        return true;
    }
    // Repeated single character ("aaa", "---")
    let mut chars = t.chars();
    if let Some(first) = chars.next() {
        if chars.clone().count() >= 1 && std::iter::once(first).chain(chars).all(|c| c == first) {
            return true;
        }
    }
    // Short all-caps fragments ("ANS", "DEL") unless allowlisted
    let trimmed = token.trim();
    if len < 4
        && !trimmed.is_empty()
        && trimmed.chars().all(|c| c.is_ascii_uppercase())
        && !is_valid_short
    {
        return true;
    }
    false
}
