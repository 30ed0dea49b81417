//! Prompt construction for the generative enrichment tier.
//!
//! One user prompt per batch: numbered ingredient names, the closed
//! field contract, and any high-confidence safety context the retriever
//! produced. The reply contract is a JSON array in input order with no
//! extra fields.

use std::collections::HashMap;

use crate::pipeline::retrieval::SafetyMatch;

pub const SYSTEM_PROMPT: &str =
    "You are a skincare ingredient expert. Provide accurate, concise information in JSON format.";

const GOOD_FOR_KEYWORDS: &str = "['oily', 'dry', 'combination', 'sensitive', 'normal', 'acne', \
     'aging', 'pigmentation', 'sensitivity', 'oiliness', 'dryness']";

const RISK_LEVELS: &str = "['no-risk', 'low-risk', 'moderate-risk', 'high-risk', 'unknown']";

/// Build the user prompt for one batch of names. `context` carries the
/// retriever hits already filtered to the confidence bar; names without
/// context simply get no safety lines.
pub fn user_prompt(names: &[String], context: &HashMap<String, Vec<SafetyMatch>>) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(
        "For each of the following skincare ingredients, return a JSON array where each object \
         has ONLY these fields:\n",
    );
    prompt.push_str("- name: The standard INCI name (should match the input name)\n");
    prompt.push_str("- description: A brief, informative description (1-2 sentences)\n");
    prompt.push_str("- benefits: Array of 3-4 key benefits (each as a full sentence)\n");
    prompt.push_str(&format!(
        "- good_for: Array of specific keywords for skin types, conditions, or situations. \
         You MUST select ONLY from this exact list: {GOOD_FOR_KEYWORDS}. Do NOT use generic \
         terms like \"all\" or \"all skin types\". If an ingredient is suitable for multiple \
         types, list them individually.\n"
    ));
    prompt.push_str(&format!(
        "- risk_level: One of {RISK_LEVELS} indicating the safety risk of the ingredient\n"
    ));
    prompt.push_str(
        "- reason: A brief explanation (1-2 sentences) for the assigned risk level\n",
    );

    prompt.push_str("Ingredients:\n");
    for (i, name) in names.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, name));
    }

    let mut context_lines: Vec<String> = Vec::new();
    for name in names {
        if let Some(matches) = context.get(name) {
            for m in matches {
                if m.details.is_empty() {
                    continue;
                }
                context_lines.push(format!("- {} ({}): {}", m.name, m.risk, m.details));
            }
        }
    }
    if !context_lines.is_empty() {
        prompt.push_str(
            "Known safety data for some of these ingredients, to ground your risk assessment:\n",
        );
        for line in &context_lines {
            prompt.push_str(line);
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "Return a JSON array of objects, one for each ingredient, in the same order as listed \
         above. Do not include any extra fields.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn safety_match(name: &str, details: &str) -> SafetyMatch {
        SafetyMatch {
            name: name.into(),
            risk: "high".into(),
            details: details.into(),
            similarity: 0.9,
        }
    }

    #[test]
    fn numbers_names_in_order() {
        let names = vec!["Water".to_string(), "Glycerin".to_string()];
        let prompt = user_prompt(&names, &HashMap::new());
        assert!(prompt.contains("1. Water\n"));
        assert!(prompt.contains("2. Glycerin\n"));
    }

    #[test]
    fn states_the_closed_field_contract() {
        let prompt = user_prompt(&["Retinol".to_string()], &HashMap::new());
        assert!(prompt.contains("ONLY these fields"));
        assert!(prompt.contains("'no-risk', 'low-risk', 'moderate-risk', 'high-risk', 'unknown'"));
        assert!(prompt.contains("Do NOT use generic terms"));
        assert!(prompt.contains("Do not include any extra fields."));
    }

    #[test]
    fn includes_safety_context_when_present() {
        let names = vec!["Hydroquinone".to_string()];
        let mut context = HashMap::new();
        context.insert(
            "Hydroquinone".to_string(),
            vec![safety_match("Hydroquinone", "Banned in EU cosmetics")],
        );
        let prompt = user_prompt(&names, &context);
        assert!(prompt.contains("Known safety data"));
        assert!(prompt.contains("Banned in EU cosmetics"));
    }

    #[test]
    fn omits_context_section_without_hits() {
        let prompt = user_prompt(&["Water".to_string()], &HashMap::new());
        assert!(!prompt.contains("Known safety data"));
    }

    #[test]
    fn skips_context_entries_without_details() {
        let mut context = HashMap::new();
        context.insert("Water".to_string(), vec![safety_match("Water", "")]);
        let prompt = user_prompt(&["Water".to_string()], &context);
        assert!(!prompt.contains("Known safety data"));
    }
}
