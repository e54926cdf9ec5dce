//! Rule-based text classifier
//!
//! Pure functions mapping raw feedback text (possibly mixed Tamil/English,
//! informal) to a structured [`Annotation`]: category, per-feedback priority,
//! canned main-issue sentence, and a short summary. No external state and no
//! cross-item dependency — classification never fails for well-formed string
//! input.
//!
//! The pipeline is: best-effort normalization to English, keyword-scored
//! category detection, ordered priority rules, then lookup-driven main issue
//! and summary.

pub mod lexicon;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Annotation, Priority};
use lexicon::{
    CATEGORY_KEYWORDS, CATEGORY_OTHER, GENERIC_ISSUE, HIGH_URGENCY_TERMS, LANGUAGE_MARKERS,
    MAIN_ISSUES, MEDIUM_URGENCY_TERMS, PHRASE_TABLE, WORD_LEXICON,
};

/// A numeric span followed by a day/week unit ("3 days", "2 weeks") signals
/// a long-standing problem and escalates priority before any keyword rule.
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\s*(day|days|week|weeks)\b").expect("valid duration regex"));

/// Detected source language of a feedback text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Tamil,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Tamil => "ta",
            Language::English => "en",
        }
    }
}

/// Flag a text as Tamil-mixed if any romanized marker appears in it
pub fn detect_language(text: &str) -> Language {
    let lower = text.to_lowercase();
    if LANGUAGE_MARKERS.iter().any(|m| lower.contains(m)) {
        Language::Tamil
    } else {
        Language::English
    }
}

/// Best-effort normalization of mixed-language text to English
///
/// Lowercases, replaces known whole phrases, then maps individual tokens
/// through the word lexicon (punctuation stripped per token). Unmapped
/// foreign tokens pass through unchanged. This is not real translation.
pub fn translate(text: &str) -> String {
    let mut lower = text.to_lowercase();
    for (phrase, replacement) in PHRASE_TABLE {
        lower = lower.replace(phrase, replacement);
    }

    let translated: Vec<String> = lower
        .split_whitespace()
        .map(|token| {
            let clean = strip_punctuation(token);
            match lookup_word(&clean) {
                Some(english) => english.to_string(),
                None => clean,
            }
        })
        .collect();

    capitalize_first(&translated.join(" "))
}

fn strip_punctuation(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

fn lookup_word(word: &str) -> Option<&str> {
    WORD_LEXICON
        .iter()
        .find(|(tamil, _)| *tamil == word)
        .map(|(_, english)| *english)
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Score each category by keyword substring hits; highest wins
///
/// Ties resolve to the earliest entry in the category table. A best score
/// of zero means the text is uncategorized ("Other").
pub fn detect_category(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let mut best = (CATEGORY_OTHER, 0usize);
    for &(category, keywords) in CATEGORY_KEYWORDS {
        let score = keywords.iter().filter(|kw| lower.contains(*kw)).count();
        if score > best.1 {
            best = (category, score);
        }
    }
    best.0
}

/// Ordered priority rules — first match wins
///
/// The duration rule outranks keyword rules so "no water for 5 days" is High
/// even without an urgency term.
static PRIORITY_RULES: &[(fn(&str) -> bool, Priority)] = &[
    (mentions_duration, Priority::High),
    (has_high_urgency_term, Priority::High),
    (has_medium_urgency_term, Priority::Medium),
];

fn mentions_duration(text: &str) -> bool {
    DURATION_RE.is_match(text)
}

fn has_high_urgency_term(text: &str) -> bool {
    HIGH_URGENCY_TERMS.iter().any(|t| text.contains(t))
}

fn has_medium_urgency_term(text: &str) -> bool {
    MEDIUM_URGENCY_TERMS.iter().any(|t| text.contains(t))
}

/// Per-feedback priority from the ordered rule list
pub fn detect_priority(text: &str) -> Priority {
    let lower = text.to_lowercase();
    PRIORITY_RULES
        .iter()
        .find(|(rule, _)| rule(&lower))
        .map(|(_, priority)| *priority)
        .unwrap_or(Priority::Low)
}

/// Canned main-issue sentence for a category
pub fn main_issue(category: &str) -> &'static str {
    MAIN_ISSUES
        .iter()
        .find(|(cat, _)| *cat == category)
        .map(|(_, sentence)| *sentence)
        .unwrap_or(GENERIC_ISSUE)
}

/// First 15 words of the text, ellipsized when truncated
pub fn summarize(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > 15 {
        format!("{}...", words[..15].join(" "))
    } else {
        text.to_string()
    }
}

/// Classify one feedback text into a full annotation
///
/// Applied independently per text; safe to call concurrently.
pub fn annotate(text: &str) -> Annotation {
    let translated = translate(text);
    let category = detect_category(&translated);
    let priority = detect_priority(&translated);

    Annotation {
        category: category.to_string(),
        priority,
        main_issue: main_issue(category).to_string(),
        summary: summarize(&translated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("thanni varala in my street"), Language::Tamil);
        assert_eq!(detect_language("the tap is leaking"), Language::English);
    }

    #[test]
    fn test_translate_phrase_before_words() {
        // "current cut" is a phrase-table entry; the result should not be
        // the word-by-word "power cut" applied twice.
        assert_eq!(translate("current cut in my area"), "Power cut in my area");
    }

    #[test]
    fn test_translate_word_lexicon() {
        assert_eq!(translate("kuppai everywhere"), "Garbage everywhere");
    }

    #[test]
    fn test_translate_strips_punctuation_and_passes_unknowns() {
        // Unmapped tokens survive with punctuation stripped.
        assert_eq!(translate("thanni varala!!"), "Water is not coming");
        assert_eq!(translate("Vandi nikkala."), "Vandi nikkala");
    }

    #[test]
    fn test_category_scoring_picks_highest() {
        assert_eq!(detect_category("water pipe leak near the tap"), "Water");
        assert_eq!(detect_category("garbage smell from the drain"), "Sanitation");
    }

    #[test]
    fn test_category_unmatched_is_other() {
        assert_eq!(detect_category("nothing relevant here"), "Other");
    }

    #[test]
    fn test_category_tie_resolves_by_table_order() {
        // "supply" scores Water, "power" scores Electricity: 1-1 tie goes to
        // Water because it is enumerated first.
        assert_eq!(detect_category("supply power"), "Water");
    }

    #[test]
    fn test_priority_duration_rule_first() {
        assert_eq!(detect_priority("no supply for 3 days"), Priority::High);
        assert_eq!(detect_priority("pending since 2 weeks"), Priority::High);
    }

    #[test]
    fn test_priority_keyword_rules_in_order() {
        // High-urgency term wins even when a medium term is present too.
        assert_eq!(detect_priority("urgent problem near school"), Priority::High);
        assert_eq!(detect_priority("staff ignored my request"), Priority::Medium);
        assert_eq!(detect_priority("everything is fine"), Priority::Low);
    }

    #[test]
    fn test_priority_high_regardless_of_category() {
        for text in ["urgent water leak", "danger on the road", "worst hospital"] {
            assert_eq!(detect_priority(text), Priority::High, "text: {}", text);
        }
    }

    #[test]
    fn test_main_issue_lookup() {
        assert_eq!(main_issue("Water"), "Water supply issue in the area");
        assert_eq!(main_issue("Other"), "General issue reported");
        assert_eq!(main_issue("NotACategory"), "General issue reported");
    }

    #[test]
    fn test_summary_truncation() {
        let short = "only three words";
        assert_eq!(summarize(short), short);

        let long = (1..=20)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let summary = summarize(&long);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.split_whitespace().count(), 15);
    }

    #[test]
    fn test_annotate_power_cut_scenario() {
        let annotation = annotate("current cut for 3 days in my area");
        assert_eq!(annotation.category, "Electricity");
        assert_eq!(annotation.priority, Priority::High);
        assert_eq!(annotation.main_issue, "Power supply disruption in the area");
        assert_eq!(annotation.summary, "Power cut for 3 days in my area");
    }

    #[test]
    fn test_annotate_uncategorized() {
        let annotation = annotate("everything is wonderful");
        assert_eq!(annotation.category, "Other");
        assert_eq!(annotation.priority, Priority::Low);
        assert_eq!(annotation.main_issue, "General issue reported");
    }

    #[test]
    fn test_annotate_is_deterministic() {
        let text = "thanni varala romba kastama iruku";
        let a = annotate(text);
        let b = annotate(text);
        assert_eq!(a.category, b.category);
        assert_eq!(a.summary, b.summary);
    }
}
