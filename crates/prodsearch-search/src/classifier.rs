//! Part-number query classifier
//!
//! Decides whether a raw query looks like a catalog part number
//! (`RAD64002019`, `HYP-220-479`, `model 1234`) or natural language
//! (`best gas torch for brazing`). Pure and deterministic: no I/O and no
//! shared state.
//!
//! Evaluation:
//! 1. Hard rejections, in order: blank, no digit, too short, multi-word query
//!    containing a search-intent term, leading document reference
//!    (`page 12`).
//! 2. Otherwise every signal adds or subtracts its configured weight, and the
//!    query is a part number when the total reaches the threshold.

use std::fmt;

use once_cell::sync::Lazy;
use prodsearch_config::{ClassifierSettings, ClassifierWeights};
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::{Result, SearchError};

static LETTERS_THEN_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,3}[0-9]{2,}").expect("Invalid letters-then-digits regex"));

static PART_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(p/n:|part|model|item|no\.)[\s:]+[a-z0-9]").expect("Invalid part label regex")
});

static REPEATED_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z]+[0-9]+){2,}").expect("Invalid repeated groups regex"));

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{3,}").expect("Invalid digit run regex"));

static KNOWN_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9]+(XL|AL|/[SML]|EU)$").expect("Invalid known suffix regex")
});

/// Why a query was rejected before scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Blank,
    NoDigits,
    TooShort { min_length: usize },
    SearchIntent,
    DocumentReference,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Blank => write!(f, "Empty query"),
            Rejection::NoDigits => write!(f, "Rejected: Contains no digits"),
            Rejection::TooShort { min_length } => {
                write!(f, "Rejected: Too short (< {} characters)", min_length)
            }
            Rejection::SearchIntent => write!(f, "Rejected: Multi-word query with search terms"),
            Rejection::DocumentReference => {
                write!(f, "Rejected: Starts with document reference term")
            }
        }
    }
}

impl Serialize for Rejection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One scoring signal that fired
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    /// Weight name in `[classifier.weights]`
    pub rule: &'static str,
    pub delta: i32,
    pub description: &'static str,
}

impl fmt::Display for RuleHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}: {}", self.delta, self.description)
    }
}

/// Classification with its full explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub query: String,
    pub is_part_number: bool,
    /// Zero when rejected
    pub score: i32,
    pub threshold: i32,
    /// Signals that fired, in evaluation order
    pub reasons: Vec<RuleHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl Classification {
    fn rejected(query: &str, threshold: i32, rejection: Rejection) -> Self {
        Self {
            query: query.to_string(),
            is_part_number: false,
            score: 0,
            threshold,
            reasons: Vec::new(),
            rejection: Some(rejection),
        }
    }

    /// Human-readable explanation lines (`"+3: Contains both letters and numbers"`).
    pub fn explanation(&self) -> Vec<String> {
        match self.rejection {
            Some(rejection) => vec![rejection.to_string()],
            None => self.reasons.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Heuristic part-number classifier
#[derive(Debug, Clone)]
pub struct PartNumberClassifier {
    threshold: i32,
    min_length: usize,
    ideal_length: (usize, usize),
    acceptable_length_max: usize,
    /// Uppercased
    prefixes: Vec<String>,
    /// Lowercased, for the substring hard rejection
    search_terms: Vec<String>,
    search_term_re: Option<Regex>,
    sentence_word_re: Option<Regex>,
    consumer_product_re: Option<Regex>,
    doc_ref_term_re: Option<Regex>,
    doc_ref_prefix_re: Option<Regex>,
    weights: ClassifierWeights,
}

/// `\b(?:t1|t2|..)\b` over lowercased terms; `None` for an empty list.
fn word_regex(terms: &[String]) -> Result<Option<Regex>> {
    if terms.is_empty() {
        return Ok(None);
    }
    let alternatives: Vec<String> = terms
        .iter()
        .map(|t| regex::escape(&t.to_lowercase()))
        .collect();
    compile(&format!(r"\b(?:{})\b", alternatives.join("|"))).map(Some)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| SearchError::InvalidConfig(format!("classifier pattern {:?}: {}", pattern, e)))
}

impl PartNumberClassifier {
    pub fn new(settings: &ClassifierSettings) -> Result<Self> {
        let doc_ref_prefix_re = if settings.doc_ref_prefixes.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = settings
                .doc_ref_prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect();
            Some(compile(&format!(
                r"(?i)^(?:{})\s+[0-9]",
                alternatives.join("|")
            ))?)
        };

        Ok(Self {
            threshold: settings.threshold,
            min_length: settings.min_length,
            ideal_length: settings.ideal_length,
            acceptable_length_max: settings.acceptable_length_max,
            prefixes: settings.prefixes.iter().map(|p| p.to_uppercase()).collect(),
            search_terms: settings
                .search_terms
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            search_term_re: word_regex(&settings.search_terms)?,
            sentence_word_re: word_regex(&settings.sentence_words)?,
            consumer_product_re: word_regex(&settings.consumer_products)?,
            doc_ref_term_re: word_regex(&settings.doc_ref_terms)?,
            doc_ref_prefix_re,
            weights: settings.weights.clone(),
        })
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// True when `query` looks like a part number.
    pub fn classify(&self, query: &str) -> bool {
        self.explain(query).is_part_number
    }

    /// Classify and report every rule that fired.
    pub fn explain(&self, query: &str) -> Classification {
        let cleaned = query.trim();
        if cleaned.is_empty() {
            return Classification::rejected(query, self.threshold, Rejection::Blank);
        }

        let words = cleaned.split_whitespace().count();
        let length = cleaned.chars().count();
        let lower = cleaned.to_lowercase();
        let has_digit = cleaned.chars().any(|c| c.is_ascii_digit());
        let has_letter = cleaned.chars().any(|c| c.is_ascii_alphabetic());

        if !has_digit {
            return Classification::rejected(query, self.threshold, Rejection::NoDigits);
        }
        if length < self.min_length {
            return Classification::rejected(
                query,
                self.threshold,
                Rejection::TooShort {
                    min_length: self.min_length,
                },
            );
        }
        // Substring test: "showroom" counts as containing "how"
        if words > 2 && self.search_terms.iter().any(|t| lower.contains(t.as_str())) {
            return Classification::rejected(query, self.threshold, Rejection::SearchIntent);
        }
        if self
            .doc_ref_prefix_re
            .as_ref()
            .is_some_and(|re| re.is_match(cleaned))
        {
            return Classification::rejected(query, self.threshold, Rejection::DocumentReference);
        }

        let w = &self.weights;
        let mut reasons = Vec::new();
        let mut fire = |fired: bool, rule: &'static str, delta: i32, description: &'static str| {
            if fired {
                reasons.push(RuleHit {
                    rule,
                    delta,
                    description,
                });
            }
        };

        fire(
            has_letter,
            "letters_and_digits",
            w.letters_and_digits,
            "Contains both letters and numbers",
        );

        let (ideal_min, ideal_max) = self.ideal_length;
        if (ideal_min..=ideal_max).contains(&length) {
            fire(
                true,
                "ideal_length",
                w.ideal_length,
                "Length is in typical part number range",
            );
        } else {
            fire(
                length > ideal_max && length <= self.acceptable_length_max,
                "acceptable_length",
                w.acceptable_length,
                "Length is in acceptable part number range",
            );
        }

        fire(
            cleaned.contains(['-', '.', '/']),
            "separator",
            w.separator,
            "Contains a dash, dot or specific separator",
        );

        let upper = cleaned.to_uppercase();
        fire(
            self.prefixes.iter().any(|p| upper.starts_with(p.as_str())),
            "known_prefix",
            w.known_prefix,
            "Starts with a common part number prefix",
        );
        fire(
            LETTERS_THEN_DIGITS.is_match(cleaned),
            "letters_then_digits",
            w.letters_then_digits,
            "Has a typical part number pattern structure (letters then numbers)",
        );
        fire(
            cleaned.starts_with(|c: char| c.is_ascii_alphabetic()),
            "starts_with_letter",
            w.starts_with_letter,
            "Starts with letters",
        );
        fire(
            PART_LABEL.is_match(cleaned),
            "part_label",
            w.part_label,
            "Begins with specific part number prefix",
        );
        fire(
            REPEATED_GROUPS.is_match(cleaned),
            "repeated_groups",
            w.repeated_groups,
            "Has repeating alpha-numeric patterns",
        );
        fire(
            DIGIT_RUN.is_match(cleaned),
            "digit_run",
            w.digit_run,
            "Contains numbers with 3+ digits",
        );
        fire(
            KNOWN_SUFFIX.is_match(cleaned),
            "known_suffix",
            w.known_suffix,
            "Has a specific suffix (XL, AL, etc.)",
        );

        let matches = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(&lower));

        fire(
            matches(&self.search_term_re),
            "search_term",
            w.search_term,
            "Contains typical search terms",
        );
        if words >= 4 {
            fire(
                true,
                "four_plus_words",
                w.four_plus_words,
                "Has 4+ words separated by spaces",
            );
        } else {
            fire(
                words == 3,
                "three_words",
                w.three_words,
                "Has 3 words separated by spaces",
            );
        }
        fire(
            matches(&self.sentence_word_re),
            "sentence_word",
            w.sentence_word,
            "Contains words that look like a sentence",
        );
        fire(
            matches(&self.consumer_product_re),
            "consumer_product",
            w.consumer_product,
            "Contains a consumer product name",
        );
        fire(
            matches(&self.doc_ref_term_re),
            "doc_ref_term",
            w.doc_ref_term,
            "Contains common document references",
        );

        let score: i32 = reasons.iter().map(|r| r.delta).sum();
        Classification {
            query: query.to_string(),
            is_part_number: score >= self.threshold,
            score,
            threshold: self.threshold,
            reasons,
            rejection: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classifier() -> PartNumberClassifier {
        PartNumberClassifier::new(&ClassifierSettings::default()).unwrap()
    }

    #[test]
    fn test_boundary_cases() {
        let c = classifier();
        assert!(!c.classify(""));
        assert!(!c.classify("   "));
        assert!(!c.classify("abc"));
        assert!(c.classify("RAD64002019"));
        assert!(!c.classify("how much is the best torch"));
    }

    #[test]
    fn test_known_part_number_explanation() {
        let result = classifier().explain("RAD64002019");

        assert!(result.is_part_number);
        assert_eq!(result.score, 12);
        assert_eq!(
            result.explanation(),
            vec![
                "+3: Contains both letters and numbers",
                "+2: Length is in typical part number range",
                "+3: Starts with a common part number prefix",
                "+2: Has a typical part number pattern structure (letters then numbers)",
                "+1: Starts with letters",
                "+1: Contains numbers with 3+ digits",
            ]
        );
    }

    #[test]
    fn test_rejections() {
        let c = classifier();
        assert_eq!(c.explain("").rejection, Some(Rejection::Blank));
        assert_eq!(c.explain("abcd").rejection, Some(Rejection::NoDigits));
        assert_eq!(
            c.explain("a1").rejection,
            Some(Rejection::TooShort { min_length: 4 })
        );
        assert_eq!(
            c.explain("best 3 inch torch").rejection,
            Some(Rejection::SearchIntent)
        );
        assert_eq!(
            c.explain("Page 12").rejection,
            Some(Rejection::DocumentReference)
        );
        assert_eq!(
            c.explain("room 101").explanation(),
            vec!["Rejected: Starts with document reference term"]
        );
    }

    #[test]
    fn test_search_term_rejection_matches_substrings() {
        // "showa" contains "how"
        let result = classifier().explain("SHOWA 300 glove");
        assert_eq!(result.rejection, Some(Rejection::SearchIntent));
    }

    #[test]
    fn test_two_words_with_search_term_is_scored_not_rejected() {
        let result = classifier().explain("best 12345");
        assert!(result.rejection.is_none());
        assert!(result.reasons.iter().any(|r| r.rule == "search_term"));
    }

    #[test]
    fn test_separated_part_number() {
        let result = classifier().explain("HYP-220-479");
        assert!(result.is_part_number);
        assert_eq!(result.score, 12);
        assert!(result.reasons.iter().any(|r| r.rule == "separator"));
    }

    #[test]
    fn test_part_label() {
        let result = classifier().explain("model 1234");
        assert!(result.is_part_number);
        assert!(result.reasons.iter().any(|r| r.rule == "part_label"));
    }

    #[test]
    fn test_consumer_product_penalty() {
        let result = classifier().explain("iphone 15 case");

        assert!(!result.is_part_number);
        assert_eq!(result.score, 1);
        let rules: Vec<&str> = result.reasons.iter().map(|r| r.rule).collect();
        assert_eq!(
            rules,
            vec![
                "letters_and_digits",
                "ideal_length",
                "starts_with_letter",
                "three_words",
                "consumer_product",
            ]
        );
    }

    #[test]
    fn test_known_suffix_and_repeated_groups() {
        let result = classifier().explain("AB12CD34XL");
        let rules: Vec<&str> = result.reasons.iter().map(|r| r.rule).collect();
        assert!(rules.contains(&"repeated_groups"));
        assert!(rules.contains(&"known_suffix"));
        assert!(result.is_part_number);
    }

    #[test]
    fn test_acceptable_length() {
        let result = classifier().explain("X12345678901234567");
        assert!(result.reasons.iter().any(|r| r.rule == "acceptable_length"));
        assert!(!result.reasons.iter().any(|r| r.rule == "ideal_length"));
    }

    #[test]
    fn test_threshold_and_weights_are_configurable() {
        let strict = PartNumberClassifier::new(&ClassifierSettings {
            threshold: 13,
            ..Default::default()
        })
        .unwrap();
        assert!(!strict.classify("RAD64002019"));

        let mut settings = ClassifierSettings::default();
        settings.weights.known_prefix = 10;
        let result = PartNumberClassifier::new(&settings)
            .unwrap()
            .explain("RAD64002019");
        assert_eq!(result.score, 19);
    }

    #[test]
    fn test_explain_is_pure() {
        let c = classifier();
        assert_eq!(c.explain("NOR 9000-11"), c.explain("NOR 9000-11"));
    }

    #[test]
    fn test_classification_serializes() {
        let value = serde_json::to_value(classifier().explain("abc")).unwrap();
        assert_eq!(value["is_part_number"], false);
        assert_eq!(value["rejection"], "Rejected: Contains no digits");
    }

    #[test]
    fn test_terms_are_escaped() {
        let mut settings = ClassifierSettings::default();
        settings.doc_ref_terms.push("rev.".into());
        settings.search_terms.push("c++".into());
        assert!(PartNumberClassifier::new(&settings).is_ok());
    }
}
