//! Part-number classifier tuning.
//!
//! The weights and vocabularies below were tuned empirically against the
//! product catalog's query logs. They are plain data so a deployment can
//! retune them from `config.toml` without touching the scoring code.

use serde::{Deserialize, Serialize};

/// Classifier settings: decision threshold, hard-rejection limits, signal
/// weights and the term lists the signals look for.
///
/// # Example TOML
///
/// ```toml
/// [classifier]
/// threshold = 5
/// prefixes = ["RAD", "HYP", "LIN"]
///
/// [classifier.weights]
/// known_prefix = 4
/// search_term = -5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierSettings {
    /// A query is a part number when its score reaches this value
    pub threshold: i32,

    /// Queries shorter than this (in characters) are rejected outright
    pub min_length: usize,

    /// Inclusive length range that earns `weights.ideal_length`
    pub ideal_length: (usize, usize),

    /// Upper bound of the range above `ideal_length` that earns
    /// `weights.acceptable_length`
    pub acceptable_length_max: usize,

    /// Known catalog prefixes (matched case-insensitively at the start)
    pub prefixes: Vec<String>,

    /// Terms that signal a natural-language search
    pub search_terms: Vec<String>,

    /// Function words that signal a sentence
    pub sentence_words: Vec<String>,

    /// Consumer brand/product terms that look like models but are not catalog items
    pub consumer_products: Vec<String>,

    /// Document reference terms
    pub doc_ref_terms: Vec<String>,

    /// Leading words that, followed by a number, reject the query outright
    pub doc_ref_prefixes: Vec<String>,

    /// Signal weights
    pub weights: ClassifierWeights,
}

/// Point deltas for each classifier signal. Negative signals carry their sign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierWeights {
    pub letters_and_digits: i32,
    pub ideal_length: i32,
    pub acceptable_length: i32,
    pub separator: i32,
    pub known_prefix: i32,
    pub letters_then_digits: i32,
    pub starts_with_letter: i32,
    pub part_label: i32,
    pub repeated_groups: i32,
    pub digit_run: i32,
    pub known_suffix: i32,
    pub search_term: i32,
    pub four_plus_words: i32,
    pub three_words: i32,
    pub sentence_word: i32,
    pub consumer_product: i32,
    pub doc_ref_term: i32,
}

impl Default for ClassifierWeights {
    fn default() -> Self {
        Self {
            letters_and_digits: 3,
            ideal_length: 2,
            acceptable_length: 1,
            separator: 2,
            known_prefix: 3,
            letters_then_digits: 2,
            starts_with_letter: 1,
            part_label: 2,
            repeated_groups: 2,
            digit_run: 1,
            known_suffix: 1,
            search_term: -4,
            four_plus_words: -4,
            three_words: -2,
            sentence_word: -3,
            consumer_product: -3,
            doc_ref_term: -3,
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            threshold: 4,
            min_length: 4,
            ideal_length: (5, 16),
            acceptable_length_max: 20,
            prefixes: words(&[
                "RAD", "PIP", "MIL", "LIN", "NOR", "MSA", "ESA", "HYP", "KOI", "WBU", "CBR", "HOU",
                "BOS", "VIC", "AMS", "E57", "NI",
            ]),
            search_terms: words(&[
                "how", "what", "where", "when", "why", "find", "best", "good", "better", "top",
                "review", "price", "vs", "versus", "buy", "compare",
            ]),
            sentence_words: words(&[
                "a", "an", "the", "of", "in", "for", "to", "with", "by", "is", "are", "this",
                "that", "these", "those",
            ]),
            consumer_products: words(&["iphone", "macbook", "surface", "galaxy", "kindle", "gtx"]),
            doc_ref_terms: words(&["page", "table", "figure", "section", "chapter", "version"]),
            doc_ref_prefixes: words(&["page", "table", "figure", "section", "chapter", "room"]),
            weights: ClassifierWeights::default(),
        }
    }
}
