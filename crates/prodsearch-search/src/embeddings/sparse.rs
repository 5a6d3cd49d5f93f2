//! BM25 query encoding
//!
//! The collection's `bm25` sparse vectors are built with the `Qdrant/bm25`
//! model: text is lowercased, split on non-word characters, stripped of
//! English stopwords, Snowball-stemmed, and each stem becomes the absolute
//! value of its signed 32-bit murmur3 hash (seed 0). Documents carry BM25
//! term-frequency weights and the collection has no IDF modifier, so a
//! query vector is one entry per distinct stem with weight 1.0.

use std::io::Cursor;

use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};

use crate::store::SparseVector;

/// Stems longer than this are dropped, as at index time
const MAX_TOKEN_LENGTH: usize = 40;

/// English stopwords shipped with the `Qdrant/bm25` model
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

static ENGLISH: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

/// Turns query text into a sparse vector
pub trait SparseEncoder: Send + Sync {
    fn encode(&self, text: &str) -> SparseVector;
}

/// Query-side encoder for `Qdrant/bm25` sparse vectors
#[derive(Debug, Clone, Default)]
pub struct Bm25QueryEncoder;

impl Bm25QueryEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Stemmed, stopword-free tokens in first-seen order, without duplicates.
    pub fn tokenize(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut stems: Vec<String> = Vec::new();
        for word in lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
        {
            if STOPWORDS.contains(&word) || word.chars().count() > MAX_TOKEN_LENGTH {
                continue;
            }
            let stem = ENGLISH.stem(word).into_owned();
            if stem.is_empty() || stems.contains(&stem) {
                continue;
            }
            stems.push(stem);
        }
        stems
    }

    /// Sparse index of a stem: `|murmur3_32(stem, 0) as i32|`.
    pub fn token_index(token: &str) -> Option<u32> {
        murmur3::murmur3_32(&mut Cursor::new(token.as_bytes()), 0)
            .ok()
            .map(|hash| (hash as i32).unsigned_abs())
    }
}

impl SparseEncoder for Bm25QueryEncoder {
    fn encode(&self, text: &str) -> SparseVector {
        let mut indices: Vec<u32> = Vec::new();
        for index in Self::tokenize(text)
            .iter()
            .filter_map(|token| Self::token_index(token))
        {
            // Distinct stems can collide; Qdrant rejects duplicate indices
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        let values = vec![1.0; indices.len()];
        SparseVector { indices, values }
    }
}
