//! Hit and point types shared by every search path
//!
//! `StoredPoint` is what the vector store hands back; `SearchHit` is what the
//! searchers, fusers and the service pass around and return to callers.

use std::fmt;
use std::str::FromStr;

use prodsearch_config::SchemaConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Payload record of a stored product.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A point returned by the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    /// Store-native point id (numeric or UUID, rendered as a string)
    pub point_id: String,
    /// Relevance score as reported by the store
    pub score: f32,
    /// Payload record
    pub payload: Payload,
}

impl StoredPoint {
    pub fn new(point_id: impl Into<String>, score: f32, payload: Payload) -> Self {
        Self {
            point_id: point_id.into(),
            score,
            payload,
        }
    }
}

/// Provenance of a hit: which search path(s) produced it.
///
/// Renders as the path tag, with composites joined by `+`
/// (e.g. `exact+vector`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchType {
    /// Primary identifier field exact match
    Exact,
    /// Manufacturer part number exact match
    ExactMfg,
    /// Dense vector similarity (fusion path, floored)
    Vector,
    /// Plain dense search
    Dense,
    /// BM25 sparse search
    Sparse,
    /// Store-side hybrid fusion
    Hybrid,
    /// Client-side reciprocal rank fusion
    Rrf,
    /// Exact match on an additional configured field
    Field(String),
    /// Found by more than one path
    Composite(Vec<SearchType>),
}

impl SearchType {
    /// Map a configured provenance tag to its type.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "exact" => SearchType::Exact,
            "exact_mfg" => SearchType::ExactMfg,
            "vector" => SearchType::Vector,
            "dense" => SearchType::Dense,
            "sparse" => SearchType::Sparse,
            "hybrid" => SearchType::Hybrid,
            "rrf" => SearchType::Rrf,
            other => SearchType::Field(other.to_string()),
        }
    }

    /// `{self}+{other}`, flattened.
    pub fn combine(&self, other: &SearchType) -> SearchType {
        let mut parts = self.parts();
        parts.extend(other.parts());
        SearchType::Composite(parts)
    }

    /// Single-path components in order.
    pub fn parts(&self) -> Vec<SearchType> {
        match self {
            SearchType::Composite(parts) => parts.iter().flat_map(|p| p.parts()).collect(),
            single => vec![single.clone()],
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, SearchType::Composite(parts) if parts.len() > 1)
    }

    /// True if `kind` is this type or one of its components.
    pub fn includes(&self, kind: &SearchType) -> bool {
        self.parts().iter().any(|p| p == kind)
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchType::Exact => write!(f, "exact"),
            SearchType::ExactMfg => write!(f, "exact_mfg"),
            SearchType::Vector => write!(f, "vector"),
            SearchType::Dense => write!(f, "dense"),
            SearchType::Sparse => write!(f, "sparse"),
            SearchType::Hybrid => write!(f, "hybrid"),
            SearchType::Rrf => write!(f, "rrf"),
            SearchType::Field(tag) => write!(f, "{}", tag),
            SearchType::Composite(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "+")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for SearchType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<SearchType> = s.split('+').map(SearchType::from_tag).collect();
        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            Ok(SearchType::Composite(parts))
        }
    }
}

impl Serialize for SearchType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SearchType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Catalog identifier (the id field of the payload, falling back to the point id)
    pub id: String,
    /// Relevance score on the scale of its search type
    pub score: f64,
    /// Payload record
    pub payload: Payload,
    /// Which path(s) produced this hit
    pub search_type: SearchType,
    /// Store-native point id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl SearchHit {
    /// Build a hit from a stored point, resolving its catalog id from `id_field`.
    pub fn from_point(
        point: StoredPoint,
        id_field: &str,
        score: f64,
        search_type: SearchType,
    ) -> Self {
        let id = point
            .payload
            .get(id_field)
            .and_then(scalar_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| point.point_id.clone());

        Self {
            id,
            score,
            payload: point.payload,
            search_type,
            source_id: Some(point.point_id),
        }
    }

    /// String payload field, if present.
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(|v| v.as_str())
    }
}

/// Text form of a scalar payload value; `None` for null, arrays and objects.
fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flattened product view for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub id: String,
    pub description: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub price: Option<String>,
    pub image: Option<String>,
    /// Score rounded to three decimals
    pub score: f64,
    pub search_type: String,
}

impl ProductSummary {
    pub fn from_hit(hit: &SearchHit, schema: &SchemaConfig) -> Self {
        let field = |name: &str| hit.payload_str(name).map(str::to_string);
        Self {
            id: hit.id.clone(),
            description: field(&schema.text_field),
            manufacturer_part_number: field(&schema.mfg_part_field),
            price: field(&schema.price_field),
            image: field(&schema.image_field),
            score: (hit.score * 1000.0).round() / 1000.0,
            search_type: hit.search_type.to_string(),
        }
    }
}
