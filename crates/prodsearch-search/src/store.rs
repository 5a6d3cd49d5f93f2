//! Vector store trait definition.
//!
//! The search engine never talks to Qdrant directly; it issues calls
//! against `VectorStore`, which `QdrantStore` implements for production and
//! test doubles implement in tests.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::schema::StoredPoint;

/// Sparse vector in index/value form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Nearest-neighbor query against a dense vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseQuery {
    pub vector: Vec<f32>,
    /// Named vector to search
    pub using: String,
    pub limit: u64,
    /// HNSW search-quality parameter
    pub hnsw_ef: Option<u64>,
}

/// Query against a sparse (BM25) vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseQuery {
    pub vector: SparseVector,
    /// Named sparse vector to search
    pub using: String,
    pub limit: u64,
}

/// Store-side hybrid query: both legs are prefetched and fused with RRF by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    pub dense: DenseQuery,
    pub sparse: SparseQuery,
    pub limit: u64,
}

/// Collection health as reported by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionStatus {
    pub name: String,
    pub exists: bool,
    pub points_count: Option<u64>,
    pub indexed_vectors_count: Option<u64>,
}

impl CollectionStatus {
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exists: false,
            points_count: None,
            indexed_vectors_count: None,
        }
    }
}

/// Read-only access to the product collection.
///
/// Implementations must be safe to call from concurrent search paths;
/// an empty result is never an error.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Points whose keyword-indexed `field` equals `value`, at most `limit`.
    ///
    /// Exact matches carry no relevance; implementations report score 1.0.
    async fn exact_match(&self, field: &str, value: &str, limit: usize) -> Result<Vec<StoredPoint>>;

    /// Nearest neighbours of a dense vector, best first.
    async fn vector_search(&self, query: DenseQuery) -> Result<Vec<StoredPoint>>;

    /// Best matches of a sparse vector, best first.
    async fn sparse_search(&self, query: SparseQuery) -> Result<Vec<StoredPoint>>;

    /// Dense + sparse fused by the store itself, best first.
    async fn hybrid_search(&self, query: HybridQuery) -> Result<Vec<StoredPoint>>;

    /// Whether the collection exists and how large it is.
    async fn collection_status(&self) -> Result<CollectionStatus>;
}
