//! ProdSearch Search - Product search over a Qdrant catalog
//!
//! This crate answers product queries against a vector-indexed catalog,
//! combining literal identifier lookup with embedding similarity.
//!
//! # Features
//!
//! - **Fusion search**: exact identifier lookup and dense vector search run
//!   concurrently and are merged with max-score-wins
//! - **Rank fusion**: client-side RRF over dense and BM25 sparse rankings
//! - **Query routing**: a rule-based classifier sends part-number-like
//!   queries to fusion search and everything else to RRF
//! - **Embedding cache**: bounded LRU in front of any OpenAI-compatible
//!   embedding endpoint
//!
//! # Example
//!
//! ```ignore
//! use prodsearch_config::SearchConfig;
//! use prodsearch_search::{SearchRequest, SearchService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = SearchService::connect(&SearchConfig::default()).await?;
//!
//!     // Routed by the classifier: this one goes to fusion search
//!     let response = service.search(&SearchRequest::new("HYP220479", 10)).await?;
//!     for hit in &response.hits {
//!         println!("{} {:.3} {}", hit.id, hit.score, hit.search_type);
//!     }
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod client;
pub mod embeddings;
pub mod error;
pub mod exact;
pub mod fusion;
pub mod orchestrator;
pub mod schema;
pub mod service;
pub mod stats;
pub mod store;
pub mod vector;

// Re-exports for convenience
pub use classifier::{Classification, PartNumberClassifier, Rejection, RuleHit};
pub use client::{QdrantConfig, QdrantStore};
pub use embeddings::{
    Bm25QueryEncoder, CacheMetrics, Embedder, EmbeddingCache, EmbeddingProviderType,
    OpenAIConfig, OpenAIEmbedder, ProviderStatus, SparseEncoder,
};
pub use error::{Result, SearchError};
pub use exact::ExactMatchSearcher;
pub use fusion::{fuse, reciprocal_rank_fusion, rrf_entries, RrfEntry, DEFAULT_RRF_K};
pub use orchestrator::{FusionOptions, FusionOrchestrator};
pub use schema::{Payload, ProductSummary, SearchHit, SearchType, StoredPoint};
pub use service::{
    EmbeddingCacheStats, ModeComparison, PayloadFilter, SearchMode, SearchRequest,
    SearchResponse, SearchService, ServiceStats, ServiceStatus, WarmupReport,
};
pub use stats::{PerformanceStats, StageTimings, StatsRecorder};
pub use store::{
    CollectionStatus, DenseQuery, HybridQuery, SparseQuery, SparseVector, VectorStore,
};
pub use vector::VectorSearcher;
