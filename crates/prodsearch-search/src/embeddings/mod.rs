//! Query embedding
//!
//! - [`Embedder`] - dense query embedding trait, with the HTTP
//!   [`OpenAIEmbedder`] as production implementation
//! - [`EmbeddingCache`] - bounded LRU memo in front of an embedder
//! - [`SparseEncoder`] - BM25 query vectors for the sparse index

mod cache;
mod openai;
mod provider;
mod sparse;

pub use cache::{CacheMetrics, EmbeddingCache};
pub use openai::{OpenAIConfig, OpenAIEmbedder};
pub use provider::{Embedder, EmbeddingProviderType, ProviderStatus};
pub use sparse::{Bm25QueryEncoder, SparseEncoder};
