//! Embedder trait and status types
//!
//! The search engine only needs one operation from an embedding backend:
//! turn a query string into a dense vector. Every backend the service talks
//! to speaks the OpenAI embeddings protocol, so there is one production
//! implementation (`OpenAIEmbedder`); tests inject their own.

use async_trait::async_trait;
use serde::Serialize;

pub use prodsearch_config::EmbeddingProviderType;

use crate::error::Result;

/// Status of an embedding provider
///
/// Contains health and capability information for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    /// Whether the provider is available and responding
    pub available: bool,
    /// Type of provider
    pub provider_type: EmbeddingProviderType,
    /// Endpoint being used
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Detected embedding dimension, once known
    pub dimension: Option<usize>,
    /// Last health check latency in milliseconds
    pub latency_ms: Option<u64>,
    /// Error message if provider is unavailable
    pub error: Option<String>,
}

impl ProviderStatus {
    /// Create a status for a healthy provider
    pub fn healthy(
        provider_type: EmbeddingProviderType,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            available: true,
            provider_type,
            endpoint: endpoint.into(),
            model: model.into(),
            dimension: None,
            latency_ms: None,
            error: None,
        }
    }

    /// Create a status for an unavailable provider
    pub fn unavailable(provider_type: EmbeddingProviderType, error: impl Into<String>) -> Self {
        Self {
            available: false,
            provider_type,
            endpoint: "N/A".into(),
            model: "N/A".into(),
            dimension: None,
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    /// Set latency from a health check
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Set the detected dimension (ignored when zero)
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        if dimension > 0 {
            self.dimension = Some(dimension);
        }
        self
    }
}

/// Query embedder
///
/// Implementations must be deterministic for the same text: the
/// [`EmbeddingCache`](super::EmbeddingCache) relies on it.
///
/// # Example
///
/// ```ignore
/// use prodsearch_search::embeddings::Embedder;
///
/// async fn example(embedder: &dyn Embedder) -> prodsearch_search::Result<()> {
///     let status = embedder.check_status().await?;
///     if !status.available {
///         return Err(prodsearch_search::SearchError::ProviderUnavailable(
///             status.error.unwrap_or_default(),
///         ));
///     }
///
///     let vector = embedder.embed("gas torch").await?;
///     assert_eq!(vector.len(), embedder.dimension());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one query string.
    ///
    /// Fails with an embedding error; never returns a placeholder vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Check provider connectivity and status
    async fn check_status(&self) -> Result<ProviderStatus>;

    /// Embedding dimension (best guess until the first response is seen)
    fn dimension(&self) -> usize;

    /// Get the provider type identifier
    fn provider_type(&self) -> EmbeddingProviderType;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_status_healthy() {
        let status = ProviderStatus::healthy(
            EmbeddingProviderType::Tei,
            "http://localhost:8080",
            "BAAI/bge-small-en-v1.5",
        );
        assert!(status.available);
        assert!(status.error.is_none());
        assert!(status.dimension.is_none());
    }

    #[test]
    fn test_provider_status_unavailable() {
        let status =
            ProviderStatus::unavailable(EmbeddingProviderType::Openai, "Connection refused");
        assert!(!status.available);
        assert_eq!(status.error, Some("Connection refused".into()));
    }

    #[test]
    fn test_provider_status_builders() {
        let status = ProviderStatus::healthy(EmbeddingProviderType::Ollama, "x", "m")
            .with_latency(42)
            .with_dimension(0)
            .with_dimension(384);
        assert_eq!(status.latency_ms, Some(42));
        assert_eq!(status.dimension, Some(384));
    }

    #[test]
    fn test_embedder_is_object_safe() {
        fn _assert_object_safe(_: &dyn Embedder) {}
    }
}
