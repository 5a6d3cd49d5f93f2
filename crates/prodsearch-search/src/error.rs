//! Error types for prodsearch-search

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in prodsearch-search operations
#[derive(Error, Debug)]
pub enum SearchError {
    /// Vector store call failed
    #[error("Store error: {0}")]
    Store(String),

    /// Collection not found
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(String),

    // =========================================================================
    // Provider errors (all count as embedding failures)
    // =========================================================================
    /// Embedding provider unavailable
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Embedding dimension mismatch
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding API authentication failed
    #[error("Embedding API authentication failed: {0}")]
    EmbeddingAuth(String),

    /// Embedding API rate limited
    #[error("Embedding API rate limited, retry after {retry_after:?} seconds")]
    EmbeddingRateLimit { retry_after: Option<u64> },

    /// Embedding model not found
    #[error("Embedding model not found: {0}")]
    EmbeddingModelNotFound(String),

    // =========================================================================
    // Request-level errors
    // =========================================================================
    /// The search did not complete before its deadline
    #[error("{stage} timed out after {}ms", after.as_millis())]
    Timeout { stage: &'static str, after: Duration },

    /// Malformed request, rejected before any I/O
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A spawned search unit panicked or was cancelled
    #[error("Search task failed: {0}")]
    Task(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// True for any failure of the embedding provider.
    pub fn is_embedding(&self) -> bool {
        matches!(
            self,
            SearchError::Embedding(_)
                | SearchError::ProviderUnavailable(_)
                | SearchError::DimensionMismatch { .. }
                | SearchError::EmbeddingAuth(_)
                | SearchError::EmbeddingRateLimit { .. }
                | SearchError::EmbeddingModelNotFound(_)
        )
    }

    /// True for failures of the vector store or its connection.
    pub fn is_store(&self) -> bool {
        matches!(
            self,
            SearchError::Store(_) | SearchError::CollectionNotFound(_) | SearchError::Connection(_)
        )
    }

    /// True when the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SearchError::Timeout { .. })
    }
}

impl From<qdrant_client::QdrantError> for SearchError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        SearchError::Store(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SearchError {
    fn from(err: tokio::task::JoinError) -> Self {
        SearchError::Task(err.to_string())
    }
}

/// Result type for prodsearch-search operations
pub type Result<T> = std::result::Result<T, SearchError>;
