//! OpenAI-compatible query embedder
//!
//! Talks to any server implementing the OpenAI embeddings protocol:
//! - OpenAI / Azure OpenAI
//! - Ollama (`/v1` compatibility layer)
//! - text-embeddings-inference
//!
//! # Endpoint Format
//!
//! - POST `{base_url}/v1/embeddings`
//! - Request: `{"model": "...", "input": ["query"]}`
//! - Response: `{"data": [{"embedding": [...], "index": 0}], ...}`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prodsearch_config::{EmbeddingConfig, OpenAISettings};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(feature = "rate-limit")]
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
#[cfg(feature = "rate-limit")]
use std::num::NonZeroU32;
#[cfg(feature = "rate-limit")]
use std::sync::Arc;

use super::provider::{Embedder, EmbeddingProviderType, ProviderStatus};
use crate::error::{Result, SearchError};

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Default requests per second limit
#[cfg(feature = "rate-limit")]
const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

#[cfg(feature = "rate-limit")]
type EmbedRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Resolved connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Which preset or provider this endpoint represents
    pub provider_type: EmbeddingProviderType,
    /// Base URL (e.g., "https://api.openai.com/v1" or "http://localhost:8080")
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Use Azure OpenAI header format (api-key instead of Bearer)
    pub azure_mode: bool,
    /// Requests per second limit
    #[cfg(feature = "rate-limit")]
    pub requests_per_second: u32,
}

impl OpenAIConfig {
    /// Resolve from the `[embedding]` settings section, reading the API key
    /// from its environment variable.
    pub fn from_settings(config: &EmbeddingConfig) -> Self {
        let settings: OpenAISettings = config.effective_settings();
        Self {
            provider_type: config.provider,
            api_key: settings.api_key(),
            base_url: settings.url,
            model: settings.model,
            timeout_secs: settings.timeout_secs,
            max_retries: settings.max_retries,
            azure_mode: settings.azure_mode,
            #[cfg(feature = "rate-limit")]
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set requests per second limit
    #[cfg(feature = "rate-limit")]
    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

/// Query embedder for OpenAI-compatible endpoints
pub struct OpenAIEmbedder {
    client: Client,
    config: OpenAIConfig,
    /// Detected from the first response, then enforced
    dimension: AtomicUsize,
    #[cfg(feature = "rate-limit")]
    rate_limiter: Arc<EmbedRateLimiter>,
}

impl OpenAIEmbedder {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::ProviderUnavailable(format!("HTTP client error: {}", e)))?;

        #[cfg(feature = "rate-limit")]
        let rate_limiter = {
            let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
            Arc::new(RateLimiter::direct(Quota::per_second(rps)))
        };

        Ok(Self {
            client,
            config,
            dimension: AtomicUsize::new(0),
            #[cfg(feature = "rate-limit")]
            rate_limiter,
        })
    }

    /// Build from the `[embedding]` settings section
    pub fn from_settings(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(OpenAIConfig::from_settings(config))
    }

    #[cfg(feature = "rate-limit")]
    async fn wait_for_permit(&self) {
        self.rate_limiter.until_ready().await;
    }

    #[cfg(not(feature = "rate-limit"))]
    async fn wait_for_permit(&self) {}

    fn embeddings_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/embeddings", base)
        } else {
            format!("{}/v1/embeddings", base)
        }
    }

    fn post(&self, text: &str) -> reqwest::RequestBuilder {
        let body = EmbeddingsRequest {
            model: &self.config.model,
            input: vec![text],
        };

        let mut request = self.client.post(self.embeddings_url()).json(&body);

        if let Some(ref api_key) = self.config.api_key {
            if self.config.azure_mode {
                request = request.header("api-key", api_key);
            } else {
                request = request.header("Authorization", format!("Bearer {}", api_key));
            }
        }
        request
    }

    async fn request_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut retry_delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 0;

        loop {
            self.wait_for_permit().await;

            match self.send_request(text).await {
                Ok(embedding) => return Ok(embedding),
                // Retrying cannot fix these
                Err(e @ SearchError::EmbeddingAuth(_))
                | Err(e @ SearchError::EmbeddingModelNotFound(_))
                | Err(e @ SearchError::DimensionMismatch { .. }) => return Err(e),
                Err(e) if attempt >= self.config.max_retries => return Err(e),
                Err(e) => {
                    warn!(
                        "Embedding request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_request(&self, text: &str) -> Result<Vec<f32>> {
        let response = self.post(text).send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::ProviderUnavailable("Request timed out".into())
            } else if e.is_connect() {
                SearchError::ProviderUnavailable(format!("Connection failed: {}", e))
            } else {
                SearchError::ProviderUnavailable(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();

        match status {
            StatusCode::OK => {
                let body: EmbeddingsResponse = response
                    .json()
                    .await
                    .map_err(|e| SearchError::Embedding(format!("Invalid response: {}", e)))?;

                let embedding = body
                    .data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| SearchError::Embedding("Response contained no embedding".into()))?;

                self.check_dimension(embedding.len())?;
                Ok(embedding)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::EmbeddingAuth(format!(
                    "Authentication failed: {}",
                    body
                )))
            }
            StatusCode::NOT_FOUND => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::EmbeddingModelNotFound(format!(
                    "{}: {}",
                    self.config.model, body
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());

                Err(SearchError::EmbeddingRateLimit { retry_after })
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => Err(
                SearchError::ProviderUnavailable("Service temporarily unavailable".into()),
            ),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::Embedding(format!(
                    "Request failed with status {}: {}",
                    status, body
                )))
            }
        }
    }

    fn check_dimension(&self, dim: usize) -> Result<()> {
        match self
            .dimension
            .compare_exchange(0, dim, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => {
                debug!("Detected embedding dimension {}", dim);
                Ok(())
            }
            Err(cached) if cached == dim => Ok(()),
            Err(cached) => Err(SearchError::DimensionMismatch {
                expected: cached,
                actual: dim,
            }),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(SearchError::Validation(
                "cannot embed an empty query".into(),
            ));
        }
        self.request_with_retry(text).await
    }

    async fn check_status(&self) -> Result<ProviderStatus> {
        let start = Instant::now();

        match self.send_request("health check").await {
            // A rate-limited endpoint is still reachable
            Ok(_) | Err(SearchError::EmbeddingRateLimit { .. }) => Ok(ProviderStatus::healthy(
                self.config.provider_type,
                &self.config.base_url,
                &self.config.model,
            )
            .with_latency(start.elapsed().as_millis() as u64)
            .with_dimension(self.dimension.load(Ordering::Relaxed))),
            Err(e) => Ok(ProviderStatus::unavailable(
                self.config.provider_type,
                e.to_string(),
            )),
        }
    }

    fn dimension(&self) -> usize {
        let dim = self.dimension.load(Ordering::Relaxed);
        if dim > 0 {
            return dim;
        }
        match self.config.model.as_str() {
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            "text-embedding-3-large" => 3072,
            "nomic-embed-text" => 768,
            _ => 384,
        }
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        self.config.provider_type
    }
}

impl std::fmt::Debug for OpenAIEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbedder")
            .field("provider_type", &self.config.provider_type)
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("timeout_secs", &self.config.timeout_secs)
            .field("azure_mode", &self.config.azure_mode)
            .finish()
    }
}
