//! ProdSearch Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.prodsearch/config.toml`
//! - Local config: `.prodsearch/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: defaults → global → local → CLI overrides.
//! Every tuned constant of the search engine (relevance floor, pool sizes,
//! RRF smoothing, classifier weights) lives here so it can be overridden
//! without a rebuild.

mod classifier;
mod error;
mod loader;

pub use classifier::{ClassifierSettings, ClassifierWeights};
pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};

/// Root configuration for ProdSearch.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Vector store connection
    pub qdrant: QdrantConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Payload field and vector names of the product collection
    pub schema: SchemaConfig,

    /// Search tuning (pool sizes, thresholds, deadlines)
    pub search: SearchSettings,

    /// Part-number classifier weights and vocabularies
    pub classifier: ClassifierSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Qdrant connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QdrantConfig {
    /// Qdrant gRPC URL
    pub url: String,

    /// Environment variable holding the API key (optional)
    pub api_key_env: Option<String>,

    /// Product collection name
    pub collection: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key_env: Some("PRODSEARCH_QDRANT_API_KEY".to_string()),
            collection: "products".to_string(),
            timeout_secs: 30,
        }
    }
}

impl QdrantConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Embedding provider configuration.
///
/// All providers speak the OpenAI `/v1/embeddings` protocol; the provider
/// type only selects the preset used when `[embedding.openai]` is absent.
///
/// # Example TOML
///
/// ```toml
/// [embedding]
/// provider = "tei"   # or "ollama" or "openai"
/// cache_capacity = 1000
///
/// [embedding.openai]
/// url = "https://api.openai.com/v1"
/// api_key_env = "OPENAI_API_KEY"
/// model = "text-embedding-3-small"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedding provider to use
    pub provider: EmbeddingProviderType,

    /// Maximum number of query embeddings kept in the LRU cache
    pub cache_capacity: usize,

    /// Explicit endpoint settings (required when provider = "openai")
    pub openai: Option<OpenAISettings>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::default(),
            cache_capacity: 1000,
            openai: None,
        }
    }
}

impl EmbeddingConfig {
    /// Validate that required settings exist for the selected provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "embedding.cache_capacity",
                "must be at least 1",
            ));
        }

        if self.provider == EmbeddingProviderType::Openai && self.openai.is_none() {
            return Err(ConfigError::ValidationError(
                "embedding.provider is 'openai' but [embedding.openai] section is missing"
                    .to_string(),
            ));
        }

        if let Some(ref settings) = self.openai {
            if settings.url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "embedding.openai.url is required".to_string(),
                ));
            }
            if settings.model.is_empty() {
                return Err(ConfigError::ValidationError(
                    "embedding.openai.model is required".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Endpoint settings in effect: the explicit section, or the provider preset.
    pub fn effective_settings(&self) -> OpenAISettings {
        match self.openai {
            Some(ref settings) => settings.clone(),
            None => match self.provider {
                EmbeddingProviderType::Tei => OpenAISettings::tei(),
                EmbeddingProviderType::Ollama => OpenAISettings::ollama(),
                EmbeddingProviderType::Openai => OpenAISettings::default(),
            },
        }
    }
}

/// Embedding provider type selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderType {
    /// Local text-embeddings-inference server (default)
    #[default]
    Tei,
    /// Local Ollama server
    Ollama,
    /// OpenAI or any other hosted OpenAI-compatible API
    Openai,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tei => write!(f, "tei"),
            Self::Ollama => write!(f, "ollama"),
            Self::Openai => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tei" | "text-embeddings-inference" => Ok(Self::Tei),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::Openai),
            _ => Err(ConfigError::ValidationError(format!(
                "Unknown embedding provider: '{}'. Valid values: tei, ollama, openai",
                s
            ))),
        }
    }
}

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAISettings {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub url: String,

    /// Environment variable name containing API key
    pub api_key_env: Option<String>,

    /// Embedding model name
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retry attempts
    pub max_retries: u32,

    /// Use Azure OpenAI authentication (api-key header)
    pub azure_mode: bool,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            model: "text-embedding-3-small".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            azure_mode: false,
        }
    }
}

impl OpenAISettings {
    /// Preset for a local text-embeddings-inference server.
    pub fn tei() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            api_key_env: None,
            model: "BAAI/bge-small-en-v1.5".to_string(),
            ..Default::default()
        }
    }

    /// Preset for a local Ollama server.
    pub fn ollama() -> Self {
        Self {
            url: "http://localhost:11434/v1".to_string(),
            api_key_env: None,
            model: "all-minilm".to_string(),
            ..Default::default()
        }
    }

    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

/// One keyword-indexed field probed by exact search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExactField {
    /// Payload field name
    pub field: String,

    /// Fixed confidence assigned to every hit from this field
    pub score: f64,

    /// Provenance tag recorded on hits (e.g. "exact", "exact_mfg")
    pub tag: String,
}

impl ExactField {
    pub fn new(field: impl Into<String>, score: f64, tag: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            score,
            tag: tag.into(),
        }
    }
}

/// Payload and vector layout of the product collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    /// Payload field holding the catalog identifier used as hit id
    pub id_field: String,

    /// Short product description
    pub text_field: String,

    /// Manufacturer part number
    pub mfg_part_field: String,

    /// Display price
    pub price_field: String,

    /// Thumbnail image URL
    pub image_field: String,

    /// Named dense vector
    pub dense_vector: String,

    /// Named sparse (BM25) vector
    pub sparse_vector: String,

    /// Fields probed by exact search, in priority order. The first entry is
    /// authoritative: any hit on it skips the rest.
    pub exact_fields: Vec<ExactField>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            id_field: "partNumber_airgas_text".to_string(),
            text_field: "shortDescription_airgas_text".to_string(),
            mfg_part_field: "manufacturerPartNumber_text".to_string(),
            price_field: "onlinePrice_string".to_string(),
            image_field: "img_270Wx270H_string".to_string(),
            dense_vector: "dense".to_string(),
            sparse_vector: "bm25".to_string(),
            exact_fields: vec![
                ExactField::new("partNumber_airgas_text", 1.0, "exact"),
                ExactField::new("manufacturerPartNumber_text", 0.9, "exact_mfg"),
            ],
        }
    }
}

/// Search tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// HNSW `ef` used for dense queries
    pub hnsw_ef: u64,

    /// Vector hits below this similarity are dropped before fusion
    pub min_vector_score: f64,

    /// Per-field lookup cap for exact search
    pub exact_field_cap: usize,

    /// Vector pool = requested count x this multiplier
    pub vector_pool_multiplier: usize,

    /// RRF smoothing constant
    pub rrf_k: f64,

    /// Dense/sparse pools for client-side RRF = limit x this multiplier
    pub rrf_pool_multiplier: usize,

    /// Over-fetch factor applied when a payload filter is given
    pub filter_pool_multiplier: usize,

    /// Overall deadline for one search call
    pub deadline_secs: u64,

    /// Optional per-stage timeout; an expired stage degrades to zero hits
    pub stage_timeout_ms: Option<u64>,

    /// Largest candidate count a caller may request
    pub max_candidates: usize,

    /// Default result count
    pub default_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            hnsw_ef: 128,
            min_vector_score: 0.4,
            exact_field_cap: 10,
            vector_pool_multiplier: 2,
            rrf_k: 60.0,
            rrf_pool_multiplier: 2,
            filter_pool_multiplier: 3,
            deadline_secs: 30,
            stage_timeout_ms: None,
            max_candidates: 100,
            default_limit: 10,
        }
    }
}

impl SearchSettings {
    /// Validate tuning values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_vector_score) {
            return Err(ConfigError::invalid_value(
                "search.min_vector_score",
                format!("{} is outside [0, 1]", self.min_vector_score),
            ));
        }
        if self.rrf_k <= 0.0 || !self.rrf_k.is_finite() {
            return Err(ConfigError::invalid_value(
                "search.rrf_k",
                "must be a positive number",
            ));
        }
        if self.vector_pool_multiplier == 0
            || self.rrf_pool_multiplier == 0
            || self.filter_pool_multiplier == 0
        {
            return Err(ConfigError::invalid_value(
                "search.*_pool_multiplier",
                "must be at least 1",
            ));
        }
        if self.deadline_secs == 0 {
            return Err(ConfigError::invalid_value(
                "search.deadline_secs",
                "must be at least 1",
            ));
        }
        if self.exact_field_cap == 0 || self.max_candidates == 0 {
            return Err(ConfigError::invalid_value(
                "search.max_candidates",
                "caps must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override Qdrant URL
    pub qdrant_url: Option<String>,

    /// Override collection name
    pub collection: Option<String>,

    /// Override embedding provider type
    pub embedding_provider: Option<EmbeddingProviderType>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override search deadline
    pub deadline_secs: Option<u64>,
}

impl SearchConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref url) = overrides.qdrant_url {
            self.qdrant.url = url.clone();
        }

        if let Some(ref collection) = overrides.collection {
            self.qdrant.collection = collection.clone();
        }

        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(deadline) = overrides.deadline_secs {
            self.search.deadline_secs = deadline;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.qdrant.url.is_empty() {
            return Err(ConfigError::invalid_value("qdrant.url", "must not be empty"));
        }
        if self.qdrant.collection.is_empty() {
            return Err(ConfigError::invalid_value(
                "qdrant.collection",
                "must not be empty",
            ));
        }
        if self.schema.id_field.is_empty() {
            return Err(ConfigError::invalid_value(
                "schema.id_field",
                "must not be empty",
            ));
        }
        if self.schema.exact_fields.is_empty() {
            return Err(ConfigError::invalid_value(
                "schema.exact_fields",
                "at least one exact-match field is required",
            ));
        }
        self.embedding.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.qdrant.url, "http://localhost:6334");
        assert_eq!(config.qdrant.collection, "products");
        assert_eq!(config.schema.id_field, "partNumber_airgas_text");
        assert_eq!(config.search.hnsw_ef, 128);
        assert_eq!(config.search.min_vector_score, 0.4);
        assert_eq!(config.search.rrf_k, 60.0);
        assert_eq!(config.search.deadline_secs, 30);
        assert_eq!(config.embedding.cache_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_exact_fields() {
        let schema = SchemaConfig::default();
        assert_eq!(schema.exact_fields.len(), 2);
        assert_eq!(schema.exact_fields[0].score, 1.0);
        assert_eq!(schema.exact_fields[0].tag, "exact");
        assert_eq!(schema.exact_fields[1].field, "manufacturerPartNumber_text");
        assert_eq!(schema.exact_fields[1].score, 0.9);
        assert_eq!(schema.exact_fields[1].tag, "exact_mfg");
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = SearchConfig::default();
        let overrides = ConfigOverrides {
            qdrant_url: Some("http://remote:6334".to_string()),
            collection: Some("products_v2".to_string()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        config.apply_overrides(&overrides);

        assert_eq!(config.qdrant.url, "http://remote:6334");
        assert_eq!(config.qdrant.collection, "products_v2");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.search.deadline_secs, 30);
    }

    #[test]
    fn test_embedding_provider_type_from_str() {
        assert_eq!(
            "tei".parse::<EmbeddingProviderType>().unwrap(),
            EmbeddingProviderType::Tei
        );
        assert_eq!(
            "Ollama".parse::<EmbeddingProviderType>().unwrap(),
            EmbeddingProviderType::Ollama
        );
        assert_eq!(
            "openai".parse::<EmbeddingProviderType>().unwrap(),
            EmbeddingProviderType::Openai
        );
        assert!("candle".parse::<EmbeddingProviderType>().is_err());
    }

    #[test]
    fn test_embedding_provider_type_display() {
        assert_eq!(EmbeddingProviderType::Tei.to_string(), "tei");
        assert_eq!(EmbeddingProviderType::Ollama.to_string(), "ollama");
        assert_eq!(EmbeddingProviderType::Openai.to_string(), "openai");
    }

    #[test]
    fn test_openai_provider_requires_section() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::Openai,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("embedding.openai"));
    }

    #[test]
    fn test_effective_settings_presets() {
        let tei = EmbeddingConfig::default().effective_settings();
        assert_eq!(tei.url, "http://localhost:8080");
        assert_eq!(tei.model, "BAAI/bge-small-en-v1.5");
        assert!(tei.api_key_env.is_none());

        let ollama = EmbeddingConfig {
            provider: EmbeddingProviderType::Ollama,
            ..Default::default()
        }
        .effective_settings();
        assert_eq!(ollama.url, "http://localhost:11434/v1");

        let explicit = EmbeddingConfig {
            provider: EmbeddingProviderType::Ollama,
            openai: Some(OpenAISettings {
                model: "mxbai-embed-large".to_string(),
                ..OpenAISettings::ollama()
            }),
            ..Default::default()
        }
        .effective_settings();
        assert_eq!(explicit.model, "mxbai-embed-large");
    }

    #[test]
    fn test_validate_rejects_bad_tuning() {
        let mut config = SearchConfig::default();
        config.search.min_vector_score = 1.5;
        assert!(config.validate().is_err());

        let mut config = SearchConfig::default();
        config.search.rrf_k = 0.0;
        assert!(config.validate().is_err());

        let mut config = SearchConfig::default();
        config.search.deadline_secs = 0;
        assert!(config.validate().is_err());

        let mut config = SearchConfig::default();
        config.embedding.cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_collection() {
        let mut config = SearchConfig::default();
        config.qdrant.collection.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("qdrant.collection"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SearchConfig = toml::from_str(
            r#"
            [search]
            min_vector_score = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.search.min_vector_score, 0.5);
        assert_eq!(config.search.hnsw_ef, 128);
        assert_eq!(config.classifier.threshold, 4);
    }
}
