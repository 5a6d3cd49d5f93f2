//! Search strategies over one product collection
//!
//! `SearchService` wires the store, the cached embedder, the sparse encoder,
//! the fusion orchestrator and the classifier together and exposes one entry
//! point per strategy:
//!
//! | mode     | what runs                                                      |
//! |----------|----------------------------------------------------------------|
//! | `dense`  | dense nearest neighbours                                       |
//! | `sparse` | BM25 sparse search                                             |
//! | `hybrid` | store-side RRF over dense and sparse prefetches                |
//! | `rrf`    | dense and sparse fetched concurrently, fused client-side       |
//! | `fusion` | parallel exact + vector search with max-score merge            |
//! | `auto`   | `fusion` for part-number-like queries, `rrf` otherwise         |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use prodsearch_config::{SchemaConfig, SearchConfig, SearchSettings};
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::classifier::{Classification, PartNumberClassifier};
use crate::client::{QdrantConfig, QdrantStore};
use crate::embeddings::{
    Bm25QueryEncoder, CacheMetrics, Embedder, EmbeddingCache, OpenAIEmbedder, ProviderStatus,
    SparseEncoder,
};
use crate::error::{Result, SearchError};
use crate::exact::ExactMatchSearcher;
use crate::fusion::reciprocal_rank_fusion;
use crate::orchestrator::{FusionOptions, FusionOrchestrator};
use crate::schema::{ProductSummary, SearchHit, SearchType, StoredPoint};
use crate::stats::PerformanceStats;
use crate::store::{CollectionStatus, DenseQuery, HybridQuery, SparseQuery, VectorStore};
use crate::vector::VectorSearcher;

/// Query used by [`SearchService::warmup`]
const WARMUP_QUERY: &str = "test warmup";

/// Search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchMode {
    Dense,
    Sparse,
    Hybrid,
    Rrf,
    Fusion,
    #[default]
    Auto,
}

impl SearchMode {
    /// Every concrete strategy, in comparison order
    pub const CONCRETE: [SearchMode; 5] = [
        SearchMode::Dense,
        SearchMode::Sparse,
        SearchMode::Hybrid,
        SearchMode::Rrf,
        SearchMode::Fusion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Dense => "dense",
            SearchMode::Sparse => "sparse",
            SearchMode::Hybrid => "hybrid",
            SearchMode::Rrf => "rrf",
            SearchMode::Fusion => "fusion",
            SearchMode::Auto => "auto",
        }
    }

    fn stage(&self) -> &'static str {
        match self {
            SearchMode::Dense => "dense search",
            SearchMode::Sparse => "sparse search",
            SearchMode::Hybrid => "hybrid search",
            SearchMode::Rrf => "rrf search",
            SearchMode::Fusion => "fusion search",
            SearchMode::Auto => "search",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dense" => Ok(SearchMode::Dense),
            "sparse" | "bm25" => Ok(SearchMode::Sparse),
            "hybrid" => Ok(SearchMode::Hybrid),
            "rrf" => Ok(SearchMode::Rrf),
            "fusion" => Ok(SearchMode::Fusion),
            "auto" => Ok(SearchMode::Auto),
            other => Err(SearchError::Validation(format!(
                "unknown search mode '{}' (expected dense, sparse, hybrid, rrf, fusion or auto)",
                other
            ))),
        }
    }
}

impl Serialize for SearchMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Keep only hits whose payload `field` equals `value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadFilter {
    pub field: String,
    pub value: String,
}

impl PayloadFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Parse `field=value`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once('=') {
            Some((field, value)) if !field.trim().is_empty() => {
                Ok(Self::new(field.trim(), value.trim()))
            }
            _ => Err(SearchError::Validation(format!(
                "filter must look like field=value, got '{}'",
                raw
            ))),
        }
    }

    /// Strings compare as-is; other values by their JSON text.
    pub fn matches(&self, hit: &SearchHit) -> bool {
        match hit.payload.get(&self.field) {
            Some(serde_json::Value::String(s)) => s == &self.value,
            Some(serde_json::Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

/// One search call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub mode: SearchMode,
    pub filter: Option<PayloadFilter>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            limit,
            mode: SearchMode::default(),
            filter: None,
        }
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn filter(mut self, filter: PayloadFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

/// Result of a search call
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Strategy that actually ran (never `auto`)
    pub mode: SearchMode,
    pub hits: Vec<SearchHit>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// Routing decision, for `auto` requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

/// One row of [`SearchService::compare`]
#[derive(Debug, Clone, Serialize)]
pub struct ModeComparison {
    pub mode: SearchMode,
    pub count: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Collection and embedder health
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub collection: CollectionStatus,
    pub embedder: ProviderStatus,
}

/// Latencies measured by [`SearchService::warmup`]
#[derive(Debug, Clone, Serialize)]
pub struct WarmupReport {
    pub collection: CollectionStatus,
    #[serde(rename = "dense_ms", serialize_with = "as_millis")]
    pub dense: Duration,
    #[serde(rename = "fusion_ms", serialize_with = "as_millis")]
    pub fusion: Duration,
}

/// Embedding cache counters plus occupancy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingCacheStats {
    #[serde(flatten)]
    pub metrics: CacheMetrics,
    pub size: usize,
    pub capacity: usize,
}

/// Snapshot returned by [`SearchService::stats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub fusion: PerformanceStats,
    pub embedding_cache: EmbeddingCacheStats,
}

/// Strategy-level search entry point
pub struct SearchService {
    store: Arc<dyn VectorStore>,
    cache: Arc<EmbeddingCache>,
    sparse: Arc<dyn SparseEncoder>,
    orchestrator: FusionOrchestrator,
    classifier: PartNumberClassifier,
    schema: SchemaConfig,
    settings: SearchSettings,
}

impl SearchService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        config: &SearchConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let cache = Arc::new(EmbeddingCache::new(embedder, config.embedding.cache_capacity));
        let exact = ExactMatchSearcher::from_config(store.clone(), &config.schema, &config.search);
        let vector = VectorSearcher::new(store.clone(), cache.clone(), &config.schema, &config.search);
        let orchestrator =
            FusionOrchestrator::new(exact, vector, FusionOptions::from_settings(&config.search));

        Ok(Self {
            store,
            cache,
            sparse: Arc::new(Bm25QueryEncoder::new()),
            orchestrator,
            classifier: PartNumberClassifier::new(&config.classifier)?,
            schema: config.schema.clone(),
            settings: config.search.clone(),
        })
    }

    /// Connect to Qdrant and the configured embedding endpoint.
    pub async fn connect(config: &SearchConfig) -> Result<Self> {
        let store = QdrantStore::connect(QdrantConfig::from_settings(&config.qdrant)).await?;
        let embedder = OpenAIEmbedder::from_settings(&config.embedding)?;
        Self::new(config, Arc::new(store), Arc::new(embedder))
    }

    /// Replace the BM25 query encoder.
    pub fn with_sparse_encoder(mut self, encoder: Arc<dyn SparseEncoder>) -> Self {
        self.sparse = encoder;
        self
    }

    pub fn classifier(&self) -> &PartNumberClassifier {
        &self.classifier
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    /// Run one search request.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.validate(&request.query, request.limit)?;
        let start = Instant::now();

        let (mode, classification) = match request.mode {
            SearchMode::Auto => {
                let classification = self.classifier.explain(&request.query);
                let mode = if classification.is_part_number {
                    SearchMode::Fusion
                } else {
                    SearchMode::Rrf
                };
                debug!(
                    "Routing {:?} to {} (score {})",
                    request.query, mode, classification.score
                );
                (mode, Some(classification))
            }
            mode => (mode, None),
        };

        let fetch = match request.filter {
            Some(_) => request
                .limit
                .saturating_mul(self.settings.filter_pool_multiplier)
                .min(self.settings.max_candidates)
                .max(request.limit),
            None => request.limit,
        };

        let mut hits = self.run(mode, &request.query, fetch).await?;

        if let Some(ref filter) = request.filter {
            let before = hits.len();
            hits.retain(|hit| filter.matches(hit));
            debug!(
                "Filter {}={}: kept {} of {} hits",
                filter.field,
                filter.value,
                hits.len(),
                before
            );
        }
        hits.truncate(request.limit);

        let elapsed = start.elapsed();
        info!(
            "{} search {:?}: {} hits in {:.1}ms",
            mode,
            request.query,
            hits.len(),
            elapsed.as_secs_f64() * 1000.0
        );

        Ok(SearchResponse {
            query: request.query.clone(),
            mode,
            hits,
            elapsed,
            classification,
        })
    }

    fn validate(&self, query: &str, limit: usize) -> Result<()> {
        if query.trim().is_empty() {
            return Err(SearchError::Validation("query must not be blank".into()));
        }
        if limit == 0 || limit > self.settings.max_candidates {
            return Err(SearchError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                self.settings.max_candidates, limit
            )));
        }
        Ok(())
    }

    async fn run(&self, mode: SearchMode, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        // Fusion enforces its own deadline and keeps its own failure counters
        if mode == SearchMode::Fusion {
            return self.orchestrator.fusion_search(query, limit).await;
        }

        let deadline = Duration::from_secs(self.settings.deadline_secs);
        let search = async {
            match mode {
                SearchMode::Dense => self.dense(query, limit).await,
                SearchMode::Sparse => self.sparse(query, limit).await,
                SearchMode::Hybrid => self.hybrid(query, limit).await,
                _ => self.rrf(query, limit).await,
            }
        };

        match tokio::time::timeout(deadline, search).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} for {:?} exceeded {}ms", mode.stage(), query, deadline.as_millis());
                Err(SearchError::Timeout {
                    stage: mode.stage(),
                    after: deadline,
                })
            }
        }
    }

    fn to_hits(&self, points: Vec<StoredPoint>, search_type: SearchType) -> Vec<SearchHit> {
        points
            .into_iter()
            .map(|p| {
                let score = f64::from(p.score);
                SearchHit::from_point(p, &self.schema.id_field, score, search_type.clone())
            })
            .collect()
    }

    async fn dense_query(&self, query: &str, limit: usize) -> Result<DenseQuery> {
        Ok(DenseQuery {
            vector: self.cache.get(query).await?,
            using: self.schema.dense_vector.clone(),
            limit: limit as u64,
            hnsw_ef: Some(self.settings.hnsw_ef),
        })
    }

    fn sparse_query(&self, query: &str, limit: usize) -> SparseQuery {
        SparseQuery {
            vector: self.sparse.encode(query),
            using: self.schema.sparse_vector.clone(),
            limit: limit as u64,
        }
    }

    async fn dense(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let points = self.store.vector_search(self.dense_query(query, limit).await?).await?;
        Ok(self.to_hits(points, SearchType::Dense))
    }

    async fn sparse(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let sparse = self.sparse_query(query, limit);
        if sparse.vector.is_empty() {
            debug!("No indexable terms in {:?}", query);
            return Ok(Vec::new());
        }
        let points = self.store.sparse_search(sparse).await?;
        Ok(self.to_hits(points, SearchType::Sparse))
    }

    async fn hybrid(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let pool = limit.saturating_mul(self.settings.rrf_pool_multiplier);
        let points = self
            .store
            .hybrid_search(HybridQuery {
                dense: self.dense_query(query, pool).await?,
                sparse: self.sparse_query(query, pool),
                limit: limit as u64,
            })
            .await?;
        Ok(self.to_hits(points, SearchType::Hybrid))
    }

    async fn rrf(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let pool = limit.saturating_mul(self.settings.rrf_pool_multiplier);
        let (dense, sparse) = tokio::try_join!(self.dense(query, pool), self.sparse(query, pool))?;
        debug!(
            "RRF inputs for {:?}: dense={}, sparse={}",
            query,
            dense.len(),
            sparse.len()
        );
        reciprocal_rank_fusion(dense, sparse, self.settings.rrf_k, limit)
    }

    /// Run every concrete strategy and report count, latency and top hit.
    ///
    /// A failing strategy is reported in its row instead of failing the call.
    pub async fn compare(&self, query: &str, limit: usize) -> Result<Vec<ModeComparison>> {
        self.validate(query, limit)?;

        let mut rows = Vec::with_capacity(SearchMode::CONCRETE.len());
        for mode in SearchMode::CONCRETE {
            let request = SearchRequest::new(query, limit).mode(mode);
            let start = Instant::now();
            let row = match self.search(&request).await {
                Ok(response) => ModeComparison {
                    mode,
                    count: response.hits.len(),
                    elapsed: response.elapsed,
                    top: response.hits.into_iter().next(),
                    error: None,
                },
                Err(e) => {
                    warn!("{} failed during comparison: {}", mode, e);
                    ModeComparison {
                        mode,
                        count: 0,
                        elapsed: start.elapsed(),
                        top: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            rows.push(row);
        }
        Ok(rows)
    }

    /// Collection and embedder health
    pub async fn status(&self) -> Result<ServiceStatus> {
        let collection = self.store.collection_status().await?;
        let embedder = self.cache.embedder().check_status().await?;
        Ok(ServiceStatus {
            collection,
            embedder,
        })
    }

    /// Check the collection exists, then time one dense and one fusion search.
    pub async fn warmup(&self) -> Result<WarmupReport> {
        let collection = self.store.collection_status().await?;
        if !collection.exists {
            return Err(SearchError::CollectionNotFound(collection.name));
        }

        let start = Instant::now();
        self.search(&SearchRequest::new(WARMUP_QUERY, 5).mode(SearchMode::Dense))
            .await?;
        let dense = start.elapsed();

        let start = Instant::now();
        self.search(&SearchRequest::new(WARMUP_QUERY, 5).mode(SearchMode::Fusion))
            .await?;
        let fusion = start.elapsed();

        info!(
            "Warmup: dense {}ms, fusion {}ms",
            dense.as_millis(),
            fusion.as_millis()
        );
        Ok(WarmupReport {
            collection,
            dense,
            fusion,
        })
    }

    /// Fusion counters and embedding cache occupancy
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            fusion: self.orchestrator.stats(),
            embedding_cache: EmbeddingCacheStats {
                metrics: self.cache.metrics(),
                size: self.cache.len(),
                capacity: self.cache.capacity(),
            },
        }
    }

    /// Empty the embedding cache. Fusion statistics are kept.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Embedding cache cleared");
    }

    /// Display rows for a list of hits
    pub fn summarize(&self, hits: &[SearchHit]) -> Vec<ProductSummary> {
        hits.iter()
            .map(|hit| ProductSummary::from_hit(hit, &self.schema))
            .collect()
    }
}
