//! Shared test doubles for the integration tests.
//!
//! `MockStore` serves scripted points per search path and counts calls;
//! `MockEmbedder` returns deterministic vectors and can be made to fail or
//! stall.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use prodsearch_config::{SchemaConfig, SearchConfig, SearchSettings};
use prodsearch_search::{
    CollectionStatus, DenseQuery, Embedder, EmbeddingCache, EmbeddingProviderType,
    ExactMatchSearcher, FusionOptions, FusionOrchestrator, HybridQuery, Payload,
    ProviderStatus, Result, SearchError, SearchService, SparseQuery, StoredPoint, VectorSearcher,
    VectorStore,
};
use serde_json::json;

pub const ID_FIELD: &str = "partNumber_airgas_text";
pub const MFG_FIELD: &str = "manufacturerPartNumber_text";

/// Payload of a catalog product.
pub fn product(part_number: &str, description: &str) -> Payload {
    json!({
        ID_FIELD: part_number,
        "shortDescription_airgas_text": description,
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

/// Payload of a catalog product with one extra field.
pub fn product_with(part_number: &str, field: &str, value: &str) -> Payload {
    let mut payload = product(part_number, "");
    payload.insert(field.to_string(), json!(value));
    payload
}

/// Stored point whose catalog id is `part_number`.
pub fn point(part_number: &str, score: f32) -> StoredPoint {
    StoredPoint::new(
        format!("pt-{}", part_number),
        score,
        product(part_number, "test product"),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Path {
    Exact,
    Dense,
    Sparse,
    Hybrid,
}

/// Scripted in-memory vector store.
#[derive(Default)]
pub struct MockStore {
    exact: HashMap<(String, String), Vec<StoredPoint>>,
    dense: Vec<StoredPoint>,
    sparse: Vec<StoredPoint>,
    hybrid: Vec<StoredPoint>,
    failing: Vec<Path>,
    delays: HashMap<Path, Duration>,
    missing_collection: bool,
    calls: Mutex<HashMap<Path, usize>>,
    exact_fields: Mutex<Vec<String>>,
    dense_limits: Mutex<Vec<u64>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points returned for `field == value`.
    pub fn with_exact(mut self, field: &str, value: &str, points: Vec<StoredPoint>) -> Self {
        self.exact
            .insert((field.to_string(), value.to_string()), points);
        self
    }

    pub fn with_dense(mut self, points: Vec<StoredPoint>) -> Self {
        self.dense = points;
        self
    }

    pub fn with_sparse(mut self, points: Vec<StoredPoint>) -> Self {
        self.sparse = points;
        self
    }

    pub fn with_hybrid(mut self, points: Vec<StoredPoint>) -> Self {
        self.hybrid = points;
        self
    }

    pub fn failing(mut self, path: Path) -> Self {
        self.failing.push(path);
        self
    }

    pub fn with_delay(mut self, path: Path, delay: Duration) -> Self {
        self.delays.insert(path, delay);
        self
    }

    pub fn without_collection(mut self) -> Self {
        self.missing_collection = true;
        self
    }

    pub fn calls(&self, path: Path) -> usize {
        self.calls.lock().get(&path).copied().unwrap_or(0)
    }

    /// Fields probed by exact search, in call order.
    pub fn exact_fields(&self) -> Vec<String> {
        self.exact_fields.lock().clone()
    }

    /// Limits of every dense query, in call order.
    pub fn dense_limits(&self) -> Vec<u64> {
        self.dense_limits.lock().clone()
    }

    async fn enter(&self, path: Path) -> Result<()> {
        *self.calls.lock().entry(path).or_insert(0) += 1;
        if let Some(delay) = self.delays.get(&path) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&path) {
            return Err(SearchError::Store(format!("{:?} path unavailable", path)));
        }
        Ok(())
    }
}

fn take(points: &[StoredPoint], limit: u64) -> Vec<StoredPoint> {
    points.iter().take(limit as usize).cloned().collect()
}

#[async_trait]
impl VectorStore for MockStore {
    async fn exact_match(&self, field: &str, value: &str, limit: usize) -> Result<Vec<StoredPoint>> {
        self.exact_fields.lock().push(field.to_string());
        self.enter(Path::Exact).await?;
        Ok(self
            .exact
            .get(&(field.to_string(), value.to_string()))
            .map(|points| take(points, limit as u64))
            .unwrap_or_default())
    }

    async fn vector_search(&self, query: DenseQuery) -> Result<Vec<StoredPoint>> {
        self.dense_limits.lock().push(query.limit);
        self.enter(Path::Dense).await?;
        Ok(take(&self.dense, query.limit))
    }

    async fn sparse_search(&self, query: SparseQuery) -> Result<Vec<StoredPoint>> {
        self.enter(Path::Sparse).await?;
        Ok(take(&self.sparse, query.limit))
    }

    async fn hybrid_search(&self, query: HybridQuery) -> Result<Vec<StoredPoint>> {
        self.enter(Path::Hybrid).await?;
        Ok(take(&self.hybrid, query.limit))
    }

    async fn collection_status(&self) -> Result<CollectionStatus> {
        if self.missing_collection {
            return Ok(CollectionStatus::missing("products"));
        }
        Ok(CollectionStatus {
            name: "products".into(),
            exists: true,
            points_count: Some(self.dense.len() as u64),
            indexed_vectors_count: Some(self.dense.len() as u64),
        })
    }
}

/// Deterministic 4-dimensional embedder.
#[derive(Default)]
pub struct MockEmbedder {
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let embedder = Self::default();
        embedder.fail.store(true, Ordering::SeqCst);
        embedder
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SearchError::ProviderUnavailable("embedding server down".into()));
        }
        let bytes = text.as_bytes();
        Ok(vec![
            bytes.len() as f32,
            bytes.first().copied().unwrap_or(0) as f32,
            bytes.last().copied().unwrap_or(0) as f32,
            1.0,
        ])
    }

    async fn check_status(&self) -> Result<ProviderStatus> {
        Ok(ProviderStatus::healthy(EmbeddingProviderType::Tei, "memory://", "mock").with_dimension(4))
    }

    fn dimension(&self) -> usize {
        4
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Tei
    }
}

/// Fusion orchestrator over the given doubles with default schema.
pub fn orchestrator(
    store: Arc<MockStore>,
    embedder: Arc<MockEmbedder>,
    options: FusionOptions,
) -> FusionOrchestrator {
    let schema = SchemaConfig::default();
    let settings = SearchSettings::default();
    let cache = Arc::new(EmbeddingCache::new(embedder, 64));
    let exact = ExactMatchSearcher::from_config(store.clone(), &schema, &settings);
    let vector = VectorSearcher::new(store, cache, &schema, &settings);
    FusionOrchestrator::new(exact, vector, options)
}

/// Search service over the given doubles.
pub fn service(store: Arc<MockStore>, embedder: Arc<MockEmbedder>, config: &SearchConfig) -> SearchService {
    SearchService::new(config, store, embedder).expect("default classifier settings compile")
}

pub fn ids<'a>(hits: impl IntoIterator<Item = &'a prodsearch_search::SearchHit>) -> Vec<String> {
    hits.into_iter().map(|h| h.id.clone()).collect()
}
