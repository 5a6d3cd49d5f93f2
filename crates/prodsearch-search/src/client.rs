//! Qdrant client wrapper for prodsearch-search
//!
//! Implements [`VectorStore`] over the Qdrant gRPC API for one product
//! collection. Exact matches use a keyword-filtered scroll; dense, sparse and
//! hybrid searches go through the universal query API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, Condition, Filter, Fusion, PointId,
    PrefetchQueryBuilder, Query, QueryPointsBuilder, ScrollPointsBuilder, SearchParamsBuilder,
    Value as QdrantValue, VectorInput,
};
use qdrant_client::Qdrant;
use tracing::{debug, info, warn};

use crate::error::{Result, SearchError};
use crate::schema::{Payload, StoredPoint};
use crate::store::{CollectionStatus, DenseQuery, HybridQuery, SparseQuery, VectorStore};

/// Configuration for connecting to Qdrant
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Qdrant server URL (e.g., "http://localhost:6334")
    pub url: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Product collection name
    pub collection: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "products".to_string(),
            timeout_secs: 30,
        }
    }
}

impl QdrantConfig {
    /// Create config for local development
    pub fn local() -> Self {
        Self::default()
    }

    /// Create config with custom URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set collection name
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = name.into();
        self
    }

    /// Build from the `[qdrant]` section of the settings file.
    pub fn from_settings(settings: &prodsearch_config::QdrantConfig) -> Self {
        Self {
            url: settings.url.clone(),
            api_key: settings.api_key(),
            collection: settings.collection.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }
}

/// Qdrant-backed product collection
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Connect to Qdrant server
    pub async fn connect(config: QdrantConfig) -> Result<Self> {
        info!("Connecting to Qdrant at {}", config.url);

        let mut builder =
            Qdrant::from_url(&config.url).timeout(Duration::from_secs(config.timeout_secs));

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        let client = builder.build().map_err(|e| {
            SearchError::Connection(format!("Failed to build Qdrant client: {}", e))
        })?;

        // Test connection by listing collections
        client
            .list_collections()
            .await
            .map_err(|e| SearchError::Connection(format!("Failed to connect to Qdrant: {}", e)))?;

        info!("Successfully connected to Qdrant");

        Ok(Self {
            client,
            collection: config.collection,
        })
    }

    /// Collection this store reads from
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Fail with `CollectionNotFound` (listing what does exist) unless the
    /// product collection is present.
    pub async fn verify_collection(&self) -> Result<()> {
        let response = self.client.list_collections().await?;
        let available: Vec<String> = response
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect();

        if available.iter().any(|name| name == &self.collection) {
            info!("Collection '{}' found", self.collection);
            return Ok(());
        }

        warn!(
            "Collection '{}' not found; available: {:?}",
            self.collection, available
        );
        Err(SearchError::CollectionNotFound(format!(
            "{} (available: {})",
            self.collection,
            available.join(", ")
        )))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn exact_match(&self, field: &str, value: &str, limit: usize) -> Result<Vec<StoredPoint>> {
        let filter = Filter::must([Condition::matches(field, value.to_string())]);

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .filter(filter)
                    .limit(limit as u32)
                    .with_payload(true),
            )
            .await?;

        let points: Vec<StoredPoint> = response
            .result
            .into_iter()
            .map(|point| StoredPoint {
                point_id: point_id_string(point.id),
                // Exact matches carry no similarity
                score: 1.0,
                payload: convert_payload(point.payload),
            })
            .collect();

        debug!("Exact match {}={:?}: {} points", field, value, points.len());
        Ok(points)
    }

    async fn vector_search(&self, query: DenseQuery) -> Result<Vec<StoredPoint>> {
        let mut builder = QueryPointsBuilder::new(&self.collection)
            .query(Query::new_nearest(query.vector))
            .using(query.using)
            .limit(query.limit)
            .with_payload(true);

        if let Some(ef) = query.hnsw_ef {
            builder = builder.params(SearchParamsBuilder::default().hnsw_ef(ef).exact(false));
        }

        let response = self.client.query(builder).await?;
        Ok(response.result.into_iter().map(scored_point).collect())
    }

    async fn sparse_search(&self, query: SparseQuery) -> Result<Vec<StoredPoint>> {
        if query.vector.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .query(
                QueryPointsBuilder::new(&self.collection)
                    .query(Query::new_nearest(VectorInput::new_sparse(
                        query.vector.indices,
                        query.vector.values,
                    )))
                    .using(query.using)
                    .limit(query.limit)
                    .with_payload(true),
            )
            .await?;

        Ok(response.result.into_iter().map(scored_point).collect())
    }

    async fn hybrid_search(&self, query: HybridQuery) -> Result<Vec<StoredPoint>> {
        let mut dense = PrefetchQueryBuilder::default()
            .query(Query::new_nearest(query.dense.vector))
            .using(query.dense.using)
            .limit(query.dense.limit);
        if let Some(ef) = query.dense.hnsw_ef {
            dense = dense.params(SearchParamsBuilder::default().hnsw_ef(ef).exact(false));
        }

        let mut builder = QueryPointsBuilder::new(&self.collection).add_prefetch(dense);

        if !query.sparse.vector.is_empty() {
            builder = builder.add_prefetch(
                PrefetchQueryBuilder::default()
                    .query(Query::new_nearest(VectorInput::new_sparse(
                        query.sparse.vector.indices,
                        query.sparse.vector.values,
                    )))
                    .using(query.sparse.using)
                    .limit(query.sparse.limit),
            );
        }

        let response = self
            .client
            .query(
                builder
                    .query(Query::new_fusion(Fusion::Rrf))
                    .limit(query.limit)
                    .with_payload(true),
            )
            .await?;

        Ok(response.result.into_iter().map(scored_point).collect())
    }

    async fn collection_status(&self) -> Result<CollectionStatus> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(CollectionStatus::missing(&self.collection));
        }

        let info = self.client.collection_info(&self.collection).await?;
        let (points_count, indexed_vectors_count) = info
            .result
            .map(|r| (r.points_count, r.indexed_vectors_count))
            .unwrap_or((None, None));

        Ok(CollectionStatus {
            name: self.collection.clone(),
            exists: true,
            points_count,
            indexed_vectors_count,
        })
    }
}

fn scored_point(point: qdrant_client::qdrant::ScoredPoint) -> StoredPoint {
    StoredPoint {
        point_id: point_id_string(point.id),
        score: point.score,
        payload: convert_payload(point.payload),
    }
}

/// Render a Qdrant point id (numeric or UUID) as a string.
fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(n)) => n.to_string(),
        Some(PointIdOptions::Uuid(u)) => u,
        None => String::new(),
    }
}

fn convert_payload(payload: HashMap<String, QdrantValue>) -> Payload {
    payload
        .into_iter()
        .map(|(key, value)| (key, to_json(value)))
        .collect()
}

/// Convert a Qdrant payload value to JSON.
fn to_json(value: QdrantValue) -> serde_json::Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(to_json).collect())
        }
        Some(Kind::StructValue(st)) => serde_json::Value::Object(
            st.fields
                .into_iter()
                .map(|(key, value)| (key, to_json(value)))
                .collect(),
        ),
    }
}
