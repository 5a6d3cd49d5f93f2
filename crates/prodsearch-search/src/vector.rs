//! Dense similarity search with a relevance floor

use std::sync::Arc;

use prodsearch_config::{SchemaConfig, SearchSettings};
use tracing::{debug, warn};

use crate::embeddings::EmbeddingCache;
use crate::error::Result;
use crate::schema::{SearchHit, SearchType};
use crate::store::{DenseQuery, VectorStore};

/// Nearest-neighbour searcher used by fusion search
pub struct VectorSearcher {
    store: Arc<dyn VectorStore>,
    cache: Arc<EmbeddingCache>,
    dense_vector: String,
    id_field: String,
    hnsw_ef: u64,
    min_score: f64,
}

impl VectorSearcher {
    pub fn new(
        store: Arc<dyn VectorStore>,
        cache: Arc<EmbeddingCache>,
        schema: &SchemaConfig,
        settings: &SearchSettings,
    ) -> Self {
        Self {
            store,
            cache,
            dense_vector: schema.dense_vector.clone(),
            id_field: schema.id_field.clone(),
            hnsw_ef: settings.hnsw_ef,
            min_score: settings.min_vector_score,
        }
    }

    /// Up to `limit` hits scoring at least the relevance floor, best first.
    ///
    /// Embedding failures propagate. A failed store query degrades to an
    /// empty list.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self.cache.get(query).await?;

        let points = match self
            .store
            .vector_search(DenseQuery {
                vector,
                using: self.dense_vector.clone(),
                limit: limit as u64,
                hnsw_ef: Some(self.hnsw_ef),
            })
            .await
        {
            Ok(points) => points,
            Err(e) => {
                warn!("Vector search failed, continuing without it: {}", e);
                return Ok(Vec::new());
            }
        };

        let returned = points.len();
        let hits: Vec<SearchHit> = points
            .into_iter()
            .filter(|p| f64::from(p.score) >= self.min_score)
            .map(|p| {
                let score = f64::from(p.score);
                SearchHit::from_point(p, &self.id_field, score, SearchType::Vector)
            })
            .collect();

        debug!(
            "Vector search: {} of {} hits above {}",
            hits.len(),
            returned,
            self.min_score
        );
        Ok(hits)
    }
}
