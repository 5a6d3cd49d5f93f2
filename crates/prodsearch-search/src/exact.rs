//! Exact identifier lookup
//!
//! Probes keyword-indexed identifier fields in priority order. The first
//! field is authoritative: if it matches, the remaining fields are skipped.

use std::sync::Arc;

use prodsearch_config::{ExactField, SchemaConfig, SearchSettings};
use tracing::{debug, warn};

use crate::schema::{SearchHit, SearchType};
use crate::store::VectorStore;

/// Exact-match searcher over the configured identifier fields
pub struct ExactMatchSearcher {
    store: Arc<dyn VectorStore>,
    fields: Vec<ExactField>,
    id_field: String,
    field_cap: usize,
}

impl ExactMatchSearcher {
    pub fn new(
        store: Arc<dyn VectorStore>,
        fields: Vec<ExactField>,
        id_field: impl Into<String>,
        field_cap: usize,
    ) -> Self {
        Self {
            store,
            fields,
            id_field: id_field.into(),
            field_cap,
        }
    }

    pub fn from_config(
        store: Arc<dyn VectorStore>,
        schema: &SchemaConfig,
        settings: &SearchSettings,
    ) -> Self {
        Self::new(
            store,
            schema.exact_fields.clone(),
            schema.id_field.clone(),
            settings.exact_field_cap,
        )
    }

    /// Literal matches for `query`, trimmed and uppercased.
    ///
    /// Store failures on a field count as zero hits for that field; this
    /// never fails.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let value = query.trim().to_uppercase();
        if value.is_empty() || limit == 0 {
            return Vec::new();
        }
        let per_field = limit.min(self.field_cap);

        let mut hits = Vec::new();
        for (position, field) in self.fields.iter().enumerate() {
            let points = match self.store.exact_match(&field.field, &value, per_field).await {
                Ok(points) => points,
                Err(e) => {
                    warn!("Exact match on {} failed: {}", field.field, e);
                    Vec::new()
                }
            };

            let found = points.len();
            let search_type = SearchType::from_tag(&field.tag);
            hits.extend(points.into_iter().map(|point| {
                SearchHit::from_point(point, &self.id_field, field.score, search_type.clone())
            }));

            if position == 0 && found > 0 {
                debug!(
                    "Exact match on primary field {}: {} hits, skipping remaining fields",
                    field.field, found
                );
                break;
            }
        }

        hits
    }
}
