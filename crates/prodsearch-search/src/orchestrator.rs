//! Parallel exact + vector fusion search
//!
//! Exact lookup and vector search run as two spawned tasks so their store
//! and embedder I/O overlaps. Both are always awaited; the fuser only runs
//! once both lists are in. The whole call is bounded by a deadline, and a
//! missed deadline is reported as [`SearchError::Timeout`], never as an
//! empty result.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use prodsearch_config::SearchSettings;
use tracing::{debug, info, warn};

use crate::error::{Result, SearchError};
use crate::exact::ExactMatchSearcher;
use crate::fusion::fuse;
use crate::schema::SearchHit;
use crate::stats::{PerformanceStats, StageTimings, StatsRecorder};
use crate::vector::VectorSearcher;

/// Pool sizes and time limits of a fusion search
#[derive(Debug, Clone, PartialEq)]
pub struct FusionOptions {
    /// Vector pool = candidate count x this
    pub vector_pool_multiplier: usize,
    /// Bound on the whole call
    pub deadline: Duration,
    /// Bound on each stage; an expired stage contributes no hits
    pub stage_timeout: Option<Duration>,
    /// Largest accepted candidate count
    pub max_candidates: usize,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self::from_settings(&SearchSettings::default())
    }
}

impl FusionOptions {
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            vector_pool_multiplier: settings.vector_pool_multiplier,
            deadline: Duration::from_secs(settings.deadline_secs),
            stage_timeout: settings.stage_timeout_ms.map(Duration::from_millis),
            max_candidates: settings.max_candidates,
        }
    }
}

/// Runs exact and vector search concurrently and fuses the results
pub struct FusionOrchestrator {
    exact: Arc<ExactMatchSearcher>,
    vector: Arc<VectorSearcher>,
    options: FusionOptions,
    stats: Arc<StatsRecorder>,
}

impl FusionOrchestrator {
    pub fn new(exact: ExactMatchSearcher, vector: VectorSearcher, options: FusionOptions) -> Self {
        Self {
            exact: Arc::new(exact),
            vector: Arc::new(vector),
            options,
            stats: Arc::new(StatsRecorder::new()),
        }
    }

    /// Share an existing stats recorder instead of owning a fresh one.
    pub fn with_stats(mut self, stats: Arc<StatsRecorder>) -> Self {
        self.stats = stats;
        self
    }

    pub fn options(&self) -> &FusionOptions {
        &self.options
    }

    /// Up to `candidate_count` fused hits for `query`, best first.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank query or a count outside `1..=max_candidates`
    /// - embedding errors from the vector stage
    /// - `Timeout` when the deadline passes first
    ///
    /// Store failures in either stage are not errors; they only shrink the
    /// result.
    pub async fn fusion_search(&self, query: &str, candidate_count: usize) -> Result<Vec<SearchHit>> {
        self.validate(query, candidate_count)?;

        let total_start = Instant::now();
        let vector_pool = candidate_count.saturating_mul(self.options.vector_pool_multiplier);
        let stage_timeout = self.options.stage_timeout;

        let exact_task = {
            let searcher = self.exact.clone();
            let query = query.to_string();
            tokio::spawn(async move {
                let start = Instant::now();
                let hits = within(stage_timeout, "exact search", async {
                    Ok(searcher.search(&query, candidate_count).await)
                })
                .await;
                (hits, start.elapsed())
            })
        };

        let vector_task = {
            let searcher = self.vector.clone();
            let query = query.to_string();
            tokio::spawn(async move {
                let start = Instant::now();
                let hits = within(stage_timeout, "vector search", searcher.search(&query, vector_pool))
                    .await;
                (hits, start.elapsed())
            })
        };

        let exact_abort = exact_task.abort_handle();
        let vector_abort = vector_task.abort_handle();

        let joined = tokio::time::timeout(self.options.deadline, async {
            tokio::join!(exact_task, vector_task)
        })
        .await;

        let (exact_joined, vector_joined) = match joined {
            Ok(pair) => pair,
            Err(_) => {
                exact_abort.abort();
                vector_abort.abort();
                self.stats.record_failure();
                warn!(
                    "Fusion search for {:?} exceeded {}ms",
                    query,
                    self.options.deadline.as_millis()
                );
                return Err(SearchError::Timeout {
                    stage: "fusion search",
                    after: self.options.deadline,
                });
            }
        };

        let outcome = exact_joined.map_err(SearchError::from).and_then(|exact| {
            vector_joined
                .map_err(SearchError::from)
                .map(|vector| (exact, vector))
        });
        let ((exact_hits, exact_time), (vector_hits, vector_time)) = match outcome {
            Ok(stages) => stages,
            Err(e) => {
                self.stats.record_failure();
                return Err(e);
            }
        };

        // Exact search swallows its own failures
        let exact_hits = exact_hits.unwrap_or_default();
        let vector_hits = match vector_hits {
            Ok(hits) => hits,
            Err(e) => {
                self.stats.record_failure();
                return Err(e);
            }
        };

        debug!(
            "Stage results for {:?}: exact={} ({}ms), vector={} ({}ms)",
            query,
            exact_hits.len(),
            exact_time.as_millis(),
            vector_hits.len(),
            vector_time.as_millis()
        );

        let fusion_start = Instant::now();
        let fused = fuse(exact_hits, vector_hits, candidate_count);
        let fusion_time = fusion_start.elapsed();
        let total_time = total_start.elapsed();

        self.stats.record(StageTimings {
            exact: exact_time,
            vector: vector_time,
            fusion: fusion_time,
            total: total_time,
        });

        info!(
            "Fusion search {:?}: {} hits in {:.1}ms",
            query,
            fused.len(),
            total_time.as_secs_f64() * 1000.0
        );

        Ok(fused)
    }

    fn validate(&self, query: &str, candidate_count: usize) -> Result<()> {
        if query.trim().is_empty() {
            return Err(SearchError::Validation("query must not be blank".into()));
        }
        if candidate_count == 0 || candidate_count > self.options.max_candidates {
            return Err(SearchError::Validation(format!(
                "candidate count must be between 1 and {}, got {}",
                self.options.max_candidates, candidate_count
            )));
        }
        Ok(())
    }

    /// Consistent snapshot of the fusion counters
    pub fn stats(&self) -> PerformanceStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

/// Run a stage under an optional timeout. An expired stage yields no hits.
async fn within<F>(limit: Option<Duration>, stage: &'static str, fut: F) -> Result<Vec<SearchHit>>
where
    F: Future<Output = Result<Vec<SearchHit>>>,
{
    let Some(limit) = limit else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} timed out after {}ms, continuing without it", stage, limit.as_millis());
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_settings() {
        let settings = SearchSettings {
            deadline_secs: 5,
            stage_timeout_ms: Some(250),
            ..Default::default()
        };
        let options = FusionOptions::from_settings(&settings);

        assert_eq!(options.deadline, Duration::from_secs(5));
        assert_eq!(options.stage_timeout, Some(Duration::from_millis(250)));
        assert_eq!(options.vector_pool_multiplier, 2);
        assert_eq!(options.max_candidates, 100);
    }

    #[tokio::test]
    async fn test_within_degrades_to_empty() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        };
        let result = within(Some(Duration::from_millis(10)), "vector search", slow).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_within_passes_errors_through() {
        let failing = async { Err(SearchError::Embedding("down".into())) };
        let result = within(None, "vector search", failing).await;
        assert!(result.unwrap_err().is_embedding());
    }
}
