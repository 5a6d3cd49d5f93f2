//! Query embedding cache
//!
//! Bounded LRU memo of text → dense vector in front of an [`Embedder`].
//! Keys are the exact query text (no trimming or case folding).
//!
//! Thread-safe via interior mutability using parking_lot::Mutex. The lock is
//! never held across the embedder call: two concurrent misses on the same
//! text both call the embedder and the cache converges on one value.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::trace;

use super::provider::Embedder;
use crate::error::Result;

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheMetrics {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to call the embedder
    pub misses: u64,
    /// Entries dropped to make room
    pub evictions: u64,
}

impl CacheMetrics {
    /// Get hit rate as a fraction (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheState {
    entries: LruCache<String, Vec<f32>>,
    metrics: CacheMetrics,
}

/// LRU-bounded embedding cache
pub struct EmbeddingCache {
    inner: Arc<dyn Embedder>,
    capacity: NonZeroUsize,
    state: Mutex<CacheState>,
}

impl EmbeddingCache {
    /// Wrap `inner`, keeping at most `capacity` vectors (at least one).
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            capacity,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Embedding for `text`, from the cache or the embedder.
    ///
    /// Embedder errors propagate unchanged and nothing is cached for them.
    pub async fn get(&self, text: &str) -> Result<Vec<f32>> {
        {
            let mut state = self.state.lock();
            if let Some(vector) = state.entries.get(text).cloned() {
                state.metrics.hits += 1;
                trace!("Embedding cache hit for {:?}", text);
                return Ok(vector);
            }
            state.metrics.misses += 1;
        }

        let vector = self.inner.embed(text).await?;

        let mut state = self.state.lock();
        if let Some((evicted, _)) = state.entries.push(text.to_string(), vector.clone()) {
            // push also returns the old value when the key was already present
            if evicted != text {
                state.metrics.evictions += 1;
            }
        }
        Ok(vector)
    }

    /// Drop every cached vector and reset the metrics.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.metrics = CacheMetrics::default();
    }

    /// Number of cached vectors
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Check if `text` is cached (does not touch LRU order)
    pub fn contains(&self, text: &str) -> bool {
        self.state.lock().entries.contains(text)
    }

    /// Get a snapshot of cache metrics
    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }

    /// The wrapped embedder
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.inner
    }
}
