//! Fusion search latency statistics
//!
//! A `StatsRecorder` is owned by the orchestrator that feeds it, so tests
//! get isolated counters. All fields of one sample are applied under a single
//! lock: readers never see a half-updated snapshot.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Weight kept from the previous average on each update
const EMA_KEEP: f64 = 0.9;

/// Process-lifetime fusion search counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    /// Completed fusion searches
    pub total_searches: u64,
    /// Fusion searches that ended in an error (including timeouts)
    pub failed_searches: u64,
    /// Moving averages in milliseconds, seeded at zero
    pub avg_exact_ms: f64,
    pub avg_vector_ms: f64,
    pub avg_fusion_ms: f64,
    pub avg_total_ms: f64,
}

/// Per-stage durations of one fusion search
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub exact: Duration,
    pub vector: Duration,
    pub fusion: Duration,
    pub total: Duration,
}

fn ema(previous: f64, sample: Duration) -> f64 {
    EMA_KEEP * previous + (1.0 - EMA_KEEP) * sample.as_secs_f64() * 1000.0
}

/// Thread-safe owner of a [`PerformanceStats`]
#[derive(Debug, Default)]
pub struct StatsRecorder {
    stats: Mutex<PerformanceStats>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed search into the averages.
    pub fn record(&self, timings: StageTimings) {
        let mut stats = self.stats.lock();
        stats.total_searches += 1;
        stats.avg_exact_ms = ema(stats.avg_exact_ms, timings.exact);
        stats.avg_vector_ms = ema(stats.avg_vector_ms, timings.vector);
        stats.avg_fusion_ms = ema(stats.avg_fusion_ms, timings.fusion);
        stats.avg_total_ms = ema(stats.avg_total_ms, timings.total);
    }

    pub fn record_failure(&self) {
        self.stats.lock().failed_searches += 1;
    }

    /// Consistent copy of the current counters
    pub fn snapshot(&self) -> PerformanceStats {
        self.stats.lock().clone()
    }

    pub fn reset(&self) {
        *self.stats.lock() = PerformanceStats::default();
    }
}
