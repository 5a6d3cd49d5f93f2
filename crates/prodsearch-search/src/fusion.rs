//! Rank fusion
//!
//! Two ways of merging result lists:
//!
//! - [`fuse`] merges exact and vector hits by id. The higher score wins and
//!   the surviving hit records every path that found it (`exact+vector`).
//!   Scores are not rescaled; both inputs are expected in [0, 1].
//! - [`reciprocal_rank_fusion`] combines a dense and a sparse ranking by rank
//!   alone:
//!
//! ```text
//! rrf(id) = sum over lists containing id of 1 / (k + rank)
//! ```
//!
//! Ranks are 1-indexed; a list that does not contain an id contributes 0.

use std::collections::HashMap;

use crate::error::{Result, SearchError};
use crate::schema::{SearchHit, SearchType};

/// Default RRF smoothing constant
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Merge exact and vector hits, at most one hit per id, best first.
///
/// Exact hits are visited first. When an id repeats, a strictly higher score
/// replaces the stored hit in place; otherwise the stored hit keeps its score
/// and payload. Either way the survivor is relabelled `{stored}+{new}`.
/// The final sort is stable, so ties keep visit order and exact hits stay
/// ahead of vector hits with the same score.
pub fn fuse(exact: Vec<SearchHit>, vector: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    let mut fused: Vec<SearchHit> = Vec::with_capacity(exact.len() + vector.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for hit in exact.into_iter().chain(vector) {
        match positions.get(&hit.id) {
            Some(&idx) => {
                let stored = &mut fused[idx];
                let label = stored.search_type.combine(&hit.search_type);
                if hit.score > stored.score {
                    *stored = hit;
                }
                stored.search_type = label;
            }
            None => {
                positions.insert(hit.id.clone(), fused.len());
                fused.push(hit);
            }
        }
    }

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(limit);
    fused
}

/// RRF contribution of a 1-indexed rank.
pub fn rrf_contribution(k: f64, rank: usize) -> f64 {
    1.0 / (k + rank as f64)
}

/// Accumulated RRF state for one id.
#[derive(Debug, Clone, PartialEq)]
pub struct RrfEntry {
    pub rrf_score: f64,
    /// 1-indexed rank in the dense list, if present
    pub dense_rank: Option<usize>,
    /// 1-indexed rank in the sparse list, if present
    pub sparse_rank: Option<usize>,
    pub dense_score: f64,
    pub sparse_score: f64,
    /// First hit seen for this id (the dense one when it is in both)
    pub hit: SearchHit,
}

/// Score every id of both rankings, best first, without truncating.
///
/// Ties keep first-seen order: dense ids, then sparse-only ids.
pub fn rrf_entries(dense: Vec<SearchHit>, sparse: Vec<SearchHit>, k: f64) -> Result<Vec<RrfEntry>> {
    if !(k.is_finite() && k > 0.0) {
        return Err(SearchError::Validation(format!(
            "RRF k must be a positive number, got {}",
            k
        )));
    }

    let mut entries: Vec<RrfEntry> = Vec::with_capacity(dense.len() + sparse.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (idx, hit) in dense.into_iter().enumerate() {
        let rank = idx + 1;
        let contribution = rrf_contribution(k, rank);
        match positions.get(&hit.id) {
            Some(&pos) => entries[pos].rrf_score += contribution,
            None => {
                positions.insert(hit.id.clone(), entries.len());
                entries.push(RrfEntry {
                    rrf_score: contribution,
                    dense_rank: Some(rank),
                    sparse_rank: None,
                    dense_score: hit.score,
                    sparse_score: 0.0,
                    hit,
                });
            }
        }
    }

    for (idx, hit) in sparse.into_iter().enumerate() {
        let rank = idx + 1;
        let contribution = rrf_contribution(k, rank);
        match positions.get(&hit.id) {
            Some(&pos) => {
                let entry = &mut entries[pos];
                entry.rrf_score += contribution;
                if entry.sparse_rank.is_none() {
                    entry.sparse_rank = Some(rank);
                    entry.sparse_score = hit.score;
                }
            }
            None => {
                positions.insert(hit.id.clone(), entries.len());
                entries.push(RrfEntry {
                    rrf_score: contribution,
                    dense_rank: None,
                    sparse_rank: Some(rank),
                    dense_score: 0.0,
                    sparse_score: hit.score,
                    hit,
                });
            }
        }
    }

    entries.sort_by(|a, b| b.rrf_score.total_cmp(&a.rrf_score));
    Ok(entries)
}

/// Fuse a dense and a sparse ranking with RRF, returning the top `limit`.
///
/// Each output hit's score is its fused RRF score and its type is `rrf`.
pub fn reciprocal_rank_fusion(
    dense: Vec<SearchHit>,
    sparse: Vec<SearchHit>,
    k: f64,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    Ok(rrf_entries(dense, sparse, k)?
        .into_iter()
        .take(limit)
        .map(|entry| SearchHit {
            score: entry.rrf_score,
            search_type: SearchType::Rrf,
            ..entry.hit
        })
        .collect())
}
