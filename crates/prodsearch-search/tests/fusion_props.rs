use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use prodsearch_search::fusion::rrf_contribution;
use prodsearch_search::{fuse, reciprocal_rank_fusion, Payload, SearchHit, SearchType};

fn hit(id: String, score: f64, search_type: SearchType) -> SearchHit {
    SearchHit {
        id,
        score,
        payload: Payload::new(),
        search_type,
        source_id: None,
    }
}

/// Hits over a small id space so lists overlap often.
fn arb_hits(search_type: SearchType, max_len: usize) -> impl Strategy<Value = Vec<SearchHit>> {
    prop::collection::vec((0u8..12, 0.0f64..=1.0), 0..max_len).prop_map(move |raw| {
        raw.into_iter()
            .map(|(id, score)| hit(format!("p{}", id), score, search_type.clone()))
            .collect()
    })
}

/// Ranked list with distinct ids, as a store returns it.
fn arb_ranking(search_type: SearchType) -> impl Strategy<Value = Vec<SearchHit>> {
    prop::collection::hash_set(0u8..20, 0..15).prop_map(move |ids| {
        ids.into_iter()
            .enumerate()
            .map(|(rank, id)| hit(format!("p{}", id), 1.0 - rank as f64 * 0.01, search_type.clone()))
            .collect()
    })
}

proptest! {
    #[test]
    fn fuse_has_unique_ids_and_is_sorted(
        exact in arb_hits(SearchType::Exact, 6),
        vector in arb_hits(SearchType::Vector, 20),
        limit in 1usize..30,
    ) {
        let distinct: HashSet<String> = exact.iter().chain(&vector).map(|h| h.id.clone()).collect();
        let fused = fuse(exact, vector, limit);

        let ids: HashSet<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        prop_assert_eq!(ids.len(), fused.len());
        prop_assert_eq!(fused.len(), distinct.len().min(limit));
        prop_assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn fuse_keeps_the_best_score_per_id(
        exact in arb_hits(SearchType::Exact, 6),
        vector in arb_hits(SearchType::Vector, 20),
    ) {
        let mut best: HashMap<String, f64> = HashMap::new();
        for h in exact.iter().chain(&vector) {
            let entry = best.entry(h.id.clone()).or_insert(f64::MIN);
            *entry = entry.max(h.score);
        }
        let exact_ids: HashSet<String> = exact.iter().map(|h| h.id.clone()).collect();
        let vector_ids: HashSet<String> = vector.iter().map(|h| h.id.clone()).collect();

        for h in fuse(exact, vector, usize::MAX) {
            prop_assert_eq!(h.score, best[&h.id]);
            if exact_ids.contains(&h.id) && vector_ids.contains(&h.id) {
                prop_assert!(h.search_type.includes(&SearchType::Exact));
                prop_assert!(h.search_type.includes(&SearchType::Vector));
            }
        }
    }

    #[test]
    fn rrf_is_sorted_and_bounded(
        dense in arb_ranking(SearchType::Dense),
        sparse in arb_ranking(SearchType::Sparse),
        k in 1.0f64..200.0,
        limit in 1usize..40,
    ) {
        let distinct: HashSet<String> = dense.iter().chain(&sparse).map(|h| h.id.clone()).collect();
        let fused = reciprocal_rank_fusion(dense, sparse, k, limit).unwrap();

        prop_assert_eq!(fused.len(), distinct.len().min(limit));
        prop_assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
        for h in &fused {
            prop_assert!(h.score > 0.0 && h.score <= 2.0 / (k + 1.0) + 1e-12);
            prop_assert_eq!(&h.search_type, &SearchType::Rrf);
        }
    }

    #[test]
    fn rrf_score_is_sum_of_rank_contributions(
        dense in arb_ranking(SearchType::Dense),
        sparse in arb_ranking(SearchType::Sparse),
    ) {
        let k = 60.0;
        let mut expected: HashMap<String, f64> = HashMap::new();
        for list in [&dense, &sparse] {
            for (idx, h) in list.iter().enumerate() {
                *expected.entry(h.id.clone()).or_insert(0.0) += 1.0 / (k + (idx + 1) as f64);
            }
        }

        for h in reciprocal_rank_fusion(dense, sparse, k, usize::MAX).unwrap() {
            prop_assert!((h.score - expected[&h.id]).abs() < 1e-12);
        }
    }

    #[test]
    fn rrf_contribution_decreases_with_rank(k in 1.0f64..200.0, rank in 1usize..1000) {
        prop_assert!(rrf_contribution(k, rank) > rrf_contribution(k, rank + 1));
    }

    #[test]
    fn rrf_rewards_consensus(dense_rank in 0usize..10, sparse_rank in 0usize..10) {
        let filler = |prefix: &str, n: usize, search_type: SearchType| -> Vec<SearchHit> {
            (0..n).map(|i| hit(format!("{}{}", prefix, i), 0.5, search_type.clone())).collect()
        };

        let mut dense = filler("d", dense_rank, SearchType::Dense);
        dense.push(hit("target".into(), 0.5, SearchType::Dense));
        let mut sparse = filler("s", sparse_rank, SearchType::Sparse);
        sparse.push(hit("target".into(), 0.5, SearchType::Sparse));

        let both = reciprocal_rank_fusion(dense.clone(), sparse, 60.0, usize::MAX).unwrap();
        let dense_only = reciprocal_rank_fusion(dense, Vec::new(), 60.0, usize::MAX).unwrap();

        let score = |hits: &[SearchHit]| hits.iter().find(|h| h.id == "target").map(|h| h.score);
        prop_assert!(score(&both).unwrap() > score(&dense_only).unwrap());
    }
}
