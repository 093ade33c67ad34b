//! Reciprocal Rank Fusion
//!
//! Merges ranked lists from heterogeneous retrievers into one deduplicated,
//! globally ordered list. RRF is insensitive to the raw score scales of the
//! input lists: each occurrence at 1-based rank `r` contributes
//! `1 / (r + K)` to the document's fused score.

use crate::retrieval::{assign_ranks, RetrievalMethod, ScoredResult};
use std::collections::HashMap;

/// Standard RRF constant; flattens rank influence beyond the first ~20
/// positions.
pub const RRF_K: f64 = 60.0;

/// Per-document accumulator output of one fusion call
///
/// The per-method ranks and raw scores are bookkeeping for display and
/// export; ordering depends only on `rrf_score` and `doc_id`.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    /// Document identifier
    pub doc_id: String,
    /// Longest text observed across contributing sources (display only)
    pub text: String,
    /// Sum of reciprocal-rank contributions
    pub rrf_score: f64,
    /// Rank in the lexical input list, if present there
    pub lexical_rank: Option<usize>,
    /// Rank in the vector input list, if present there
    pub vector_rank: Option<usize>,
    /// Raw BM25 score, if present in the lexical list
    pub lexical_score: Option<f64>,
    /// Raw cosine similarity, if present in the vector list
    pub vector_score: Option<f64>,
}

impl FusedCandidate {
    fn new(doc_id: String) -> Self {
        Self {
            doc_id,
            text: String::new(),
            rrf_score: 0.0,
            lexical_rank: None,
            vector_rank: None,
            lexical_score: None,
            vector_score: None,
        }
    }

    /// Convert into a ranked-list entry carrying the fused score
    pub fn into_result(self) -> ScoredResult {
        ScoredResult {
            doc_id: self.doc_id,
            text: self.text,
            score: self.rrf_score,
            rank: 0,
            method: RetrievalMethod::Fusion,
        }
    }
}

/// Reciprocal Rank Fusion engine
#[derive(Debug, Clone)]
pub struct FusionEngine {
    k: f64,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self { k: RRF_K }
    }
}

impl FusionEngine {
    /// Create an engine with the standard constant (60)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom constant
    pub fn with_k(k: f64) -> Self {
        Self { k }
    }

    /// Fuse zero or more ranked lists into one deduplicated ordered list
    ///
    /// A document present in a single list at rank `r` scores exactly
    /// `1/(r + K)`; one present in both lists at ranks `r1` and `r2` scores
    /// `1/(r1 + K) + 1/(r2 + K)`. Output order is `rrf_score` descending
    /// with ties broken by `doc_id` ascending, so fusion is independent of
    /// the order in which input lists are supplied. All-empty input
    /// produces an empty output, not an error.
    pub fn fuse(&self, lists: &[Vec<ScoredResult>], top_k: usize) -> Vec<FusedCandidate> {
        let mut accumulators: HashMap<String, FusedCandidate> = HashMap::new();

        for list in lists {
            for (idx, result) in list.iter().enumerate() {
                let rank = idx + 1;
                let contribution = 1.0 / (rank as f64 + self.k);

                let acc = accumulators
                    .entry(result.doc_id.clone())
                    .or_insert_with(|| FusedCandidate::new(result.doc_id.clone()));
                acc.rrf_score += contribution;

                // Keep the most complete text seen across sources.
                if result.text.len() > acc.text.len() {
                    acc.text = result.text.clone();
                }

                match result.method {
                    RetrievalMethod::Lexical => {
                        acc.lexical_rank = Some(rank);
                        acc.lexical_score = Some(result.score);
                    }
                    RetrievalMethod::Vector => {
                        acc.vector_rank = Some(rank);
                        acc.vector_score = Some(result.score);
                    }
                    // Already-fused or reranked input contributes to the
                    // score without per-method bookkeeping.
                    RetrievalMethod::Fusion | RetrievalMethod::Rerank => {}
                }
            }
        }

        let mut fused: Vec<FusedCandidate> = accumulators.into_values().collect();
        fused.sort_by(|a, b| {
            b.rrf_score
                .total_cmp(&a.rrf_score)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        fused.truncate(top_k);

        tracing::debug!("Fused {} lists into {} candidates", lists.len(), fused.len());
        fused
    }
}

/// Convert fused candidates into a final ranked list
pub fn fused_into_results(candidates: Vec<FusedCandidate>) -> Vec<ScoredResult> {
    let mut results: Vec<ScoredResult> = candidates
        .into_iter()
        .map(FusedCandidate::into_result)
        .collect();
    assign_ranks(&mut results);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(method: RetrievalMethod, entries: &[(&str, f64)]) -> Vec<ScoredResult> {
        entries
            .iter()
            .enumerate()
            .map(|(idx, (id, score))| ScoredResult {
                doc_id: id.to_string(),
                text: format!("texto de {}", id),
                score: *score,
                rank: idx + 1,
                method,
            })
            .collect()
    }

    #[test]
    fn test_single_list_scores_follow_formula() {
        let engine = FusionEngine::new();
        let lexical = list(RetrievalMethod::Lexical, &[("a", 9.0), ("b", 4.0)]);

        let fused = engine.fuse(&[lexical], 10);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].doc_id, "a");
        assert!((fused[0].rrf_score - 1.0 / 61.0).abs() < 1e-12);
        assert!((fused[1].rrf_score - 1.0 / 62.0).abs() < 1e-12);
        assert_eq!(fused[0].lexical_rank, Some(1));
        assert_eq!(fused[0].lexical_score, Some(9.0));
        assert_eq!(fused[0].vector_rank, None);
    }

    #[test]
    fn test_document_in_both_lists_sums_contributions() {
        let engine = FusionEngine::new();
        let lexical = list(RetrievalMethod::Lexical, &[("a", 9.0), ("b", 4.0)]);
        let vector = list(RetrievalMethod::Vector, &[("b", 0.9), ("c", 0.7)]);

        let fused = engine.fuse(&[lexical, vector], 10);
        let b = fused.iter().find(|c| c.doc_id == "b").unwrap();
        // Rank 2 lexically, rank 1 in the vector list.
        let expected = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((b.rrf_score - expected).abs() < 1e-12);
        assert!(b.rrf_score >= 1.0 / 62.0 && b.rrf_score >= 1.0 / 61.0);
        assert_eq!(b.lexical_rank, Some(2));
        assert_eq!(b.vector_rank, Some(1));
        assert_eq!(b.lexical_score, Some(4.0));
        assert_eq!(b.vector_score, Some(0.9));
        // b leads: it is the only document present in both lists.
        assert_eq!(fused[0].doc_id, "b");
    }

    #[test]
    fn test_fusion_is_order_independent() {
        let engine = FusionEngine::new();
        let lexical = list(RetrievalMethod::Lexical, &[("a", 9.0), ("b", 4.0), ("c", 1.0)]);
        let vector = list(RetrievalMethod::Vector, &[("c", 0.9), ("b", 0.8), ("a", 0.1)]);

        let ab = engine.fuse(&[lexical.clone(), vector.clone()], 10);
        let ba = engine.fuse(&[vector, lexical], 10);

        let pairs = |cands: &[FusedCandidate]| {
            cands
                .iter()
                .map(|c| (c.doc_id.clone(), c.rrf_score))
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(&ab), pairs(&ba));
    }

    #[test]
    fn test_reversed_lists_tie_breaks_by_doc_id() {
        // Lexical [A,B,C] against vector [C,B,A]: B gets 1/62 + 1/62; A and
        // C both get 1/61 + 1/63. Expected order follows from the formula:
        // A and C (1/61 + 1/63 ≈ 0.032266) outscore B (2/62 ≈ 0.032258),
        // and the A/C tie breaks by doc_id ascending.
        let engine = FusionEngine::new();
        let lexical = list(RetrievalMethod::Lexical, &[("A", 3.0), ("B", 2.0), ("C", 1.0)]);
        let vector = list(RetrievalMethod::Vector, &[("C", 0.9), ("B", 0.8), ("A", 0.7)]);

        let fused = engine.fuse(&[lexical, vector], 3);
        let score_ac = 1.0 / 61.0 + 1.0 / 63.0;
        let score_b = 1.0 / 62.0 + 1.0 / 62.0;
        assert!(score_ac > score_b);

        let ids: Vec<_> = fused.iter().map(|c| c.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C", "B"]);
        assert!((fused[0].rrf_score - score_ac).abs() < 1e-12);
        assert!((fused[1].rrf_score - score_ac).abs() < 1e-12);
        assert!((fused[2].rrf_score - score_b).abs() < 1e-12);
    }

    #[test]
    fn test_fused_list_has_unique_doc_ids() {
        let engine = FusionEngine::new();
        let lexical = list(RetrievalMethod::Lexical, &[("a", 2.0), ("b", 1.0)]);
        let vector = list(RetrievalMethod::Vector, &[("a", 0.9), ("b", 0.8)]);

        let fused = engine.fuse(&[lexical, vector], 10);
        let mut ids: Vec<_> = fused.iter().map(|c| c.doc_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), fused.len());
    }

    #[test]
    fn test_empty_inputs_produce_empty_output() {
        let engine = FusionEngine::new();
        assert!(engine.fuse(&[], 10).is_empty());
        assert!(engine.fuse(&[Vec::new(), Vec::new()], 10).is_empty());
    }

    #[test]
    fn test_rrf_score_non_increasing_with_rank() {
        let engine = FusionEngine::new();
        let lexical = list(
            RetrievalMethod::Lexical,
            &[("a", 5.0), ("b", 4.0), ("c", 3.0), ("d", 2.0)],
        );
        let vector = list(RetrievalMethod::Vector, &[("c", 0.9), ("a", 0.8), ("e", 0.7)]);

        let fused = engine.fuse(&[lexical, vector], 10);
        assert!(fused.windows(2).all(|w| w[0].rrf_score >= w[1].rrf_score));

        let results = fused_into_results(fused);
        assert_eq!(results[0].rank, 1);
        assert!(results.iter().all(|r| r.method == RetrievalMethod::Fusion));
    }

    #[test]
    fn test_longest_text_wins_for_display() {
        let engine = FusionEngine::new();
        let mut lexical = list(RetrievalMethod::Lexical, &[("a", 2.0)]);
        lexical[0].text = "enunciado e excerto completos do documento".to_string();
        let mut vector = list(RetrievalMethod::Vector, &[("a", 0.9)]);
        vector[0].text = "enunciado".to_string();

        let fused = engine.fuse(&[vector, lexical], 10);
        assert_eq!(fused[0].text, "enunciado e excerto completos do documento");
    }

    #[test]
    fn test_top_k_truncates_after_ordering() {
        let engine = FusionEngine::new();
        let lexical = list(RetrievalMethod::Lexical, &[("a", 3.0), ("b", 2.0), ("c", 1.0)]);
        let vector = list(RetrievalMethod::Vector, &[("b", 0.9)]);

        let fused = engine.fuse(&[lexical, vector], 2);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].doc_id, "b");
    }
}
