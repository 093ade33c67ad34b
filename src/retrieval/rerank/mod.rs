//! Pairwise reranking
//!
//! Rescores a small fused candidate set with an injected cross-encoder
//! style model. The model scores (query, document) pairs jointly, so it is
//! applied only after fusion has narrowed the candidates.

use crate::embedding::RetryPolicy;
use crate::error::{Result, SearchError};
use crate::retrieval::{assign_ranks, FusedCandidate, RetrievalMethod, ScoredResult};
use std::sync::Arc;

/// Trait for pairwise relevance models
pub trait PairwiseScorer: Send + Sync {
    /// Score a batch of (query, document) pairs; one score per document,
    /// in input order
    fn score_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f64>>;

    /// Get the model name
    fn name(&self) -> &str;
}

/// Reranker over fused candidates
///
/// Holds an optional scoring model: when no model is configured (or the
/// candidate list is empty) `rerank` passes the fused ordering through
/// unchanged, so pipeline callers never branch before calling it.
pub struct Reranker {
    scorer: Option<Arc<dyn PairwiseScorer>>,
    retry: RetryPolicy,
}

impl Reranker {
    /// Create a reranker backed by a pairwise model
    pub fn new(scorer: Arc<dyn PairwiseScorer>, retry: RetryPolicy) -> Self {
        Self {
            scorer: Some(scorer),
            retry,
        }
    }

    /// Create a pass-through reranker (no model configured)
    pub fn disabled() -> Self {
        Self {
            scorer: None,
            retry: RetryPolicy::none(),
        }
    }

    /// Whether a scoring model is configured
    pub fn is_enabled(&self) -> bool {
        self.scorer.is_some()
    }

    /// Rescore candidates and return the top `top_n`
    ///
    /// With a model: builds (query, text) pairs in candidate order, scores
    /// them in one batch call, discards the RRF scores, and sorts by the
    /// model's output descending (stable, so equal scores keep the fused
    /// order). Without a model, or with no candidates, the fused ordering
    /// is returned unchanged.
    pub fn rerank(
        &self,
        query: &str,
        candidates: Vec<FusedCandidate>,
        top_n: usize,
    ) -> Result<Vec<ScoredResult>> {
        let Some(scorer) = &self.scorer else {
            return Ok(pass_through(candidates, top_n));
        };
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Reranking {} candidates with {}",
            candidates.len(),
            scorer.name()
        );

        let documents: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let scores = self
            .retry
            .run("pairwise scoring", || scorer.score_batch(query, &documents))?;

        if scores.len() != candidates.len() {
            return Err(SearchError::Invariant(format!(
                "pairwise scorer returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }

        let mut results: Vec<ScoredResult> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, score)| ScoredResult {
                doc_id: candidate.doc_id,
                text: candidate.text,
                score,
                rank: 0,
                method: RetrievalMethod::Rerank,
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_n);
        assign_ranks(&mut results);

        Ok(results)
    }
}

fn pass_through(candidates: Vec<FusedCandidate>, top_n: usize) -> Vec<ScoredResult> {
    let mut results: Vec<ScoredResult> = candidates
        .into_iter()
        .take(top_n)
        .map(FusedCandidate::into_result)
        .collect();
    assign_ranks(&mut results);
    results
}
