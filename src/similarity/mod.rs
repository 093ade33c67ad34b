//! Near-duplicate detection over retrieved results
//!
//! Computes pairwise cosine similarity across an already-retrieved result
//! set to flag ambiguous (near-duplicate-content) pairs. Downstream
//! consumers use the pairs to trigger clarifying questions; generating the
//! question text is out of scope here.

use crate::embedding::{cosine_similarity, Embedder, RetryPolicy};
use crate::error::{Result, SearchError};
use crate::retrieval::ScoredResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An unordered pair of documents with their cosine similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityPair {
    /// First document of the pair
    pub doc_a: String,
    /// Second document of the pair
    pub doc_b: String,
    /// Cosine similarity of the two texts, in [-1, 1]
    pub similarity: f64,
}

/// Pairwise similarity detector over a result set
pub struct SimilarityDetector {
    embedder: Arc<dyn Embedder>,
    retry: RetryPolicy,
}

impl SimilarityDetector {
    /// Create a detector backed by an embedding provider
    pub fn new(embedder: Arc<dyn Embedder>, retry: RetryPolicy) -> Self {
        Self { embedder, retry }
    }

    /// Find the most similar result pairs above a threshold
    ///
    /// Embeds all result texts in one batch call, computes cosine
    /// similarity for every unordered pair, keeps pairs strictly above
    /// `threshold`, and returns the `top_k` most similar (descending, ties
    /// broken by document ids). Fewer than two results, or no pair above
    /// the threshold, yields an empty list rather than an error.
    pub fn detect(
        &self,
        results: &[ScoredResult],
        threshold: f64,
        top_k: usize,
    ) -> Result<Vec<SimilarityPair>> {
        if results.len() < 2 {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        let embeddings = self
            .retry
            .run("pair embedding", || self.embedder.embed_batch(&texts))?;

        if embeddings.len() != results.len() {
            return Err(SearchError::Invariant(format!(
                "embedding provider returned {} vectors for {} results",
                embeddings.len(),
                results.len()
            )));
        }

        let mut pairs = Vec::new();
        for i in 0..results.len() {
            for j in (i + 1)..results.len() {
                let similarity = cosine_similarity(&embeddings[i], &embeddings[j]) as f64;
                // Strict comparison: a pair exactly at the threshold is not
                // considered ambiguous.
                if similarity > threshold {
                    pairs.push(SimilarityPair {
                        doc_a: results[i].doc_id.clone(),
                        doc_b: results[j].doc_id.clone(),
                        similarity,
                    });
                }
            }
        }

        pairs.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| (a.doc_a.as_str(), a.doc_b.as_str()).cmp(&(b.doc_a.as_str(), b.doc_b.as_str())))
        });
        pairs.truncate(top_k);

        tracing::debug!(
            "Similarity detection over {} results produced {} pairs above {}",
            results.len(),
            pairs.len(),
            threshold
        );
        Ok(pairs)
    }
}
