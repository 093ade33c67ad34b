//! Retrieval engines
//!
//! Lexical (BM25), vector (exact cosine scan), RRF fusion, and pairwise
//! reranking over the same document set.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod fusion;
pub mod lexical;
pub mod rerank;
pub mod vector;

// Re-exports
pub use fusion::*;
pub use lexical::*;
pub use rerank::*;
pub use vector::*;

/// Which retrieval method produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalMethod {
    /// BM25 lexical scoring (unbounded positive scores)
    Lexical,
    /// Embedding cosine similarity (scores in [-1, 1])
    Vector,
    /// Reciprocal rank fusion of the above
    Fusion,
    /// Pairwise cross-encoder rescoring
    Rerank,
}

impl RetrievalMethod {
    /// Stable name for logging and export
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMethod::Lexical => "lexical",
            RetrievalMethod::Vector => "vector",
            RetrievalMethod::Fusion => "fusion",
            RetrievalMethod::Rerank => "rerank",
        }
    }
}

/// One scored document in a ranked list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Document identifier
    pub doc_id: String,
    /// Text carried for display and downstream scoring
    pub text: String,
    /// Method-specific raw score (scale depends on `method`)
    pub score: f64,
    /// 1-based rank in the list this result belongs to
    pub rank: usize,
    /// Method that produced `score`
    pub method: RetrievalMethod,
}

/// Metadata describing a built index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Model or scoring scheme name
    pub model_name: String,
    /// Embedding dimension (0 for lexical)
    pub dimension: usize,
    /// Number of indexed documents
    pub num_documents: usize,
    /// Index creation timestamp
    pub created_at: String,
}

/// Trait for retrieval engines
pub trait Retriever: Send + Sync {
    /// Retrieve the top-k most relevant documents for a query
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredResult>>;

    /// Get the name of this retriever
    fn name(&self) -> &str;
}

/// Assign 1-based ranks in place, preserving the current order
pub(crate) fn assign_ranks(results: &mut [ScoredResult]) {
    for (idx, result) in results.iter_mut().enumerate() {
        result.rank = idx + 1;
    }
}
