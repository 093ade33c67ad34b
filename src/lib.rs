//! # jurisearch
//!
//! Hybrid retrieval over legal documents, combining lexical (BM25) and
//! semantic (embedding) signals via Reciprocal Rank Fusion, with optional
//! cross-encoder reranking and near-duplicate detection for result
//! disambiguation.
//!
//! ## Overview
//!
//! A query flows through the pipeline as:
//!
//! 1. `LexicalIndex` (BM25 over statement + excerpt) and `VectorIndex`
//!    (cosine over embedded statements) retrieve independently
//! 2. `FusionEngine` merges both ranked lists with RRF (`K = 60`)
//! 3. `Reranker` optionally rescores the fused candidates with a pairwise
//!    model
//! 4. `SimilarityDetector` flags near-duplicate result pairs for
//!    downstream clarification
//!
//! Embedding and pairwise-scoring models are external collaborators
//! injected through the `Embedder` and `PairwiseScorer` traits; when they
//! are absent or unavailable the pipeline degrades to lexical-only
//! retrieval instead of failing.
//!
//! ## Architecture
//!
//! - `data` - document model and CSV corpus/query/qrel loading
//! - `text` - tokenization and preprocessing for Portuguese legal text
//! - `embedding` - embedding provider seam, retry policy, built-in backends
//! - `retrieval` - lexical, vector, fusion, and reranking engines
//! - `similarity` - pairwise near-duplicate detection
//! - `pipeline` - the orchestrating `HybridPipeline`
//! - `evaluation` - offline IR metrics
//! - `cli` - command-line interface

pub mod cli;
pub mod data;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod pipeline;
pub mod retrieval;
pub mod similarity;
pub mod text;

// Re-export commonly used types
pub use error::{Result, SearchError};
pub use pipeline::{HybridPipeline, HybridPipelineBuilder, PipelineConfig};
pub use retrieval::{RetrievalMethod, ScoredResult};
pub use similarity::SimilarityPair;
