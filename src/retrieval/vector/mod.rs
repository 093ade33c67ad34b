//! Vector retrieval via exact cosine scan
//!
//! Stores one embedding per node and scores queries against every stored
//! vector. Exact scan keeps ranking deterministic, which matters more than
//! ANN speed at jurisprudence-corpus sizes.

use crate::data::IndexedNode;
use crate::embedding::{cosine_similarity, Embedder, Embedding, RetryPolicy};
use crate::error::{Result, SearchError};
use crate::retrieval::{assign_ranks, IndexMetadata, RetrievalMethod, Retriever, ScoredResult};
use std::sync::Arc;

struct VectorEntry {
    doc_id: String,
    text: String,
    embedding: Embedding,
}

/// Cosine-similarity index over externally supplied embeddings
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
    dimension: usize,
    embedder: Arc<dyn Embedder>,
    retry: RetryPolicy,
    metadata: IndexMetadata,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("entries", &self.entries.len())
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Build an index by embedding all node texts in one batch call
    ///
    /// A provider failure (after the retry budget) surfaces as
    /// `SearchError::Provider`; the pipeline treats it as "vector retrieval
    /// unavailable" rather than a fatal error.
    pub fn build(
        nodes: Vec<IndexedNode>,
        embedder: Arc<dyn Embedder>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        tracing::info!(
            "Building vector index: {} nodes, model={}",
            nodes.len(),
            embedder.model_name()
        );

        let texts: Vec<&str> = nodes.iter().map(|n| n.text.as_str()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            retry.run("corpus embedding", || embedder.embed_batch(&texts))?
        };

        if embeddings.len() != nodes.len() {
            return Err(SearchError::Invariant(format!(
                "embedding provider returned {} vectors for {} nodes",
                embeddings.len(),
                nodes.len()
            )));
        }

        let dimension = embeddings.first().map_or(embedder.dimension(), Vec::len);
        let entries = nodes
            .into_iter()
            .zip(embeddings)
            .map(|(node, embedding)| VectorEntry {
                doc_id: node.id,
                text: node.text,
                embedding,
            })
            .collect::<Vec<_>>();

        let metadata = IndexMetadata {
            model_name: embedder.model_name().to_string(),
            dimension,
            num_documents: entries.len(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        Ok(Self {
            entries,
            dimension,
            embedder,
            retry,
            metadata,
        })
    }

    /// Get index metadata
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no documents
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Retriever for VectorIndex {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .retry
            .run("query embedding", || self.embedder.embed(query))?;

        // A dimension mismatch is a caller bug, never a degradable failure.
        if query_embedding.len() != self.dimension {
            return Err(SearchError::Invariant(format!(
                "query embedding dimension {} != index dimension {}",
                query_embedding.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let similarity = cosine_similarity(&query_embedding, &entry.embedding) as f64;
                (position, similarity)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut results: Vec<ScoredResult> = scored
            .into_iter()
            .take(top_k)
            .map(|(position, score)| {
                let entry = &self.entries[position];
                ScoredResult {
                    doc_id: entry.doc_id.clone(),
                    text: entry.text.clone(),
                    score,
                    rank: 0,
                    method: RetrievalMethod::Vector,
                }
            })
            .collect();
        assign_ranks(&mut results);

        tracing::debug!("Vector index retrieved {} results for query", results.len());
        Ok(results)
    }

    fn name(&self) -> &str {
        "vector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingConfig, MockEmbedder, TokenEmbedder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn nodes() -> Vec<IndexedNode> {
        vec![
            IndexedNode::new("d1", "licitação pública e contratos"),
            IndexedNode::new("d2", "procedimento licitatório e contratos administrativos"),
            IndexedNode::new("d3", "sessão plenária e voto do relator"),
        ]
    }

    #[test]
    fn test_build_and_retrieve() {
        let embedder = Arc::new(TokenEmbedder::new(EmbeddingConfig::default(), 256));
        let index = VectorIndex::build(nodes(), embedder, RetryPolicy::none()).unwrap();

        let results = index.retrieve("licitação contratos", 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].rank, 1);
        // Cosine similarity stays within [-1, 1].
        assert!(results.iter().all(|r| r.score >= -1.0 && r.score <= 1.0));
        // Descending order.
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_empty_index_yields_empty_list() {
        let embedder = Arc::new(MockEmbedder::new(EmbeddingConfig::default(), 64));
        let index = VectorIndex::build(Vec::new(), embedder, RetryPolicy::none()).unwrap();
        assert!(index.is_empty());
        assert!(index.retrieve("qualquer", 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_is_invariant_violation() {
        // Embedder whose query-time dimension disagrees with build time.
        struct ShiftingEmbedder {
            calls: AtomicUsize,
        }
        impl Embedder for ShiftingEmbedder {
            fn embed(&self, _text: &str) -> Result<Embedding> {
                // Query path: wrong dimension
                Ok(vec![0.5; 8])
            }
            fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
            }
            fn dimension(&self) -> usize {
                4
            }
            fn model_name(&self) -> &str {
                "shifting"
            }
        }

        let embedder = Arc::new(ShiftingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let index = VectorIndex::build(nodes(), embedder, RetryPolicy::none()).unwrap();

        let err = index.retrieve("consulta", 3).unwrap_err();
        assert!(matches!(err, SearchError::Invariant(_)));
    }

    #[test]
    fn test_build_provider_failure_surfaces_as_provider_error() {
        struct DownEmbedder;
        impl Embedder for DownEmbedder {
            fn embed(&self, _text: &str) -> Result<Embedding> {
                Err(SearchError::Provider("model offline".into()))
            }
            fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>> {
                Err(SearchError::Provider("model offline".into()))
            }
            fn dimension(&self) -> usize {
                4
            }
            fn model_name(&self) -> &str {
                "down"
            }
        }

        let err = VectorIndex::build(nodes(), Arc::new(DownEmbedder), RetryPolicy::none())
            .unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));
    }
}
