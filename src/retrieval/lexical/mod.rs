//! Lexical retrieval via BM25
//!
//! In-memory inverted index with tunable saturation (`k1`) and length
//! normalization (`b`) parameters and an injected tokenizer. Scoring is a
//! pure function of the built index, so identical queries always produce
//! identical ordered output.

use crate::data::IndexedNode;
use crate::error::Result;
use crate::retrieval::{assign_ranks, IndexMetadata, RetrievalMethod, Retriever, ScoredResult};
use crate::text::Tokenizer;
use std::collections::HashMap;
use std::sync::Arc;

/// BM25 parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    /// Term-frequency saturation strength
    pub k1: f64,
    /// Document-length normalization strength
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        // Parameters tuned for the jurisTCU corpus
        Self { k1: 1.2, b: 0.75 }
    }
}

/// BM25 index over a fixed document set
pub struct LexicalIndex {
    /// Term -> (document position, term frequency) postings
    postings: HashMap<String, Vec<(usize, u32)>>,
    /// Token count per document, in insertion order
    doc_lengths: Vec<u32>,
    /// Average document length
    avg_doc_len: f64,
    /// Indexed nodes, in insertion order (position is the tie-break key)
    nodes: Vec<IndexedNode>,
    params: Bm25Params,
    tokenizer: Arc<dyn Tokenizer>,
    metadata: IndexMetadata,
}

impl LexicalIndex {
    /// Build an index from nodes
    ///
    /// An empty node set builds an index that yields no results rather
    /// than failing.
    pub fn build(
        nodes: Vec<IndexedNode>,
        tokenizer: Arc<dyn Tokenizer>,
        params: Bm25Params,
    ) -> Self {
        tracing::info!(
            "Building BM25 index: {} nodes, tokenizer={}, k1={}, b={}",
            nodes.len(),
            tokenizer.name(),
            params.k1,
            params.b
        );

        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(nodes.len());

        for (position, node) in nodes.iter().enumerate() {
            let tokens = tokenizer.tokenize(&node.text);
            doc_lengths.push(tokens.len() as u32);

            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *term_freqs.entry(token).or_insert(0) += 1;
            }
            for (term, freq) in term_freqs {
                postings.entry(term).or_default().push((position, freq));
            }
        }

        let total_len: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avg_doc_len = if doc_lengths.is_empty() {
            0.0
        } else {
            total_len as f64 / doc_lengths.len() as f64
        };

        let metadata = IndexMetadata {
            model_name: "bm25".to_string(),
            dimension: 0,
            num_documents: nodes.len(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        Self {
            postings,
            doc_lengths,
            avg_doc_len,
            nodes,
            params,
            tokenizer,
            metadata,
        }
    }

    /// Get index metadata
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the index holds no documents
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// BM25 scores per document position for a tokenized query
    fn score_query(&self, query_tokens: &[String]) -> HashMap<usize, f64> {
        let n = self.doc_lengths.len() as f64;
        let mut scores: HashMap<usize, f64> = HashMap::new();

        for term in query_tokens {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let df = postings.len() as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for &(position, tf) in postings {
                let tf = tf as f64;
                let doc_len = self.doc_lengths[position] as f64;
                let norm = 1.0 - self.params.b + self.params.b * doc_len / self.avg_doc_len;
                let score = idf * (tf * (self.params.k1 + 1.0)) / (tf + self.params.k1 * norm);
                *scores.entry(position).or_insert(0.0) += score;
            }
        }

        scores
    }
}

impl Retriever for LexicalIndex {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
        if self.nodes.is_empty() {
            return Ok(Vec::new());
        }

        let query_tokens = self.tokenizer.tokenize(query);
        let scores = self.score_query(&query_tokens);

        // Collect in document insertion order so the descending stable sort
        // breaks score ties by original position.
        let mut scored: Vec<(usize, f64)> = (0..self.nodes.len())
            .filter_map(|position| {
                let score = *scores.get(&position)?;
                (score > 0.0).then_some((position, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut results: Vec<ScoredResult> = scored
            .into_iter()
            .take(top_k)
            .map(|(position, score)| {
                let node = &self.nodes[position];
                ScoredResult {
                    doc_id: node.id.clone(),
                    text: node.text.clone(),
                    score,
                    rank: 0,
                    method: RetrievalMethod::Lexical,
                }
            })
            .collect();
        assign_ranks(&mut results);

        tracing::debug!("BM25 retrieved {} results for query", results.len());
        Ok(results)
    }

    fn name(&self) -> &str {
        "bm25"
    }
}
