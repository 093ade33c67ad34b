//! Hybrid retrieval pipeline
//!
//! Orchestrates the lexical index, the optional vector index, RRF fusion,
//! and optional reranking, and defines the degradation policy: a missing
//! or failing embedding provider reduces a query to lexical-only retrieval,
//! never to a fatal error.

use crate::data::{IndexedNode, LegalDocument};
use crate::embedding::{Embedder, RetryPolicy};
use crate::error::{Result, SearchError};
use crate::retrieval::{
    Bm25Params, FusionEngine, LexicalIndex, PairwiseScorer, Reranker, Retriever, ScoredResult,
    VectorIndex,
};
use crate::similarity::{SimilarityDetector, SimilarityPair};
use crate::text::{strip_html, PortugueseTokenizer, Tokenizer};
use std::sync::Arc;

/// Configuration for the hybrid pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// BM25 parameters for the lexical index
    pub bm25: Bm25Params,
    /// How many results to request from each retriever per fused result
    pub fetch_multiplier: usize,
    /// Similarity threshold for ambiguous-pair detection
    pub similarity_threshold: f64,
    /// Maximum ambiguous pairs to report
    pub similarity_top_k: usize,
    /// Retry policy for provider calls
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bm25: Bm25Params::default(),
            fetch_multiplier: 2,
            similarity_threshold: 0.8,
            similarity_top_k: 3,
            retry: RetryPolicy::default(),
        }
    }
}

/// Hybrid retrieval pipeline over a fixed document set
///
/// Indices are built once and are read-only afterwards; concurrent
/// `search` calls share them safely.
pub struct HybridPipeline {
    lexical: LexicalIndex,
    vector: Option<VectorIndex>,
    fusion: FusionEngine,
    reranker: Reranker,
    detector: Option<SimilarityDetector>,
    config: PipelineConfig,
}

impl std::fmt::Debug for HybridPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridPipeline")
            .field("has_vector", &self.vector.is_some())
            .finish_non_exhaustive()
    }
}

impl HybridPipeline {
    /// Start building a pipeline
    pub fn builder() -> HybridPipelineBuilder {
        HybridPipelineBuilder::new()
    }

    /// Whether vector retrieval is available
    pub fn has_vector_index(&self) -> bool {
        self.vector.is_some()
    }

    /// Whether a reranking model is configured
    pub fn has_reranker(&self) -> bool {
        self.reranker.is_enabled()
    }

    /// Search the corpus, returning the final ranked list
    ///
    /// Runs lexical and vector retrieval over the same query, fuses the
    /// lists via RRF, and reranks when a pairwise model is configured.
    /// Vector-side provider failures degrade this query to lexical-only.
    /// Errors surface only for configuration or invariant violations.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
        let fetch_k = top_k.saturating_mul(self.config.fetch_multiplier).max(top_k);

        let lexical_results = self.lexical.retrieve(query, fetch_k)?;
        tracing::debug!("Lexical retrieval: {} results", lexical_results.len());

        let vector_results = match &self.vector {
            Some(index) => match index.retrieve(query, fetch_k) {
                Ok(results) => {
                    tracing::debug!("Vector retrieval: {} results", results.len());
                    results
                }
                Err(err) if err.is_transient() => {
                    tracing::warn!("Vector retrieval unavailable, degrading to lexical-only: {}", err);
                    Vec::new()
                }
                Err(err) => return Err(err),
            },
            None => Vec::new(),
        };

        let fuse_k = if self.reranker.is_enabled() { fetch_k } else { top_k };
        let candidates = self
            .fusion
            .fuse(&[lexical_results, vector_results], fuse_k);

        match self.reranker.rerank(query, candidates.clone(), top_k) {
            Ok(results) => Ok(results),
            Err(err) if err.is_transient() => {
                tracing::warn!("Reranker unavailable, returning fused order: {}", err);
                Ok(Reranker::disabled().rerank(query, candidates, top_k)?)
            }
            Err(err) => Err(err),
        }
    }

    /// Flag near-duplicate pairs within an already-retrieved result set
    ///
    /// Returns an empty list when no embedding provider is configured or
    /// when the provider stays unavailable past the retry budget.
    pub fn detect_similar_pairs(
        &self,
        results: &[ScoredResult],
        threshold: f64,
        top_k: usize,
    ) -> Result<Vec<SimilarityPair>> {
        let Some(detector) = &self.detector else {
            tracing::debug!("No embedding provider configured; skipping pair detection");
            return Ok(Vec::new());
        };

        match detector.detect(results, threshold, top_k) {
            Ok(pairs) => Ok(pairs),
            Err(err) if err.is_transient() => {
                tracing::warn!("Similarity detection unavailable for this call: {}", err);
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Flag near-duplicate pairs using the configured threshold and limit
    pub fn detect_ambiguous_results(
        &self,
        results: &[ScoredResult],
    ) -> Result<Vec<SimilarityPair>> {
        self.detect_similar_pairs(
            results,
            self.config.similarity_threshold,
            self.config.similarity_top_k,
        )
    }
}

/// Builder for `HybridPipeline`
pub struct HybridPipelineBuilder {
    documents: Vec<LegalDocument>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    embedder: Option<Arc<dyn Embedder>>,
    scorer: Option<Arc<dyn PairwiseScorer>>,
    config: PipelineConfig,
}

impl HybridPipelineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            tokenizer: None,
            embedder: None,
            scorer: None,
            config: PipelineConfig::default(),
        }
    }

    /// Set the document corpus (required)
    pub fn documents(mut self, documents: Vec<LegalDocument>) -> Self {
        self.documents = documents;
        self
    }

    /// Set the lexical tokenizer (defaults to the Portuguese tokenizer)
    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Set the embedding provider (optional; enables vector retrieval and
    /// similarity detection)
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the pairwise reranking model (optional)
    pub fn scorer(mut self, scorer: Arc<dyn PairwiseScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Set the pipeline configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the pipeline, constructing both indices
    ///
    /// The lexical index combines statement and excerpt per document; the
    /// vector index embeds the HTML-stripped statement. Both use the same
    /// document ids so fusion can join them. An embedding provider that
    /// fails during the build degrades to a lexical-only pipeline.
    pub fn build(self) -> Result<HybridPipeline> {
        if self.documents.is_empty() {
            return Err(SearchError::Configuration(
                "cannot build a pipeline without documents".into(),
            ));
        }

        let tokenizer = self
            .tokenizer
            .unwrap_or_else(|| Arc::new(PortugueseTokenizer::new()));

        let lexical_nodes: Vec<IndexedNode> = self
            .documents
            .iter()
            .map(|doc| {
                IndexedNode::new(
                    doc.id.clone(),
                    format!("{} {}", doc.statement, doc.excerpt),
                )
            })
            .collect();
        let lexical = LexicalIndex::build(lexical_nodes, tokenizer, self.config.bm25);

        let (vector, detector) = match &self.embedder {
            Some(embedder) => {
                let vector_nodes: Vec<IndexedNode> = self
                    .documents
                    .iter()
                    .map(|doc| IndexedNode::new(doc.id.clone(), strip_html(&doc.statement)))
                    .collect();

                let vector = match VectorIndex::build(
                    vector_nodes,
                    Arc::clone(embedder),
                    self.config.retry.clone(),
                ) {
                    Ok(index) => Some(index),
                    Err(err) if err.is_transient() => {
                        tracing::warn!(
                            "Embedding provider unavailable during build; vector retrieval disabled: {}",
                            err
                        );
                        None
                    }
                    Err(err) => return Err(err),
                };

                let detector = Some(SimilarityDetector::new(
                    Arc::clone(embedder),
                    self.config.retry.clone(),
                ));
                (vector, detector)
            }
            None => {
                tracing::info!("No embedding provider configured; lexical-only pipeline");
                (None, None)
            }
        };

        let reranker = match self.scorer {
            Some(scorer) => Reranker::new(scorer, self.config.retry.clone()),
            None => Reranker::disabled(),
        };

        tracing::info!(
            "Pipeline ready: {} documents, vector={}, reranker={}",
            self.documents.len(),
            vector.is_some(),
            reranker.is_enabled()
        );

        Ok(HybridPipeline {
            lexical,
            vector,
            fusion: FusionEngine::new(),
            reranker,
            detector,
            config: self.config,
        })
    }
}

impl Default for HybridPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedding;
    use crate::retrieval::RetrievalMethod;
    use crate::text::WhitespaceTokenizer;

    fn corpus() -> Vec<LegalDocument> {
        vec![
            LegalDocument::new("d1", "licitação pública e contratos", ""),
            LegalDocument::new("d2", "procedimento licitatório e contratos administrativos", ""),
            LegalDocument::new("d3", "sessão plenária e voto do relator", ""),
        ]
    }

    /// Embedder placing d1/d2 statements close together (cosine ~0.95) and
    /// d3 orthogonal to both; queries about procurement land near d1/d2.
    struct ScriptedEmbedder;

    impl ScriptedEmbedder {
        fn vector_for(text: &str) -> Embedding {
            if text.contains("licitação pública") || text.contains("licitacao") {
                vec![1.0, 0.0, 0.0]
            } else if text.contains("licitatório") {
                // cos with d1 = 0.95
                vec![0.95, 0.312_25, 0.0]
            } else {
                vec![0.0, 0.0, 1.0]
            }
        }
    }

    impl Embedder for ScriptedEmbedder {
        fn embed(&self, text: &str) -> Result<Embedding> {
            Ok(Self::vector_for(text))
        }
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
            Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
        }
        fn dimension(&self) -> usize {
            3
        }
        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    /// Embedder that always fails, for degradation tests.
    struct DownEmbedder;
    impl Embedder for DownEmbedder {
        fn embed(&self, _text: &str) -> Result<Embedding> {
            Err(SearchError::Provider("model offline".into()))
        }
        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>> {
            Err(SearchError::Provider("model offline".into()))
        }
        fn dimension(&self) -> usize {
            3
        }
        fn model_name(&self) -> &str {
            "down"
        }
    }

    fn no_retry_config() -> PipelineConfig {
        PipelineConfig {
            retry: RetryPolicy::none(),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_empty_corpus_is_a_configuration_error() {
        let err = HybridPipeline::builder().build().unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
    }

    #[test]
    fn test_lexical_only_search() {
        let pipeline = HybridPipeline::builder()
            .documents(corpus())
            .tokenizer(Arc::new(WhitespaceTokenizer))
            .build()
            .unwrap();
        assert!(!pipeline.has_vector_index());

        let results = pipeline.search("licitação", 10).unwrap();
        assert_eq!(results[0].doc_id, "d1");
        assert!(results.iter().all(|r| r.doc_id != "d3"));
        assert!(results.iter().all(|r| r.method == RetrievalMethod::Fusion));
        // Present only in the lexical list at rank 1.
        assert!((results[0].score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn test_hybrid_fused_top_two_are_the_procurement_documents() {
        let pipeline = HybridPipeline::builder()
            .documents(corpus())
            .tokenizer(Arc::new(WhitespaceTokenizer))
            .embedder(Arc::new(ScriptedEmbedder))
            .config(no_retry_config())
            .build()
            .unwrap();
        assert!(pipeline.has_vector_index());

        let results = pipeline.search("licitacao", 2).unwrap();
        let mut top: Vec<_> = results.iter().map(|r| r.doc_id.as_str()).collect();
        top.sort();
        assert_eq!(top, vec!["d1", "d2"]);
    }

    #[test]
    fn test_build_degrades_to_lexical_when_provider_is_down() {
        let pipeline = HybridPipeline::builder()
            .documents(corpus())
            .tokenizer(Arc::new(WhitespaceTokenizer))
            .embedder(Arc::new(DownEmbedder))
            .config(no_retry_config())
            .build()
            .unwrap();

        assert!(!pipeline.has_vector_index());
        let results = pipeline.search("licitação", 5).unwrap();
        assert_eq!(results[0].doc_id, "d1");
    }

    #[test]
    fn test_search_always_returns_a_list() {
        let pipeline = HybridPipeline::builder()
            .documents(corpus())
            .tokenizer(Arc::new(WhitespaceTokenizer))
            .build()
            .unwrap();

        // No lexical match and no vector index: empty, not an error.
        let results = pipeline.search("astrofísica", 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_reranker_reorders_final_list() {
        struct PreferD2;
        impl PairwiseScorer for PreferD2 {
            fn score_batch(&self, _query: &str, documents: &[&str]) -> Result<Vec<f64>> {
                Ok(documents
                    .iter()
                    .map(|d| if d.contains("licitatório") { 10.0 } else { 1.0 })
                    .collect())
            }
            fn name(&self) -> &str {
                "prefer-d2"
            }
        }

        let pipeline = HybridPipeline::builder()
            .documents(corpus())
            .tokenizer(Arc::new(WhitespaceTokenizer))
            .embedder(Arc::new(ScriptedEmbedder))
            .scorer(Arc::new(PreferD2))
            .config(no_retry_config())
            .build()
            .unwrap();
        assert!(pipeline.has_reranker());

        let results = pipeline.search("licitacao", 2).unwrap();
        assert_eq!(results[0].doc_id, "d2");
        assert_eq!(results[0].method, RetrievalMethod::Rerank);
        assert_eq!(results[0].score, 10.0);
    }

    #[test]
    fn test_failing_reranker_falls_back_to_fused_order() {
        struct DownScorer;
        impl PairwiseScorer for DownScorer {
            fn score_batch(&self, _query: &str, _documents: &[&str]) -> Result<Vec<f64>> {
                Err(SearchError::Provider("model offline".into()))
            }
            fn name(&self) -> &str {
                "down"
            }
        }

        let pipeline = HybridPipeline::builder()
            .documents(corpus())
            .tokenizer(Arc::new(WhitespaceTokenizer))
            .scorer(Arc::new(DownScorer))
            .config(no_retry_config())
            .build()
            .unwrap();

        let results = pipeline.search("licitação", 5).unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.method == RetrievalMethod::Fusion));
    }

    #[test]
    fn test_detect_similar_pairs_flags_near_duplicates() {
        let pipeline = HybridPipeline::builder()
            .documents(corpus())
            .tokenizer(Arc::new(WhitespaceTokenizer))
            .embedder(Arc::new(ScriptedEmbedder))
            .config(no_retry_config())
            .build()
            .unwrap();

        let results = pipeline.search("licitacao", 3).unwrap();
        let pairs = pipeline.detect_ambiguous_results(&results).unwrap();
        assert_eq!(pairs.len(), 1);
        let pair = &pairs[0];
        let mut ids = vec![pair.doc_a.as_str(), pair.doc_b.as_str()];
        ids.sort();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert!(pair.similarity > 0.9);
    }

    #[test]
    fn test_detect_similar_pairs_without_embedder_is_empty() {
        let pipeline = HybridPipeline::builder()
            .documents(corpus())
            .tokenizer(Arc::new(WhitespaceTokenizer))
            .build()
            .unwrap();

        let results = pipeline.search("licitação", 5).unwrap();
        assert!(pipeline
            .detect_similar_pairs(&results, 0.8, 3)
            .unwrap()
            .is_empty());
    }
}
