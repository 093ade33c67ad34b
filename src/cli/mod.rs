//! Command-line interface
//!
//! Provides CLI commands for search, candidate export, and offline
//! evaluation over a jurisTCU-style corpus.

use crate::data::{load_candidates, load_corpus, load_qrels, load_queries, write_candidates, CandidateRow};
use crate::embedding::{create_embedder, EmbeddingConfig};
use crate::evaluation::{evaluate, evaluations_from_candidates};
use crate::pipeline::HybridPipeline;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Build a pipeline from CLI-level options
fn build_pipeline(
    corpus: &str,
    limit: Option<usize>,
    backend: &str,
    dimension: usize,
) -> Result<HybridPipeline> {
    let documents = load_corpus(corpus, limit)?;

    let mut builder = HybridPipeline::builder().documents(documents);
    if backend != "none" {
        let config = EmbeddingConfig {
            model_name: backend.to_string(),
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(backend, config, dimension)
            .context("Failed to create embedding backend")?;
        builder = builder.embedder(embedder);
    }

    builder.build().context("Failed to build retrieval pipeline")
}

/// Execute the search command
pub fn search(
    corpus: String,
    query: String,
    top_k: usize,
    backend: String,
    dimension: usize,
    limit: Option<usize>,
    show_pairs: bool,
) -> Result<()> {
    tracing::info!("Searching corpus {} for: {}", corpus, query);

    let pipeline = build_pipeline(&corpus, limit, &backend, dimension)?;
    let results = pipeline.search(&query, top_k)?;

    if results.is_empty() {
        println!("No results for \"{}\"", query);
        return Ok(());
    }

    for result in &results {
        println!(
            "{:>3}. [{:>8}] {:.6}  {}",
            result.rank,
            result.method.as_str(),
            result.score,
            truncate(&result.text, 100)
        );
    }

    if show_pairs {
        let pairs = pipeline.detect_ambiguous_results(&results)?;
        if pairs.is_empty() {
            println!("No ambiguous result pairs detected");
        } else {
            println!("Ambiguous result pairs:");
            for pair in &pairs {
                println!(
                    "  {} <-> {} (similarity {:.4})",
                    pair.doc_a, pair.doc_b, pair.similarity
                );
            }
        }
    }

    Ok(())
}

/// Execute the candidates command: run a query batch through the pipeline
/// and export ranked rows as CSV for offline evaluation
pub fn candidates(
    corpus: String,
    queries: String,
    output: String,
    top_k: usize,
    backend: String,
    dimension: usize,
    limit: Option<usize>,
) -> Result<()> {
    let pipeline = build_pipeline(&corpus, limit, &backend, dimension)?;
    let queries = load_queries(&queries)?;

    let mut rows = Vec::new();
    for query in &queries {
        let results = pipeline
            .search(&query.text, top_k)
            .context(format!("Search failed for query {}", query.id))?;
        for result in results {
            rows.push(CandidateRow {
                query_id: query.id,
                doc_id: result.doc_id,
                score: result.score,
                rank: result.rank,
            });
        }
    }

    write_candidates(&output, &rows)?;
    println!("Wrote {} rows for {} queries to {}", rows.len(), queries.len(), output);
    Ok(())
}

/// Execute the eval command: score exported candidates against qrels
pub fn eval(candidates_path: String, qrels_path: String, k: usize, json: bool) -> Result<()> {
    let candidates = load_candidates(&candidates_path)?;
    let qrels = load_qrels(&qrels_path)?;

    let evaluations = evaluations_from_candidates(&candidates, &qrels);
    if evaluations.is_empty() {
        anyhow::bail!("No overlapping queries between candidates and qrels");
    }

    let metrics = evaluate(&evaluations, k);
    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!("{}", metrics);
    }
    Ok(())
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("curto", 100), "curto");
        let long = "licitação pública e contratos administrativos";
        let out = truncate(long, 10);
        assert!(out.ends_with("..."));
        assert!(out.chars().count() <= 13);
    }
}
