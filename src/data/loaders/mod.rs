//! CSV loaders for the jurisTCU-style corpus, query, and qrel files
//!
//! Corpus rows carry `KEY, ENUNCIADO, EXCERTO` columns; query files carry
//! `ID, TEXT`; qrel files carry `QUERY_ID, DOC_ID, SCORE`.

use crate::data::{LegalDocument, Query};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Raw corpus row as it appears in the dataset CSV
#[derive(Debug, Deserialize)]
struct CorpusRow {
    #[serde(rename = "KEY")]
    key: String,
    #[serde(rename = "ENUNCIADO")]
    statement: String,
    #[serde(rename = "EXCERTO", default)]
    excerpt: String,
}

/// One relevance judgment row
#[derive(Debug, Clone, Deserialize)]
pub struct QrelRow {
    /// Query identifier
    #[serde(rename = "QUERY_ID")]
    pub query_id: u64,
    /// Judged document identifier
    #[serde(rename = "DOC_ID")]
    pub doc_id: String,
    /// Graded relevance (> 0 means relevant)
    #[serde(rename = "SCORE")]
    pub score: f64,
}

/// One exported candidate row (pipeline output for offline evaluation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRow {
    /// Query identifier
    #[serde(rename = "QUERY_ID")]
    pub query_id: u64,
    /// Retrieved document identifier
    #[serde(rename = "DOC_ID")]
    pub doc_id: String,
    /// Final pipeline score
    #[serde(rename = "SCORE")]
    pub score: f64,
    /// 1-based rank within the query's result list
    #[serde(rename = "RANK")]
    pub rank: usize,
}

/// Load the document corpus from a CSV file
///
/// `limit` caps the number of documents loaded (None for all).
pub fn load_corpus(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Vec<LegalDocument>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context(format!("Failed to open corpus CSV: {:?}", path))?;

    let mut documents = Vec::new();
    for result in reader.deserialize::<CorpusRow>() {
        let row = result.context("Failed to parse corpus row")?;
        documents.push(LegalDocument::new(row.key, row.statement, row.excerpt));
        if let Some(limit) = limit {
            if documents.len() >= limit {
                break;
            }
        }
    }

    tracing::info!("Loaded {} documents from {:?}", documents.len(), path);
    Ok(documents)
}

/// Load queries from a CSV file with `ID, TEXT` columns
pub fn load_queries(path: impl AsRef<Path>) -> Result<Vec<Query>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .context(format!("Failed to open query CSV: {:?}", path))?;

    let queries = reader
        .deserialize::<Query>()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to parse query rows")?;

    tracing::info!("Loaded {} queries from {:?}", queries.len(), path);
    Ok(queries)
}

/// Load relevance judgments, grouped by query
///
/// Only rows with `score > 0` count as relevant.
pub fn load_qrels(path: impl AsRef<Path>) -> Result<HashMap<u64, HashSet<String>>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .context(format!("Failed to open qrels CSV: {:?}", path))?;

    let mut qrels: HashMap<u64, HashSet<String>> = HashMap::new();
    for result in reader.deserialize::<QrelRow>() {
        let row = result.context("Failed to parse qrel row")?;
        if row.score > 0.0 {
            qrels.entry(row.query_id).or_default().insert(row.doc_id);
        }
    }

    tracing::info!("Loaded judgments for {} queries from {:?}", qrels.len(), path);
    Ok(qrels)
}

/// Load candidate rows previously written by `write_candidates`
pub fn load_candidates(path: impl AsRef<Path>) -> Result<Vec<CandidateRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .context(format!("Failed to open candidates CSV: {:?}", path))?;

    reader
        .deserialize::<CandidateRow>()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to parse candidate rows")
}

/// Write candidate rows as CSV for offline evaluation
pub fn write_candidates(path: impl AsRef<Path>, rows: &[CandidateRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create output directory: {:?}", parent))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .context(format!("Failed to create candidates CSV: {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} candidate rows to {:?}", rows.len(), path);
    Ok(())
}
