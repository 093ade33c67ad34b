//! Offline retrieval evaluation against relevance judgments
//!
//! Standard IR metrics over exported candidate lists:
//! - Recall@K, Precision@K
//! - MRR (Mean Reciprocal Rank)
//! - NDCG@K (binary relevance)

use crate::data::CandidateRow;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Ranked retrieval output for one query plus its ground truth
#[derive(Debug, Clone)]
pub struct QueryEvaluation {
    /// Query identifier
    pub query_id: u64,
    /// Retrieved document ids in ranked order
    pub retrieved: Vec<String>,
    /// Relevant document ids (ground truth)
    pub relevant: HashSet<String>,
}

impl QueryEvaluation {
    /// Create an evaluation for one query
    pub fn new(query_id: u64, retrieved: Vec<String>, relevant: HashSet<String>) -> Self {
        Self {
            query_id,
            retrieved,
            relevant,
        }
    }

    /// Recall@K = |relevant ∩ retrieved@K| / |relevant|
    pub fn recall_at_k(&self, k: usize) -> f64 {
        if self.relevant.is_empty() {
            return 0.0;
        }
        let hits = self
            .retrieved
            .iter()
            .take(k)
            .filter(|d| self.relevant.contains(*d))
            .count();
        hits as f64 / self.relevant.len() as f64
    }

    /// Precision@K = |relevant ∩ retrieved@K| / K
    pub fn precision_at_k(&self, k: usize) -> f64 {
        if k == 0 {
            return 0.0;
        }
        let hits = self
            .retrieved
            .iter()
            .take(k)
            .filter(|d| self.relevant.contains(*d))
            .count();
        hits as f64 / k as f64
    }

    /// Reciprocal rank of the first relevant document (0 if none found)
    pub fn reciprocal_rank(&self) -> f64 {
        for (i, doc) in self.retrieved.iter().enumerate() {
            if self.relevant.contains(doc) {
                return 1.0 / (i + 1) as f64;
            }
        }
        0.0
    }

    /// DCG@K with binary relevance
    pub fn dcg_at_k(&self, k: usize) -> f64 {
        self.retrieved
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, doc)| {
                let relevance = if self.relevant.contains(doc) { 1.0 } else { 0.0 };
                relevance / (i as f64 + 2.0).log2()
            })
            .sum()
    }

    /// NDCG@K = DCG@K / IDCG@K
    pub fn ndcg_at_k(&self, k: usize) -> f64 {
        let num_relevant = self.relevant.len().min(k);
        let idcg: f64 = (0..num_relevant).map(|i| 1.0 / (i as f64 + 2.0).log2()).sum();
        if idcg == 0.0 {
            return 0.0;
        }
        self.dcg_at_k(k) / idcg
    }
}

/// Mean metrics across queries at a fixed cutoff
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalMetrics {
    /// Cutoff the @K metrics were computed at
    pub k: usize,
    /// Mean Recall@K
    pub recall: f64,
    /// Mean Precision@K
    pub precision: f64,
    /// Mean Reciprocal Rank
    pub mrr: f64,
    /// Mean NDCG@K
    pub ndcg: f64,
    /// Number of queries evaluated
    pub num_queries: usize,
}

impl std::fmt::Display for RetrievalMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Retrieval metrics ({} queries):", self.num_queries)?;
        writeln!(f, "  Recall@{}: {:.4}", self.k, self.recall)?;
        writeln!(f, "  Precision@{}: {:.4}", self.k, self.precision)?;
        writeln!(f, "  MRR: {:.4}", self.mrr)?;
        write!(f, "  NDCG@{}: {:.4}", self.k, self.ndcg)
    }
}

/// Average per-query metrics at cutoff `k`
pub fn evaluate(evaluations: &[QueryEvaluation], k: usize) -> RetrievalMetrics {
    if evaluations.is_empty() {
        return RetrievalMetrics {
            k,
            ..RetrievalMetrics::default()
        };
    }

    let n = evaluations.len() as f64;
    RetrievalMetrics {
        k,
        recall: evaluations.iter().map(|e| e.recall_at_k(k)).sum::<f64>() / n,
        precision: evaluations.iter().map(|e| e.precision_at_k(k)).sum::<f64>() / n,
        mrr: evaluations.iter().map(|e| e.reciprocal_rank()).sum::<f64>() / n,
        ndcg: evaluations.iter().map(|e| e.ndcg_at_k(k)).sum::<f64>() / n,
        num_queries: evaluations.len(),
    }
}

/// Join exported candidate rows with qrels into per-query evaluations
///
/// Candidate rows are grouped by query and ordered by their stored rank.
/// Queries without judgments are skipped.
pub fn evaluations_from_candidates(
    candidates: &[CandidateRow],
    qrels: &HashMap<u64, HashSet<String>>,
) -> Vec<QueryEvaluation> {
    let mut by_query: HashMap<u64, Vec<(usize, String)>> = HashMap::new();
    for row in candidates {
        by_query
            .entry(row.query_id)
            .or_default()
            .push((row.rank, row.doc_id.clone()));
    }

    let mut evaluations: Vec<QueryEvaluation> = by_query
        .into_iter()
        .filter_map(|(query_id, mut rows)| {
            let relevant = qrels.get(&query_id)?.clone();
            rows.sort_by_key(|(rank, _)| *rank);
            let retrieved = rows.into_iter().map(|(_, doc_id)| doc_id).collect();
            Some(QueryEvaluation::new(query_id, retrieved, relevant))
        })
        .collect();
    evaluations.sort_by_key(|e| e.query_id);
    evaluations
}
