//! Legal document model and corpus loading
//!
//! Documents follow the TCU jurisprudence shape: a headnote-style statement
//! plus a ruling excerpt. A document is immutable once loaded and is owned
//! by the pipeline for the lifetime of one session.

use serde::{Deserialize, Serialize};

pub mod loaders;

// Re-exports for convenience
pub use loaders::*;

/// A legal document as loaded from the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalDocument {
    /// Unique identifier; the join key across all indices
    pub id: String,
    /// Headnote / summary text (may contain HTML markup)
    pub statement: String,
    /// Excerpt from the underlying ruling
    pub excerpt: String,
}

impl LegalDocument {
    /// Create a new document
    pub fn new(
        id: impl Into<String>,
        statement: impl Into<String>,
        excerpt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
            excerpt: excerpt.into(),
        }
    }
}

/// Text prepared for one index
///
/// One document may yield different nodes per index (the lexical index
/// combines statement and excerpt; the vector index embeds the cleaned
/// statement only), but `id` is identical across indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedNode {
    /// Document identifier, stable across indices
    pub id: String,
    /// Processed text per this index's policy
    pub text: String,
}

impl IndexedNode {
    /// Create a new node
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A query read from a query file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Query identifier
    #[serde(rename = "ID")]
    pub id: u64,
    /// Query text
    #[serde(rename = "TEXT")]
    pub text: String,
}

/// Small in-memory corpus for demos and tests
pub fn sample_corpus() -> Vec<LegalDocument> {
    vec![
        LegalDocument::new(
            "1",
            "<p>Responsabilidade fiscal na administração pública</p>",
            "A responsabilidade fiscal é fundamental para a gestão pública eficiente e transparente.",
        ),
        LegalDocument::new(
            "2",
            "<p>Auditoria de contas públicas</p>",
            "As auditorias devem seguir normas técnicas específicas para garantir a qualidade dos trabalhos.",
        ),
        LegalDocument::new(
            "3",
            "<p>Controle interno e externo</p>",
            "O sistema de controle deve ser integrado e efetivo para prevenir irregularidades.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_corpus_ids_unique() {
        let docs = sample_corpus();
        assert_eq!(docs.len(), 3);
        let mut ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_indexed_node_new() {
        let node = IndexedNode::new("doc-1", "some text");
        assert_eq!(node.id, "doc-1");
        assert_eq!(node.text, "some text");
    }
}
