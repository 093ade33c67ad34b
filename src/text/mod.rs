//! Text preprocessing for legal documents
//!
//! Provides the `Tokenizer` seam used by the lexical index plus the
//! Portuguese-aware default implementation: HTML removal, lowercasing,
//! diacritic folding, punctuation stripping, and stopword removal.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new("<[^>]*>").unwrap());

/// Common Portuguese stopwords; enough for headnote-scale text.
const STOPWORDS_PT: &[&str] = &[
    "a", "o", "as", "os", "um", "uma", "uns", "umas", "de", "do", "da", "dos", "das", "em", "no",
    "na", "nos", "nas", "por", "para", "com", "sem", "sob", "sobre", "entre", "ao", "aos", "à",
    "às", "e", "ou", "mas", "que", "se", "não", "sim", "é", "são", "ser", "foi", "era", "está",
    "estão", "como", "mais", "menos", "muito", "já", "também", "só", "pelo", "pela", "pelos",
    "pelas", "este", "esta", "esse", "essa", "isso", "isto", "aquele", "aquela", "seu", "sua",
    "seus", "suas", "quando", "onde", "qual", "quais", "há", "ter", "tem", "têm", "nem", "até",
];

/// Deterministic, pure text-to-token mapping injected into the lexical index
pub trait Tokenizer: Send + Sync {
    /// Split text into normalized tokens
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Remove HTML tags from text
pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}

/// Fold Portuguese diacritics to their ASCII base characters
pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            _ => c,
        })
        .collect()
}

/// Minimal whitespace tokenizer (lowercase + split)
///
/// Matches the behavior expected by callers that inject no preprocessing.
#[derive(Debug, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Portuguese tokenizer for jurisprudence text
///
/// Strips HTML, lowercases, folds diacritics, treats punctuation as
/// separators, splits on unicode word boundaries, and drops stopwords.
pub struct PortugueseTokenizer {
    stopwords: HashSet<String>,
}

impl PortugueseTokenizer {
    /// Create a tokenizer with the built-in stopword list
    pub fn new() -> Self {
        // Stopwords are matched after diacritic folding.
        let stopwords = STOPWORDS_PT
            .iter()
            .map(|w| fold_diacritics(w))
            .collect();
        Self { stopwords }
    }

    /// Create a tokenizer with a custom stopword list
    pub fn with_stopwords(stopwords: impl IntoIterator<Item = String>) -> Self {
        let stopwords = stopwords.into_iter().map(|w| fold_diacritics(&w)).collect();
        Self { stopwords }
    }
}

impl Default for PortugueseTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for PortugueseTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned = fold_diacritics(&strip_html(text).to_lowercase());
        cleaned
            .unicode_words()
            .filter(|w| !self.stopwords.contains(*w))
            .map(str::to_string)
            .collect()
    }

    fn name(&self) -> &str {
        "portuguese"
    }
}
