//! Error taxonomy for the retrieval pipeline
//!
//! Three failure classes with distinct handling policies:
//! - `Configuration`: reported to the caller, never retried.
//! - `Provider`: retried with bounded backoff at the call site; on
//!   exhaustion the affected retrieval method degrades for that call.
//! - `Invariant`: a caller bug (e.g. embedding dimension mismatch), fatal.

/// Errors produced by index building, retrieval, fusion, and similarity
/// detection.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Missing or inconsistent setup (no documents loaded, embedder
    /// required but absent).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An external model call (embedding or pairwise scoring) failed.
    /// Transient by assumption; subject to bounded retry.
    #[error("provider failure: {0}")]
    Provider(String),

    /// An internal contract was broken. Not recoverable.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl SearchError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Provider(_))
    }
}

/// Result alias used throughout the library.
pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SearchError::Provider("timeout".into()).is_transient());
        assert!(!SearchError::Configuration("no documents".into()).is_transient());
        assert!(!SearchError::Invariant("dimension mismatch".into()).is_transient());
    }

    #[test]
    fn test_display_includes_class() {
        let err = SearchError::Invariant("query dim 8 != index dim 4".into());
        assert!(err.to_string().contains("invariant violation"));
    }
}
