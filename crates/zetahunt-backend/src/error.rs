//! Backend error taxonomy

/// Errors surfaced by numeric backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Evaluation failed or timed out; the same request may succeed on
    /// retry. The owning region is not marked scanned.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// The backend cannot honor the request at all (e.g. digit count
    /// beyond its capability). Not retryable.
    #[error("backend does not support request: {0}")]
    Unsupported(String),
}

impl BackendError {
    /// Whether a retry with backoff is worthwhile.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
