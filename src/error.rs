//! Bragi error types

/// Bragi error types
#[derive(Debug, thiserror::Error)]
pub enum BragiError {
    // Configuration errors — fatal, surfaced from the builder
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Content fetch failure from the external source (network, parse, ...).
    /// Resolution treats this as "no data for this language" and moves on to
    /// the next candidate in the fallback chain.
    #[error("fetch failed for {namespace}/{language}: {message}")]
    Fetch {
        namespace: String,
        language: String,
        message: String,
    },

    // Persistence errors — recovered locally, cache continues memory-only
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BragiError {
    /// Convenience constructor for [`BragiError::Fetch`].
    pub fn fetch(
        namespace: impl Into<String>,
        language: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        BragiError::Fetch {
            namespace: namespace.into(),
            language: language.into(),
            message: message.into(),
        }
    }

    /// Whether this error may propagate out of the crate.
    ///
    /// Only configuration errors are programming errors; everything else is
    /// a runtime data-availability condition that degrades gracefully.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BragiError::Configuration(_))
    }
}

/// Result type alias for Bragi operations
pub type Result<T> = std::result::Result<T, BragiError>;
