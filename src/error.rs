//! Error types for the indexing engine.

/// Errors that can occur during indexing and search operations.
///
/// Per-file failures (`UnsupportedLanguage`, `Parse`) are skipped by the
/// orchestrator and never abort a run; `IndexUnavailable` is fatal to the
/// current pass and forces a full rebuild on the next attempt.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// No grammar is registered for the file's extension.
    #[error("unsupported language for extension '{extension}'")]
    UnsupportedLanguage { extension: String },

    /// Tree-sitter failed to produce a syntax tree for the file.
    #[error("parse failed for {path}: {message}")]
    Parse { path: String, message: String },

    /// The embedding provider rejected a batch after retries.
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// The on-disk store is corrupt or unreachable.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// The manifest was written by a different embedding provider; stored
    /// vectors are incomparable until a full reindex completes.
    #[error("embedding provider mismatch: active '{active}', index built with '{stored}'")]
    ProviderMismatch { active: String, stored: String },

    /// A malformed structural query in the catalog.
    #[error("invalid query for {language}: {message}")]
    Query { language: String, message: String },

    /// IO error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite database error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// HTTP transport error talking to the embedding provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

impl IndexError {
    /// True for errors that skip a single file without aborting the run.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            IndexError::UnsupportedLanguage { .. } | IndexError::Parse { .. }
        )
    }
}

/// Result type alias using [`IndexError`].
pub type Result<T> = std::result::Result<T, IndexError>;
