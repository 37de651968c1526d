use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Main configuration for spindle
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
}

/// Configuration for indexing behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Glob patterns to exclude (in addition to .gitignore)
    pub exclude_paths: Vec<String>,
    /// Whether test files are indexed
    pub include_tests: bool,
    /// Kick off an incremental refresh when the engine opens
    pub auto_index_on_startup: bool,
    /// Upper bound on files parsed/embedded concurrently
    pub max_parallel_files: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            exclude_paths: vec![
                "**/node_modules/**".into(),
                "**/target/**".into(),
                "**/dist/**".into(),
                "**/.git/**".into(),
                "**/build/**".into(),
                "**/__pycache__/**".into(),
            ],
            include_tests: true,
            auto_index_on_startup: false,
            max_parallel_files: 4,
        }
    }
}

/// Embedding backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    /// Deterministic local feature hashing (offline default)
    Hash,
    /// OpenAI-compatible embedding API (works with Ollama, vLLM, LiteLLM, etc.)
    OpenaiApi,
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        Self::Hash
    }
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingBackend::Hash => write!(f, "hash"),
            EmbeddingBackend::OpenaiApi => write!(f, "openai-api"),
        }
    }
}

/// Configuration for an OpenAI-compatible embedding API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEmbeddingConfig {
    /// API endpoint URL (e.g. "http://localhost:11434/v1/embeddings")
    pub url: String,
    /// API key — literal value or "env:VAR_NAME" to read from environment
    pub api_key: Option<String>,
}

impl ApiEmbeddingConfig {
    /// Resolve the API key, supporting "env:VAR_NAME" syntax
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.as_ref().and_then(|key| {
            if let Some(var_name) = key.strip_prefix("env:") {
                std::env::var(var_name).ok()
            } else if key.is_empty() {
                None
            } else {
                Some(key.clone())
            }
        })
    }
}

/// Configuration for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding backend: "hash" (default) or "openai-api"
    pub backend: EmbeddingBackend,
    /// Model identifier (part of the provider identity)
    pub model: String,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Embedding dimensions (defaults to 384 when unset)
    pub dimensions: Option<usize>,
    /// Retries per batch before the batch is marked failed
    pub max_retries: u32,
    /// API settings (required when backend = "openai-api")
    pub api: Option<ApiEmbeddingConfig>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: "feature-hash".into(),
            batch_size: 32,
            dimensions: None,
            max_retries: 3,
            api: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn dimension(&self) -> usize {
        self.dimensions.unwrap_or(384)
    }

    /// Stable identity string stored in the manifest. Vectors embedded under
    /// different identities are incomparable.
    pub fn identity(&self) -> String {
        format!("{}/{}@{}", self.backend, self.model, self.dimension())
    }
}

/// Similarity metric over the vector space, fixed for the life of a manifest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityMetric {
    Cosine,
    Dot,
}

impl Default for SimilarityMetric {
    fn default() -> Self {
        Self::Cosine
    }
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Dot => "dot",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "dot" => SimilarityMetric::Dot,
            _ => SimilarityMetric::Cosine,
        }
    }
}

/// Configuration for search behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default number of results to return
    pub default_limit: usize,
    /// Drop hits scoring below this threshold
    pub min_score: f32,
    pub metric: SimilarityMetric,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            min_score: 0.0,
            metric: SimilarityMetric::Cosine,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Per-workspace configuration directory
    pub fn config_dir(workspace_root: &Path) -> PathBuf {
        workspace_root.join(".spindle")
    }

    /// Config file path for a workspace
    pub fn config_path(workspace_root: &Path) -> PathBuf {
        Self::config_dir(workspace_root).join("config.toml")
    }

    /// Directory holding the index store for a workspace.
    ///
    /// One store per workspace, addressed by a stable hash of the canonical
    /// root path, under the per-user data directory. `SPINDLE_DATA_DIR`
    /// overrides the base so tests and sandboxes stay isolated.
    pub fn store_dir(workspace_root: &Path) -> Result<PathBuf> {
        let base = match std::env::var_os("SPINDLE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let project_dirs = directories::ProjectDirs::from("dev", "spindle", "spindle")
                    .context("Failed to determine user directories")?;
                project_dirs.data_dir().to_path_buf()
            }
        };
        Ok(base.join("indexes").join(workspace_hash(workspace_root)))
    }

    /// SQLite database path for a workspace
    pub fn db_path(workspace_root: &Path) -> Result<PathBuf> {
        Ok(Self::store_dir(workspace_root)?.join("index.db"))
    }
}

/// Stable 16-hex-char hash of the canonical workspace root path
pub fn workspace_hash(workspace_root: &Path) -> String {
    let canonical = workspace_root
        .canonicalize()
        .unwrap_or_else(|_| workspace_root.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    hex::encode(&digest[..8])
}
