//! Engine facade.
//!
//! [`CodebaseIndex`] wires the store, grammar registry, embedder,
//! orchestrator, and search engine together for one workspace. It is the
//! narrow interface the tool layer calls; everything here is headless and
//! owns no terminal or editor state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{IndexError, Result};
use crate::grammar::GrammarRegistry;
use crate::orchestrator::{Orchestrator, RunSummary};
use crate::search::SearchEngine;
use crate::store::IndexStore;
use crate::types::{IndexStats, SearchHit};

/// Partial settings update; `None` fields keep their current value
#[derive(Debug, Default, Clone)]
pub struct SettingsUpdate {
    pub exclude_paths: Option<Vec<String>>,
    pub include_tests: Option<bool>,
    pub auto_index_on_startup: Option<bool>,
}

/// One workspace's indexing and search engine
pub struct CodebaseIndex {
    workspace_root: PathBuf,
    config: Mutex<Config>,
    store: Arc<IndexStore>,
    orchestrator: Arc<Orchestrator>,
    search: SearchEngine,
}

impl CodebaseIndex {
    /// Whether indexing has been enabled for this workspace
    pub fn is_enabled(workspace_root: &Path) -> bool {
        Config::config_path(workspace_root).exists()
    }

    /// Enable indexing: write the default configuration if none exists.
    pub fn enable(workspace_root: &Path) -> Result<Config> {
        let path = Config::config_path(workspace_root);
        if path.exists() {
            return Config::load(&path).map_err(|e| IndexError::Other(e.to_string()));
        }
        let config = Config::default();
        config
            .save(&path)
            .map_err(|e| IndexError::Other(e.to_string()))?;
        Ok(config)
    }

    /// Open the engine for a workspace with the persisted configuration.
    pub async fn open(workspace_root: &Path) -> Result<Self> {
        let config = Config::load(&Config::config_path(workspace_root))
            .map_err(|e| IndexError::Other(e.to_string()))?;
        let db_path = Config::db_path(workspace_root)
            .map_err(|e| IndexError::Other(e.to_string()))?;
        Self::open_with_db(workspace_root, config, &db_path).await
    }

    /// Open against an explicit database path (embedding hosts, tests).
    pub async fn open_with_db(
        workspace_root: &Path,
        config: Config,
        db_path: &Path,
    ) -> Result<Self> {
        let store = match IndexStore::open(db_path) {
            Ok(store) => store,
            Err(IndexError::IndexUnavailable(message)) => {
                // Corrupt store: rebuild from scratch instead of limping on
                tracing::warn!(message = %message, "index store unavailable, forcing full rebuild");
                if let Some(parent) = db_path.parent() {
                    let _ = std::fs::remove_dir_all(parent);
                }
                IndexStore::open(db_path)?
            }
            Err(e) => return Err(e),
        };
        let store = Arc::new(store);

        let registry = Arc::new(GrammarRegistry::new());
        let embedder = Arc::new(Embedder::from_config(&config.embedding)?);
        let orchestrator = Arc::new(Orchestrator::new(
            workspace_root.to_path_buf(),
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&embedder),
        ));
        let search = SearchEngine::new(Arc::clone(&store), Arc::clone(&embedder));

        let engine = Self {
            workspace_root: workspace_root.to_path_buf(),
            config: Mutex::new(config),
            store,
            orchestrator,
            search,
        };

        if engine.config().index.auto_index_on_startup {
            engine.refresh().await?;
        }
        Ok(engine)
    }

    pub fn config(&self) -> Config {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// Run an incremental refresh (coalesces with an in-flight run).
    pub async fn refresh(&self) -> Result<RunSummary> {
        let config = self.config();
        self.orchestrator.refresh(&config).await
    }

    /// Search the index.
    ///
    /// A provider mismatch (the index was built by a different embedding
    /// configuration) forces one full reindex, then the search retries.
    pub async fn search(
        &self,
        query: &str,
        target_dirs: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        let config = self.config();
        let limit = limit.unwrap_or(config.search.default_limit);
        let min_score = config.search.min_score;

        match self
            .search
            .search(query, target_dirs, limit, min_score)
            .await
        {
            Err(IndexError::ProviderMismatch { active, stored }) => {
                tracing::info!(active = %active, stored = %stored, "provider changed, reindexing before search");
                self.refresh().await?;
                self.search.search(query, target_dirs, limit, min_score).await
            }
            result => result,
        }
    }

    /// Interrupt any in-flight pass and remove all indexed data.
    pub async fn clear(&self) -> Result<()> {
        self.orchestrator.cancel();
        // Runs check cancellation at file granularity; wait for the boundary
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while self.orchestrator.is_running() {
            if std::time::Instant::now() > deadline {
                return Err(IndexError::Other(
                    "timed out waiting for indexing pass to stop".into(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        self.store.clear()
    }

    /// Current statistics; always reflects the last known-good state.
    pub fn stats(&self) -> Result<IndexStats> {
        self.store.stats()
    }

    /// Human-readable summary of the last run's per-file failures, if any.
    pub fn failed_summary(&self) -> Result<Option<String>> {
        self.store.failed_summary()
    }

    /// Apply and persist a settings update.
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<Config> {
        let mut config = self.config.lock().expect("config lock poisoned");
        if let Some(exclude_paths) = update.exclude_paths {
            config.index.exclude_paths = exclude_paths;
        }
        if let Some(include_tests) = update.include_tests {
            config.index.include_tests = include_tests;
        }
        if let Some(auto_index) = update.auto_index_on_startup {
            config.index.auto_index_on_startup = auto_index;
        }
        config
            .save(&Config::config_path(&self.workspace_root))
            .map_err(|e| IndexError::Other(e.to_string()))?;
        Ok(config.clone())
    }
}
