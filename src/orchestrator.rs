//! Indexing orchestrator.
//!
//! Drives the scan → diff → reindex pipeline over one workspace. The
//! manifest status doubles as the externally observable state machine:
//! `idle -> scanning -> indexing -> completed`, with `error` reachable from
//! any state on store-level failure. Only one run is active per workspace;
//! a refresh requested mid-run coalesces into at most one follow-up pass.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{IndexError, Result};
use crate::extract;
use crate::grammar::{GrammarRegistry, LanguageTag};
use crate::store::IndexStore;
use crate::types::{IndexProgress, IndexStatus, SourceFile, SymbolRecord};

/// A file selected by the scan phase
#[derive(Debug, Clone)]
struct Candidate {
    abs_path: PathBuf,
    rel_path: String,
    language: LanguageTag,
}

/// Outcome of one completed (or coalesced) refresh request
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Passes executed by this request (0 when coalesced into another run)
    pub passes: usize,
    pub indexed: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub failed: Vec<(String, String)>,
    pub cancelled: bool,
    /// True when this request merged into an already-running pass
    pub coalesced: bool,
}

enum FileOutcome {
    Indexed,
    /// Symbols stored without vectors; file re-queued on the next pass
    EmbedFailed(String),
    Failed(String, String),
}

/// Single-workspace indexing driver
pub struct Orchestrator {
    workspace_root: PathBuf,
    store: Arc<IndexStore>,
    registry: Arc<GrammarRegistry>,
    embedder: Arc<Embedder>,
    running: AtomicBool,
    refresh_pending: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl Orchestrator {
    pub fn new(
        workspace_root: PathBuf,
        store: Arc<IndexStore>,
        registry: Arc<GrammarRegistry>,
        embedder: Arc<Embedder>,
    ) -> Self {
        Self {
            workspace_root,
            store,
            registry,
            embedder,
            running: AtomicBool::new(false),
            refresh_pending: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Interrupt the in-flight run, if any, at the next file boundary.
    pub fn cancel(&self) {
        if let Ok(token) = self.cancel.lock() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run an incremental refresh.
    ///
    /// If a run is already active the request coalesces: the pending flag
    /// guarantees at most one extra pass after the current one completes,
    /// and this call returns immediately.
    pub async fn refresh(&self, config: &Config) -> Result<RunSummary> {
        if self.running.swap(true, Ordering::SeqCst) {
            self.refresh_pending.store(true, Ordering::SeqCst);
            return Ok(RunSummary {
                coalesced: true,
                ..Default::default()
            });
        }

        let token = {
            let mut guard = self
                .cancel
                .lock()
                .map_err(|_| IndexError::Other("cancellation token poisoned".into()))?;
            *guard = CancellationToken::new();
            guard.clone()
        };

        let result = self.run_to_completion(config, &token).await;
        self.running.store(false, Ordering::SeqCst);

        if let Err(e) = &result {
            tracing::error!(error = %e, "indexing pass aborted");
            let _ = self.store.set_status(IndexStatus::Error);
            let _ = self.store.set_failed(0, &e.to_string());
        }
        result
    }

    async fn run_to_completion(
        &self,
        config: &Config,
        token: &CancellationToken,
    ) -> Result<RunSummary> {
        let mut summary = self.run_once(config, token).await?;
        while self.refresh_pending.swap(false, Ordering::SeqCst) {
            if token.is_cancelled() {
                break;
            }
            let next = self.run_once(config, token).await?;
            summary.indexed += next.indexed;
            summary.unchanged = next.unchanged;
            summary.deleted += next.deleted;
            summary.failed = next.failed;
            summary.cancelled = next.cancelled;
            summary.passes += next.passes;
        }
        Ok(summary)
    }

    async fn run_once(&self, config: &Config, token: &CancellationToken) -> Result<RunSummary> {
        let mut summary = RunSummary {
            passes: 1,
            ..Default::default()
        };

        // A provider change invalidates every stored vector
        let active_identity = self.embedder.identity().to_string();
        if let Some(stored) = self.store.provider()? {
            if stored != active_identity {
                tracing::info!(
                    stored = %stored,
                    active = %active_identity,
                    "embedding provider changed, rebuilding index"
                );
                self.store.clear()?;
            }
        }

        self.store.set_status(IndexStatus::Scanning)?;
        self.store.set_provider(&active_identity)?;
        self.store.set_metric(config.search.metric)?;
        self.store
            .set_scan_settings(&config.index.exclude_paths, config.index.include_tests)?;

        let candidates = collect_candidates(&self.workspace_root, config)?;

        // Load every required grammar once, up front
        self.registry
            .load_for_files(candidates.iter().map(|c| c.abs_path.as_path()))?;

        // Diff against the stored file set
        let stored_files = self.store.all_files()?;
        let current_paths: std::collections::HashSet<&str> =
            candidates.iter().map(|c| c.rel_path.as_str()).collect();

        for stale in &stored_files {
            if !current_paths.contains(stale.path.as_str()) {
                self.store.delete_file(&stale.path)?;
                summary.deleted += 1;
            }
        }

        let stored_by_path: std::collections::HashMap<&str, &SourceFile> =
            stored_files.iter().map(|f| (f.path.as_str(), f)).collect();

        let mut to_index: Vec<(Candidate, String, i64)> = Vec::new();
        for candidate in candidates {
            let Ok(content) = std::fs::read_to_string(&candidate.abs_path) else {
                summary
                    .failed
                    .push((candidate.rel_path.clone(), "unreadable file".into()));
                continue;
            };
            let hash = content_hash(&content);
            let mtime = file_mtime(&candidate.abs_path);
            match stored_by_path.get(candidate.rel_path.as_str()) {
                Some(stored) if stored.hash == hash => summary.unchanged += 1,
                _ => to_index.push((candidate, hash, mtime)),
            }
        }

        let total = to_index.len() as u64;
        self.store.set_status(IndexStatus::Indexing)?;
        self.store.set_progress(IndexProgress {
            completed: 0,
            total,
        })?;

        let progress = tokio::sync::Mutex::new(0u64);
        let outcomes: Vec<Option<FileOutcome>> = futures::stream::iter(to_index)
            .map(|(candidate, hash, mtime)| {
                let progress = &progress;
                async move {
                    if token.is_cancelled() {
                        return None;
                    }
                    let outcome = self.process_file(candidate, hash, mtime, config).await;
                    let mut done = progress.lock().await;
                    *done += 1;
                    let _ = self.store.set_progress(IndexProgress {
                        completed: *done,
                        total,
                    });
                    Some(outcome)
                }
            })
            .buffer_unordered(config.index.max_parallel_files.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                None => summary.cancelled = true,
                Some(FileOutcome::Indexed) => summary.indexed += 1,
                Some(FileOutcome::EmbedFailed(path)) => {
                    summary
                        .failed
                        .push((path, "embedding batch failed".into()));
                }
                Some(FileOutcome::Failed(path, message)) => {
                    summary.failed.push((path, message));
                }
            }
        }

        let failed_summary: String = summary
            .failed
            .iter()
            .take(3)
            .map(|(path, message)| format!("{path}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.store
            .set_failed(summary.failed.len() as u64, &failed_summary)?;

        if summary.cancelled {
            tracing::info!("indexing pass cancelled");
            self.store.set_status(IndexStatus::Idle)?;
        } else {
            self.store.set_status(IndexStatus::Completed)?;
        }
        Ok(summary)
    }

    /// Extract, embed, and store one file. Per-file failures are reported,
    /// never propagated; only store-level errors abort the run upstream.
    async fn process_file(
        &self,
        candidate: Candidate,
        hash: String,
        mtime: i64,
        config: &Config,
    ) -> FileOutcome {
        let rel_path = candidate.rel_path.clone();

        let grammar = match self.registry.get(candidate.language) {
            Ok(grammar) => grammar,
            Err(e) => return FileOutcome::Failed(rel_path, e.to_string()),
        };

        let content = match std::fs::read_to_string(&candidate.abs_path) {
            Ok(content) => content,
            Err(e) => return FileOutcome::Failed(rel_path, e.to_string()),
        };

        // Parsing is CPU-bound; keep it off the async workers
        let symbols = {
            let rel_path = rel_path.clone();
            let task = tokio::task::spawn_blocking(move || {
                extract::extract(&rel_path, &content, &grammar)
            });
            match task.await {
                Ok(Ok(symbols)) => symbols,
                Ok(Err(e)) => {
                    if e.is_per_file() {
                        tracing::warn!(path = %candidate.rel_path, error = %e, "skipping file");
                    } else {
                        tracing::error!(path = %candidate.rel_path, error = %e, "extraction failed");
                    }
                    return FileOutcome::Failed(candidate.rel_path, e.to_string());
                }
                Err(e) => return FileOutcome::Failed(candidate.rel_path, e.to_string()),
            }
        };

        let (embeddings, embed_failed) = self
            .embed_symbols(&symbols, config.embedding.batch_size)
            .await;

        let file = SourceFile {
            path: rel_path.clone(),
            language: Some(candidate.language.to_string()),
            // An empty hash re-queues the file on the next incremental pass
            hash: if embed_failed { String::new() } else { hash },
            mtime,
            indexed_at: chrono::Utc::now().timestamp(),
        };

        if let Err(e) = self.store.replace_symbols(&file, &symbols, &embeddings) {
            return FileOutcome::Failed(rel_path, e.to_string());
        }

        if embed_failed {
            FileOutcome::EmbedFailed(rel_path)
        } else {
            FileOutcome::Indexed
        }
    }

    /// Embed symbol snippets in bounded batches. A batch that fails after
    /// retries leaves its symbols unembedded rather than failing the file.
    async fn embed_symbols(
        &self,
        symbols: &[SymbolRecord],
        batch_size: usize,
    ) -> (Vec<Option<Vec<f32>>>, bool) {
        let mut embeddings: Vec<Option<Vec<f32>>> = Vec::with_capacity(symbols.len());
        let mut any_failed = false;

        for batch in symbols.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|s| s.snippet.clone()).collect();
            match self.embedder.embed_batch(&texts).await {
                Ok(vectors) => embeddings.extend(vectors.into_iter().map(Some)),
                Err(e) => {
                    tracing::warn!(error = %e, "embedding batch failed, storing symbols unembedded");
                    embeddings.extend(std::iter::repeat_with(|| None).take(batch.len()));
                    any_failed = true;
                }
            }
        }
        (embeddings, any_failed)
    }
}

/// Walk the workspace and select indexable files.
///
/// Respects .gitignore, the configured exclude patterns, and the
/// include-tests flag; only files with a registered grammar are candidates.
fn collect_candidates(workspace_root: &Path, config: &Config) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    let mut builder = WalkBuilder::new(workspace_root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true);

    for entry in builder.build() {
        let Ok(entry) = entry else { continue };
        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(true) {
            continue;
        }

        let abs_path = entry.path().to_path_buf();
        let rel_path = abs_path
            .strip_prefix(workspace_root)
            .unwrap_or(&abs_path)
            .to_string_lossy()
            .replace('\\', "/");

        if rel_path.starts_with(".spindle/") {
            continue;
        }
        if is_excluded(&rel_path, &config.index.exclude_paths) {
            continue;
        }
        if !config.index.include_tests && is_test_path(&rel_path) {
            continue;
        }

        let Some(language) = abs_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(LanguageTag::from_extension)
        else {
            continue;
        };

        candidates.push(Candidate {
            abs_path,
            rel_path,
            language,
        });
    }

    candidates.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(candidates)
}

/// Match a workspace-relative path against exclude patterns. Patterns with
/// glob metacharacters match as globs; bare names match as path prefixes
/// (`vendor` excludes everything under `vendor/`).
fn is_excluded(rel_path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        if pattern.contains(['*', '?', '[']) {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(rel_path))
                .unwrap_or(false)
        } else {
            let prefix = pattern.trim_end_matches('/');
            rel_path == prefix || rel_path.starts_with(&format!("{prefix}/"))
        }
    })
}

/// Conventional test-file locations and naming patterns
fn is_test_path(rel_path: &str) -> bool {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(
            r"(?x)
            (^|/)(tests?|__tests__|spec)(/|$)
            | (_test|\.test|_spec|\.spec)\.[A-Za-z0-9]+$
            | (^|/)test_[^/]+$
            ",
        )
        .expect("test path pattern is valid")
    });
    re.is_match(rel_path)
}

fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

fn file_mtime(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::tempdir;

    fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn orchestrator_for(root: &Path, config: &Config) -> (Orchestrator, Arc<IndexStore>) {
        let store = Arc::new(IndexStore::open(&root.join(".store").join("index.db")).unwrap());
        let registry = Arc::new(GrammarRegistry::new());
        let embedder = Arc::new(Embedder::from_config(&config.embedding).unwrap());
        let orchestrator = Orchestrator::new(
            root.to_path_buf(),
            Arc::clone(&store),
            registry,
            embedder,
        );
        (orchestrator, store)
    }

    fn sample_workspace(root: &Path) {
        write_file(
            root,
            "src/auth.ts",
            "export function login(user: string): boolean {\n    return user.length > 0;\n}\n",
        );
        write_file(
            root,
            "src/math.rs",
            "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n",
        );
    }

    #[tokio::test]
    async fn test_refresh_indexes_workspace() {
        let dir = tempdir().unwrap();
        sample_workspace(dir.path());
        let config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);

        let summary = orchestrator.refresh(&config).await.unwrap();
        assert_eq!(summary.indexed, 2);
        assert!(summary.failed.is_empty());
        assert!(!summary.coalesced);

        let stats = store.stats().unwrap();
        assert_eq!(stats.files_count, 2);
        assert!(stats.symbols_count >= 2);
        assert_eq!(stats.status, IndexStatus::Completed);
        assert!(stats.last_indexed.is_some());
        assert_eq!(stats.progress.completed, stats.progress.total);
    }

    #[tokio::test]
    async fn test_unchanged_files_not_rewritten() {
        let dir = tempdir().unwrap();
        sample_workspace(dir.path());
        let config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);

        orchestrator.refresh(&config).await.unwrap();
        let before = store.get_file("src/math.rs").unwrap().unwrap();

        // Nothing changed on disk: no writes, timestamps untouched
        let summary = orchestrator.refresh(&config).await.unwrap();
        assert_eq!(summary.indexed, 0);
        assert_eq!(summary.unchanged, 2);

        let after = store.get_file("src/math.rs").unwrap().unwrap();
        assert_eq!(before.indexed_at, after.indexed_at);
        assert_eq!(before.hash, after.hash);
    }

    #[tokio::test]
    async fn test_changed_file_reindexed_and_deleted_file_purged() {
        let dir = tempdir().unwrap();
        sample_workspace(dir.path());
        let config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);

        orchestrator.refresh(&config).await.unwrap();
        let symbols_before = store.stats().unwrap().symbols_count;

        write_file(
            dir.path(),
            "src/math.rs",
            "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\npub fn sub(a: i32, b: i32) -> i32 {\n    a - b\n}\n",
        );
        std::fs::remove_file(dir.path().join("src/auth.ts")).unwrap();

        let summary = orchestrator.refresh(&config).await.unwrap();
        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.deleted, 1);

        let stats = store.stats().unwrap();
        assert_eq!(stats.files_count, 1);
        assert!(store.get_file("src/auth.ts").unwrap().is_none());
        let symbols_after = stats.symbols_count;
        assert_ne!(symbols_before, symbols_after);
        assert!(store
            .symbols_for_file("src/math.rs")
            .unwrap()
            .iter()
            .any(|s| s.name == "sub"));
    }

    #[tokio::test]
    async fn test_exclude_patterns_respected() {
        let dir = tempdir().unwrap();
        sample_workspace(dir.path());
        write_file(
            dir.path(),
            "vendor/lib.ts",
            "export function vendored(): void {}\n",
        );

        let mut config = Config::default();
        config.index.exclude_paths.push("vendor".into());
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);

        orchestrator.refresh(&config).await.unwrap();
        assert!(store.get_file("vendor/lib.ts").unwrap().is_none());
        assert_eq!(store.stats().unwrap().files_count, 2);
    }

    #[tokio::test]
    async fn test_exclude_added_after_first_pass_purges_symbols() {
        let dir = tempdir().unwrap();
        sample_workspace(dir.path());
        write_file(
            dir.path(),
            "vendor/lib.ts",
            "export function vendored(): void {}\n",
        );

        let mut config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);
        orchestrator.refresh(&config).await.unwrap();
        assert_eq!(store.stats().unwrap().files_count, 3);
        let symbols_with_vendor = store.stats().unwrap().symbols_count;

        config.index.exclude_paths.push("vendor".into());
        orchestrator.refresh(&config).await.unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.files_count, 2);
        assert!(stats.symbols_count < symbols_with_vendor);
        assert!(store.symbols_for_file("vendor/lib.ts").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_include_tests_flag() {
        let dir = tempdir().unwrap();
        sample_workspace(dir.path());
        write_file(
            dir.path(),
            "tests/auth_test.ts",
            "export function checkLogin(): void {}\n",
        );

        let mut config = Config::default();
        config.index.include_tests = false;
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);
        orchestrator.refresh(&config).await.unwrap();
        assert!(store.get_file("tests/auth_test.ts").unwrap().is_none());

        config.index.include_tests = true;
        orchestrator.refresh(&config).await.unwrap();
        assert!(store.get_file("tests/auth_test.ts").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_provider_change_forces_full_rebuild() {
        let dir = tempdir().unwrap();
        sample_workspace(dir.path());
        let config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);
        orchestrator.refresh(&config).await.unwrap();
        assert_eq!(
            store.provider().unwrap().as_deref(),
            Some("hash/feature-hash@384")
        );

        // New provider configuration: stored vectors are incomparable
        let mut changed = Config::default();
        changed.embedding.dimensions = Some(512);
        let (orchestrator, store) = {
            let registry = Arc::new(GrammarRegistry::new());
            let embedder = Arc::new(Embedder::from_config(&changed.embedding).unwrap());
            let orchestrator = Orchestrator::new(
                dir.path().to_path_buf(),
                Arc::clone(&store),
                registry,
                embedder,
            );
            (orchestrator, store)
        };
        let summary = orchestrator.refresh(&changed).await.unwrap();

        // Everything was reindexed, not diffed away
        assert_eq!(summary.indexed, 2);
        assert_eq!(
            store.provider().unwrap().as_deref(),
            Some("hash/feature-hash@512")
        );
        assert_eq!(store.stats().unwrap().status, IndexStatus::Completed);
    }

    #[tokio::test]
    async fn test_empty_workspace_completes_with_zero_stats() {
        let dir = tempdir().unwrap();
        let config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);

        let summary = orchestrator.refresh(&config).await.unwrap();
        assert_eq!(summary.indexed, 0);

        let stats = store.stats().unwrap();
        assert_eq!(stats.files_count, 0);
        assert_eq!(stats.symbols_count, 0);
        assert!(stats.last_indexed.is_none());
        assert_eq!(stats.status, IndexStatus::Completed);
    }

    #[tokio::test]
    async fn test_unparseable_file_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        sample_workspace(dir.path());
        // Invalid UTF-8 is unreadable as text and must not abort the run
        std::fs::write(dir.path().join("src/binary.rs"), [0xFFu8, 0xFE, 0x00, 0x01]).unwrap();

        let config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);
        let summary = orchestrator.refresh(&config).await.unwrap();

        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "src/binary.rs");

        let stats = store.stats().unwrap();
        assert_eq!(stats.status, IndexStatus::Completed);
        assert_eq!(stats.failed_files, 1);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_coalesce() {
        let dir = tempdir().unwrap();
        for i in 0..20 {
            write_file(
                dir.path(),
                &format!("src/mod{i}.rs"),
                &format!("pub fn handler_{i}() -> u32 {{\n    {i}\n}}\n"),
            );
        }
        let config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);
        let orchestrator = Arc::new(orchestrator);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let orchestrator = Arc::clone(&orchestrator);
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.refresh(&config).await.unwrap()
            }));
        }

        let summaries: Vec<RunSummary> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        // At most one request actually ran; the rest coalesced into it
        let active: Vec<_> = summaries.iter().filter(|s| !s.coalesced).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(store.stats().unwrap().status, IndexStatus::Completed);
        assert_eq!(store.stats().unwrap().files_count, 20);
    }

    #[tokio::test]
    async fn test_cancellation_leaves_store_valid() {
        let dir = tempdir().unwrap();
        for i in 0..80 {
            write_file(
                dir.path(),
                &format!("src/mod{i}.rs"),
                &format!("pub fn handler_{i}() -> u32 {{\n    {i}\n}}\n"),
            );
        }
        let config = Config::default();
        let (orchestrator, store) = orchestrator_for(dir.path(), &config);
        let orchestrator = Arc::new(orchestrator);

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            let config = config.clone();
            tokio::spawn(async move { orchestrator.refresh(&config).await.unwrap() })
        };
        // Interrupt as soon as the pass is observably underway
        tokio::task::yield_now().await;
        orchestrator.cancel();
        let _summary = run.await.unwrap();

        // Whether or not any files were processed before the cancel landed,
        // the run has ended and every stored file has its complete symbol set.
        assert!(!orchestrator.is_running());
        let status = store.stats().unwrap().status;
        assert!(status == IndexStatus::Idle || status == IndexStatus::Completed);
        for file in store.all_files().unwrap() {
            assert!(!store.symbols_for_file(&file.path).unwrap().is_empty());
        }
    }

    #[test]
    fn test_is_excluded() {
        let patterns = vec!["vendor".to_string(), "**/generated/**".to_string()];
        assert!(is_excluded("vendor/lib.ts", &patterns));
        assert!(is_excluded("vendor", &patterns));
        assert!(is_excluded("src/generated/api.ts", &patterns));
        assert!(!is_excluded("src/vendor_shim.ts", &patterns));
        assert!(!is_excluded("src/main.ts", &patterns));
    }

    #[test]
    fn test_is_test_path() {
        assert!(is_test_path("tests/common/mod.rs"));
        assert!(is_test_path("src/__tests__/app.ts"));
        assert!(is_test_path("src/auth_test.go"));
        assert!(is_test_path("src/auth.test.ts"));
        assert!(is_test_path("pkg/test_helpers.py"));
        assert!(!is_test_path("src/contest.rs"));
        assert!(!is_test_path("src/latest.ts"));
    }

    #[test]
    fn test_content_hash_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("abc").len(), 64);
    }
}
