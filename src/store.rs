//! Persistent per-workspace index store.
//!
//! SQLite holds everything: file metadata, symbol records, their embedding
//! vectors (little-endian f32 BLOBs), and the manifest key-value state. The
//! orchestrator is the only writer; searches are read-only. Per-file symbol
//! replacement runs in a single transaction so a concurrent reader observes
//! the full old set or the full new set, never a mix.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::config::SimilarityMetric;
use crate::error::{IndexError, Result};
use crate::types::{
    IndexProgress, IndexStats, IndexStatus, LanguageStats, SourceFile, SymbolKind, SymbolRecord,
};

/// Manifest keys
const META_PROVIDER: &str = "provider";
const META_METRIC: &str = "metric";
const META_STATUS: &str = "status";
const META_PROGRESS_COMPLETED: &str = "progress_completed";
const META_PROGRESS_TOTAL: &str = "progress_total";
const META_FAILED_FILES: &str = "failed_files";
const META_FAILED_SUMMARY: &str = "failed_summary";
const META_EXCLUDE_PATHS: &str = "exclude_paths";
const META_INCLUDE_TESTS: &str = "include_tests";

/// Symbol, embedding, and manifest storage for one workspace
pub struct IndexStore {
    conn: Mutex<Connection>,
}

impl IndexStore {
    /// Open or create the store. Corruption or an unreadable database is
    /// reported as `IndexUnavailable`; the caller reacts with a forced full
    /// rebuild rather than silent partial operation.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| IndexError::IndexUnavailable(format!("{}: {e}", path.display())))?;

        conn.execute("PRAGMA foreign_keys = ON", [])
            .and_then(|_| {
                // These pragmas report back their new value
                conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
                conn.query_row("PRAGMA busy_timeout = 5000", [], |_| Ok(()))
            })
            .map_err(|e| IndexError::IndexUnavailable(e.to_string()))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store
            .init_schema()
            .map_err(|e| IndexError::IndexUnavailable(e.to_string()))?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            -- Indexed files
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY,
                path TEXT UNIQUE NOT NULL,
                language TEXT,
                hash TEXT NOT NULL,
                mtime INTEGER NOT NULL,
                indexed_at INTEGER NOT NULL
            );

            -- Extracted symbols with their embedding vectors
            CREATE TABLE IF NOT EXISTS symbols (
                id TEXT NOT NULL,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                start_byte INTEGER NOT NULL,
                end_byte INTEGER NOT NULL,
                scope TEXT,
                snippet TEXT NOT NULL,
                embedding BLOB
            );

            -- Per-workspace manifest
            CREATE TABLE IF NOT EXISTS manifest (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);
            CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
        "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IndexError::IndexUnavailable("store lock poisoned".into()))
    }

    /// Insert or update a file's metadata
    pub fn upsert_file(&self, file: &SourceFile) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"INSERT INTO files (path, language, hash, mtime, indexed_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(path) DO UPDATE SET
                   language = excluded.language,
                   hash = excluded.hash,
                   mtime = excluded.mtime,
                   indexed_at = excluded.indexed_at"#,
            (
                &file.path,
                &file.language,
                &file.hash,
                file.mtime,
                file.indexed_at,
            ),
        )?;
        Ok(())
    }

    /// Get file metadata by workspace-relative path
    #[allow(dead_code)]
    pub fn get_file(&self, path: &str) -> Result<Option<SourceFile>> {
        let conn = self.lock()?;
        let result = conn
            .prepare("SELECT path, language, hash, mtime, indexed_at FROM files WHERE path = ?1")?
            .query_row([path], |row| {
                Ok(SourceFile {
                    path: row.get(0)?,
                    language: row.get(1)?,
                    hash: row.get(2)?,
                    mtime: row.get(3)?,
                    indexed_at: row.get(4)?,
                })
            })
            .optional()?;
        Ok(result)
    }

    /// All indexed files, ordered by path
    pub fn all_files(&self) -> Result<Vec<SourceFile>> {
        let conn = self.lock()?;
        let files = conn
            .prepare("SELECT path, language, hash, mtime, indexed_at FROM files ORDER BY path")?
            .query_map([], |row| {
                Ok(SourceFile {
                    path: row.get(0)?,
                    language: row.get(1)?,
                    hash: row.get(2)?,
                    mtime: row.get(3)?,
                    indexed_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Delete a file; its symbols and vectors cascade
    pub fn delete_file(&self, path: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM files WHERE path = ?1", [path])?;
        Ok(())
    }

    /// Atomically replace a file's metadata and full symbol set.
    ///
    /// `embeddings` pairs with `symbols` by index; `None` entries store the
    /// symbol without a vector (excluded from search until re-embedded).
    pub fn replace_symbols(
        &self,
        file: &SourceFile,
        symbols: &[SymbolRecord],
        embeddings: &[Option<Vec<f32>>],
    ) -> Result<()> {
        if symbols.len() != embeddings.len() {
            return Err(IndexError::Other(format!(
                "symbols and embeddings must have same length: {} vs {}",
                symbols.len(),
                embeddings.len()
            )));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT INTO files (path, language, hash, mtime, indexed_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(path) DO UPDATE SET
                   language = excluded.language,
                   hash = excluded.hash,
                   mtime = excluded.mtime,
                   indexed_at = excluded.indexed_at"#,
            (
                &file.path,
                &file.language,
                &file.hash,
                file.mtime,
                file.indexed_at,
            ),
        )?;

        let file_id: i64 = tx.query_row("SELECT id FROM files WHERE path = ?1", [&file.path], |row| {
            row.get(0)
        })?;

        tx.execute("DELETE FROM symbols WHERE file_id = ?1", [file_id])?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO symbols
                   (id, file_id, kind, name, start_line, end_line, start_byte, end_byte, scope, snippet, embedding)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            )?;
            for (symbol, embedding) in symbols.iter().zip(embeddings) {
                stmt.execute((
                    &symbol.id,
                    file_id,
                    symbol.kind.as_tag(),
                    &symbol.name,
                    symbol.start_line,
                    symbol.end_line,
                    symbol.start_byte,
                    symbol.end_byte,
                    &symbol.scope,
                    &symbol.snippet,
                    embedding.as_ref().map(|v| vector_to_blob(v)),
                ))?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Symbols for one file in source order
    #[allow(dead_code)]
    pub fn symbols_for_file(&self, path: &str) -> Result<Vec<SymbolRecord>> {
        let conn = self.lock()?;
        let symbols = conn
            .prepare(
                r#"SELECT s.id, f.path, s.kind, s.name, s.start_line, s.end_line,
                          s.start_byte, s.end_byte, s.scope, s.snippet
                   FROM symbols s
                   JOIN files f ON s.file_id = f.id
                   WHERE f.path = ?1
                   ORDER BY s.start_byte"#,
            )?
            .query_map([path], symbol_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(symbols)
    }

    /// Rank stored vectors by distance to the query vector.
    ///
    /// Unembedded symbols are excluded. `path_prefixes`, when given, limits
    /// results to files under any of the prefixes. Ties order by (file path
    /// ascending, start offset ascending) for determinism.
    pub fn nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
        metric: SimilarityMetric,
        path_prefixes: Option<&[String]>,
    ) -> Result<Vec<(SymbolRecord, f32)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT s.id, f.path, s.kind, s.name, s.start_line, s.end_line,
                      s.start_byte, s.end_byte, s.scope, s.snippet, s.embedding
               FROM symbols s
               JOIN files f ON s.file_id = f.id
               WHERE s.embedding IS NOT NULL"#,
        )?;

        let rows = stmt.query_map([], |row| {
            let symbol = symbol_from_row(row)?;
            let blob: Vec<u8> = row.get(10)?;
            Ok((symbol, blob))
        })?;

        let mut scored: Vec<(SymbolRecord, f32)> = Vec::new();
        for row in rows {
            let (symbol, blob) = row?;
            if let Some(prefixes) = path_prefixes {
                if !prefixes.iter().any(|p| path_under(&symbol.file_path, p)) {
                    continue;
                }
            }
            let vector = blob_to_vector(&blob);
            if vector.len() != query.len() {
                continue;
            }
            let distance = match metric {
                SimilarityMetric::Cosine => cosine_distance(query, &vector),
                SimilarityMetric::Dot => -dot(query, &vector),
            };
            scored.push((symbol, distance));
        }

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.file_path.cmp(&b.0.file_path))
                .then_with(|| a.0.start_byte.cmp(&b.0.start_byte))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Index statistics, combining counts with manifest state
    pub fn stats(&self) -> Result<IndexStats> {
        let (files_count, symbols_count, last_indexed, languages) = {
            let conn = self.lock()?;
            let files_count: u64 =
                conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
            let symbols_count: u64 =
                conn.query_row("SELECT COUNT(*) FROM symbols", [], |row| row.get(0))?;
            let last_indexed: Option<i64> =
                conn.query_row("SELECT MAX(indexed_at) FROM files", [], |row| row.get(0))?;

            let languages = conn
                .prepare(
                    r#"SELECT f.language, COUNT(DISTINCT f.id), COUNT(s.rowid)
                       FROM files f
                       LEFT JOIN symbols s ON f.id = s.file_id
                       WHERE f.language IS NOT NULL
                       GROUP BY f.language
                       ORDER BY f.language"#,
                )?
                .query_map([], |row| {
                    Ok(LanguageStats {
                        language: row.get(0)?,
                        file_count: row.get(1)?,
                        symbol_count: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            (files_count, symbols_count, last_indexed, languages)
        };

        Ok(IndexStats {
            files_count,
            symbols_count,
            last_indexed,
            status: self.status()?,
            progress: self.progress()?,
            failed_files: self
                .get_meta(META_FAILED_FILES)?
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            languages,
        })
    }

    /// Remove all indexed data and reset the manifest
    pub fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM files", [])?;
        conn.execute("DELETE FROM manifest", [])?;
        Ok(())
    }

    // ---- manifest accessors ----

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .prepare("SELECT value FROM manifest WHERE key = ?1")?
            .query_row([key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO manifest (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    pub fn provider(&self) -> Result<Option<String>> {
        self.get_meta(META_PROVIDER)
    }

    pub fn set_provider(&self, identity: &str) -> Result<()> {
        self.set_meta(META_PROVIDER, identity)
    }

    pub fn metric(&self) -> Result<SimilarityMetric> {
        Ok(self
            .get_meta(META_METRIC)?
            .map(|v| SimilarityMetric::parse(&v))
            .unwrap_or_default())
    }

    pub fn set_metric(&self, metric: SimilarityMetric) -> Result<()> {
        self.set_meta(META_METRIC, metric.as_str())
    }

    pub fn status(&self) -> Result<IndexStatus> {
        Ok(self
            .get_meta(META_STATUS)?
            .map(|v| IndexStatus::parse(&v))
            .unwrap_or(IndexStatus::Idle))
    }

    pub fn set_status(&self, status: IndexStatus) -> Result<()> {
        self.set_meta(META_STATUS, status.as_str())
    }

    pub fn progress(&self) -> Result<IndexProgress> {
        let completed = self
            .get_meta(META_PROGRESS_COMPLETED)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let total = self
            .get_meta(META_PROGRESS_TOTAL)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        Ok(IndexProgress { completed, total })
    }

    pub fn set_progress(&self, progress: IndexProgress) -> Result<()> {
        self.set_meta(META_PROGRESS_COMPLETED, &progress.completed.to_string())?;
        self.set_meta(META_PROGRESS_TOTAL, &progress.total.to_string())
    }

    pub fn set_failed(&self, count: u64, summary: &str) -> Result<()> {
        self.set_meta(META_FAILED_FILES, &count.to_string())?;
        self.set_meta(META_FAILED_SUMMARY, summary)
    }

    pub fn failed_summary(&self) -> Result<Option<String>> {
        self.get_meta(META_FAILED_SUMMARY)
    }

    pub fn set_scan_settings(&self, exclude_paths: &[String], include_tests: bool) -> Result<()> {
        self.set_meta(META_EXCLUDE_PATHS, &serde_json::to_string(exclude_paths)?)?;
        self.set_meta(META_INCLUDE_TESTS, if include_tests { "true" } else { "false" })
    }
}

fn symbol_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SymbolRecord> {
    let kind_tag: String = row.get(2)?;
    let kind = SymbolKind::from_tag(&kind_tag).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown symbol kind '{kind_tag}'").into(),
        )
    })?;
    Ok(SymbolRecord {
        id: row.get(0)?,
        file_path: row.get(1)?,
        kind,
        name: row.get(3)?,
        start_line: row.get(4)?,
        end_line: row.get(5)?,
        start_byte: row.get(6)?,
        end_byte: row.get(7)?,
        scope: row.get(8)?,
        snippet: row.get(9)?,
    })
}

/// True when `path` equals the prefix or sits underneath it
fn path_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() || prefix == "." {
        return true;
    }
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine distance in [0, 2]; degenerate (zero-norm) vectors are maximally
/// distant so unembeddable snippets never outrank real matches.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 2.0;
    }
    1.0 - dot(a, b) / (norm_a * norm_b)
}
