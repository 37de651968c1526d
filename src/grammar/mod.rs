//! Grammar loading and caching.
//!
//! An explicit registry object owns the loaded grammars: one
//! `tree_sitter::Language` plus one compiled structural query per language
//! per process, memoized behind a mutex. Callers resolve grammars by file
//! extension; unknown extensions fail with `UnsupportedLanguage`, which is
//! fatal for that file only.

pub mod queries;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tree_sitter::{Language, Parser, Query};

use crate::error::{IndexError, Result};
pub use queries::LanguageTag;

/// A loaded language grammar with its compiled structural query
#[derive(Debug)]
pub struct Grammar {
    pub tag: LanguageTag,
    pub language: Language,
    pub query: Query,
}

impl Grammar {
    /// Create a parser configured for this grammar.
    ///
    /// Parsers are cheap to construct and not thread-safe; the heavy parts
    /// (language, query) live in the shared grammar.
    pub fn parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| IndexError::Other(format!("failed to set language: {e}")))?;
        Ok(parser)
    }
}

fn load_language(tag: LanguageTag) -> Language {
    match tag {
        LanguageTag::Rust => tree_sitter_rust::LANGUAGE.into(),
        LanguageTag::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        LanguageTag::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        LanguageTag::Python => tree_sitter_python::LANGUAGE.into(),
        LanguageTag::Go => tree_sitter_go::LANGUAGE.into(),
        LanguageTag::Java => tree_sitter_java::LANGUAGE.into(),
        LanguageTag::Cpp => tree_sitter_cpp::LANGUAGE.into(),
    }
}

/// Process-wide grammar cache with injected lifecycle
#[derive(Default)]
pub struct GrammarRegistry {
    cache: Mutex<HashMap<LanguageTag, Arc<Grammar>>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the grammar for a file extension, loading it on first use.
    pub fn get_for_extension(&self, ext: &str) -> Result<Arc<Grammar>> {
        let tag = LanguageTag::from_extension(ext).ok_or_else(|| {
            IndexError::UnsupportedLanguage {
                extension: ext.to_string(),
            }
        })?;
        self.get(tag)
    }

    /// Resolve a grammar by language tag, loading and compiling at most once.
    pub fn get(&self, tag: LanguageTag) -> Result<Arc<Grammar>> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| IndexError::Other("grammar cache poisoned".into()))?;
        if let Some(grammar) = cache.get(&tag) {
            return Ok(Arc::clone(grammar));
        }

        let language = load_language(tag);
        let query = Query::new(&language, queries::query_source(tag)).map_err(|e| {
            IndexError::Query {
                language: tag.to_string(),
                message: e.to_string(),
            }
        })?;

        let capture_names = query.capture_names();
        let missing = queries::missing_capture_families(capture_names);
        if !missing.is_empty() {
            return Err(IndexError::Query {
                language: tag.to_string(),
                message: format!("missing required captures: {}", missing.join(", ")),
            });
        }

        let grammar = Arc::new(Grammar {
            tag,
            language,
            query,
        });
        cache.insert(tag, Arc::clone(&grammar));
        Ok(grammar)
    }

    /// Determine the language set from a batch of paths and load each
    /// grammar once. Unsupported extensions are skipped here; they surface
    /// per file when the orchestrator resolves them.
    pub fn load_for_files<'a, I>(&self, paths: I) -> Result<HashMap<String, Arc<Grammar>>>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut loaded = HashMap::new();
        for path in paths {
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if loaded.contains_key(ext) {
                continue;
            }
            if LanguageTag::from_extension(ext).is_some() {
                loaded.insert(ext.to_string(), self.get_for_extension(ext)?);
            }
        }
        Ok(loaded)
    }

    /// Drop all cached grammars (test isolation).
    #[allow(dead_code)]
    pub fn reset(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Number of grammars currently loaded.
    #[allow(dead_code)]
    pub fn loaded_count(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_every_catalog_entry_compiles() {
        let registry = GrammarRegistry::new();
        for tag in LanguageTag::all() {
            let grammar = registry.get(tag).unwrap_or_else(|e| {
                panic!("query for {tag} failed to compile: {e}");
            });
            assert_eq!(grammar.tag, tag);
        }
    }

    #[test]
    fn test_get_memoizes() {
        let registry = GrammarRegistry::new();
        let first = registry.get(LanguageTag::Rust).unwrap();
        let second = registry.get(LanguageTag::Rust).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.loaded_count(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let registry = GrammarRegistry::new();
        let err = registry.get_for_extension("xyz").unwrap_err();
        match err {
            IndexError::UnsupportedLanguage { extension } => assert_eq!(extension, "xyz"),
            other => panic!("expected UnsupportedLanguage, got {other}"),
        }
    }

    #[test]
    fn test_reset_clears_cache() {
        let registry = GrammarRegistry::new();
        registry.get(LanguageTag::Python).unwrap();
        assert_eq!(registry.loaded_count(), 1);
        registry.reset();
        assert_eq!(registry.loaded_count(), 0);
    }

    #[test]
    fn test_load_for_files_dedupes_extensions() {
        let registry = GrammarRegistry::new();
        let paths = [
            PathBuf::from("src/a.rs"),
            PathBuf::from("src/b.rs"),
            PathBuf::from("web/app.ts"),
            PathBuf::from("notes.txt"),
        ];
        let loaded = registry
            .load_for_files(paths.iter().map(PathBuf::as_path))
            .unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains_key("rs"));
        assert!(loaded.contains_key("ts"));
        // txt was skipped, not loaded
        assert!(!loaded.contains_key("txt"));
    }

    #[test]
    fn test_concurrent_loads_share_one_grammar() {
        let registry = Arc::new(GrammarRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                registry.get(LanguageTag::Go).unwrap()
            }));
        }
        let grammars: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for grammar in &grammars[1..] {
            assert!(Arc::ptr_eq(&grammars[0], grammar));
        }
        assert_eq!(registry.loaded_count(), 1);
    }
}
