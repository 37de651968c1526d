use serde::{Deserialize, Serialize};

/// A symbol-level unit extracted from a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub id: String,
    pub file_path: String,
    pub kind: SymbolKind,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: u32,
    pub end_byte: u32,
    /// Name of the nearest enclosing definition, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Context text used for embedding and display
    pub snippet: String,
}

/// Kinds of symbols the query catalog can capture.
///
/// The wire form follows the capture-tag convention of the structural
/// queries: `definition.<kind>`, `reference.<kind>`, `import`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    #[serde(rename = "definition.function")]
    DefFunction,
    #[serde(rename = "definition.method")]
    DefMethod,
    #[serde(rename = "definition.class")]
    DefClass,
    #[serde(rename = "definition.interface")]
    DefInterface,
    #[serde(rename = "definition.enum")]
    DefEnum,
    #[serde(rename = "definition.module")]
    DefModule,
    #[serde(rename = "definition.constant")]
    DefConstant,
    #[serde(rename = "reference.call")]
    RefCall,
    #[serde(rename = "reference.method")]
    RefMethod,
    #[serde(rename = "reference.class")]
    RefClass,
    #[serde(rename = "import")]
    Import,
}

impl SymbolKind {
    /// Parse a capture tag like `definition.function` or `import`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "definition.function" => Some(SymbolKind::DefFunction),
            "definition.method" => Some(SymbolKind::DefMethod),
            "definition.class" => Some(SymbolKind::DefClass),
            "definition.interface" => Some(SymbolKind::DefInterface),
            "definition.enum" => Some(SymbolKind::DefEnum),
            "definition.module" => Some(SymbolKind::DefModule),
            "definition.constant" => Some(SymbolKind::DefConstant),
            "reference.call" => Some(SymbolKind::RefCall),
            "reference.method" => Some(SymbolKind::RefMethod),
            "reference.class" => Some(SymbolKind::RefClass),
            "import" => Some(SymbolKind::Import),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            SymbolKind::DefFunction => "definition.function",
            SymbolKind::DefMethod => "definition.method",
            SymbolKind::DefClass => "definition.class",
            SymbolKind::DefInterface => "definition.interface",
            SymbolKind::DefEnum => "definition.enum",
            SymbolKind::DefModule => "definition.module",
            SymbolKind::DefConstant => "definition.constant",
            SymbolKind::RefCall => "reference.call",
            SymbolKind::RefMethod => "reference.method",
            SymbolKind::RefClass => "reference.class",
            SymbolKind::Import => "import",
        }
    }

    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            SymbolKind::DefFunction
                | SymbolKind::DefMethod
                | SymbolKind::DefClass
                | SymbolKind::DefInterface
                | SymbolKind::DefEnum
                | SymbolKind::DefModule
                | SymbolKind::DefConstant
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            SymbolKind::RefCall | SymbolKind::RefMethod | SymbolKind::RefClass
        )
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Metadata about an indexed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Workspace-relative path with forward slashes
    pub path: String,
    pub language: Option<String>,
    /// SHA-256 of the file content, hex encoded. Empty when the last
    /// embedding pass failed and the file must be re-queued.
    pub hash: String,
    pub mtime: i64,
    pub indexed_at: i64,
}

/// A ranked search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub symbol: SymbolRecord,
    /// Normalized relevance in [0, 1]
    pub score: f32,
}

/// Lifecycle state of a workspace index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Idle,
    Scanning,
    Indexing,
    Completed,
    Error,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Idle => "idle",
            IndexStatus::Scanning => "scanning",
            IndexStatus::Indexing => "indexing",
            IndexStatus::Completed => "completed",
            IndexStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "scanning" => IndexStatus::Scanning,
            "indexing" => IndexStatus::Indexing,
            "completed" => IndexStatus::Completed,
            "error" => IndexStatus::Error,
            _ => IndexStatus::Idle,
        }
    }
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Files completed / total for the active indexing pass
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndexProgress {
    pub completed: u64,
    pub total: u64,
}

/// Statistics about the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub files_count: u64,
    pub symbols_count: u64,
    pub last_indexed: Option<i64>,
    pub status: IndexStatus,
    pub progress: IndexProgress,
    pub failed_files: u64,
    pub languages: Vec<LanguageStats>,
}

/// Per-language statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageStats {
    pub language: String,
    pub file_count: u64,
    pub symbol_count: u64,
}
