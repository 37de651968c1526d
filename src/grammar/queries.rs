//! Structural query catalog.
//!
//! One tags-style query per supported language, capturing definitions,
//! references, and imports with the `name.definition.<kind>` /
//! `definition.<kind>` / `name.reference.<kind>` / `import` convention.
//! The catalog is pure data; the registry compiles and validates it.

use serde::{Deserialize, Serialize};

/// Languages with a registered grammar and query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageTag {
    Rust,
    TypeScript,
    Tsx,
    Python,
    Go,
    Java,
    Cpp,
}

impl LanguageTag {
    /// Map a file extension to its language, if supported
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "rs" => Some(LanguageTag::Rust),
            "ts" | "js" | "mjs" | "cjs" => Some(LanguageTag::TypeScript),
            "tsx" | "jsx" => Some(LanguageTag::Tsx),
            "py" => Some(LanguageTag::Python),
            "go" => Some(LanguageTag::Go),
            "java" => Some(LanguageTag::Java),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "c" | "h" => Some(LanguageTag::Cpp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageTag::Rust => "rust",
            LanguageTag::TypeScript => "typescript",
            LanguageTag::Tsx => "tsx",
            LanguageTag::Python => "python",
            LanguageTag::Go => "go",
            LanguageTag::Java => "java",
            LanguageTag::Cpp => "cpp",
        }
    }

    /// All catalog entries, for load-time validation and tests
    pub fn all() -> [LanguageTag; 7] {
        [
            LanguageTag::Rust,
            LanguageTag::TypeScript,
            LanguageTag::Tsx,
            LanguageTag::Python,
            LanguageTag::Go,
            LanguageTag::Java,
            LanguageTag::Cpp,
        ]
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structural query source for a language
pub fn query_source(tag: LanguageTag) -> &'static str {
    match tag {
        LanguageTag::Rust => RUST_QUERY,
        LanguageTag::TypeScript | LanguageTag::Tsx => TYPESCRIPT_QUERY,
        LanguageTag::Python => PYTHON_QUERY,
        LanguageTag::Go => GO_QUERY,
        LanguageTag::Java => JAVA_QUERY,
        LanguageTag::Cpp => CPP_QUERY,
    }
}

/// Check that a compiled query exposes every required capture family.
///
/// Returns the missing family names; an entry that captures no definitions,
/// no references, or no imports bounds search recall and is rejected at load.
pub fn missing_capture_families(capture_names: &[&str]) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !capture_names
        .iter()
        .any(|n| n.starts_with("name.definition."))
    {
        missing.push("name.definition.<kind>");
    }
    if !capture_names.iter().any(|n| n.starts_with("name.reference")) {
        missing.push("name.reference[.<kind>]");
    }
    if !capture_names
        .iter()
        .any(|n| *n == "import" || n.starts_with("import."))
    {
        missing.push("import");
    }
    missing
}

const RUST_QUERY: &str = r#"
(function_item
  name: (identifier) @name.definition.function) @definition.function

(struct_item
  name: (type_identifier) @name.definition.class) @definition.class

(enum_item
  name: (type_identifier) @name.definition.enum) @definition.enum

(trait_item
  name: (type_identifier) @name.definition.interface) @definition.interface

(mod_item
  name: (identifier) @name.definition.module) @definition.module

(const_item
  name: (identifier) @name.definition.constant) @definition.constant

(static_item
  name: (identifier) @name.definition.constant) @definition.constant

(use_declaration
  argument: (_) @name.import) @import

(call_expression
  function: (identifier) @name.reference.call) @reference.call

(call_expression
  function: (scoped_identifier
    name: (identifier) @name.reference.call)) @reference.call

(call_expression
  function: (field_expression
    field: (field_identifier) @name.reference.method)) @reference.method
"#;

const TYPESCRIPT_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name.definition.function) @definition.function

(generator_function_declaration
  name: (identifier) @name.definition.function) @definition.function

(method_definition
  name: (property_identifier) @name.definition.method) @definition.method

(class_declaration
  name: (type_identifier) @name.definition.class) @definition.class

(interface_declaration
  name: (type_identifier) @name.definition.interface) @definition.interface

(enum_declaration
  name: (identifier) @name.definition.enum) @definition.enum

(lexical_declaration
  (variable_declarator
    name: (identifier) @name.definition.function
    value: [(arrow_function) (function_expression)])) @definition.function

(import_statement
  source: (string) @name.import) @import

(export_statement
  source: (string) @name.import) @import

(call_expression
  function: (identifier) @name.reference.call) @reference.call

(call_expression
  function: (member_expression
    property: (property_identifier) @name.reference.method)) @reference.method

(new_expression
  constructor: (identifier) @name.reference.class) @reference.class
"#;

const PYTHON_QUERY: &str = r#"
(function_definition
  name: (identifier) @name.definition.function) @definition.function

(class_definition
  name: (identifier) @name.definition.class) @definition.class

(import_statement
  name: (dotted_name) @name.import) @import

(import_statement
  name: (aliased_import
    name: (dotted_name) @name.import)) @import

(import_from_statement
  module_name: (dotted_name) @name.import) @import

(call
  function: (identifier) @name.reference.call) @reference.call

(call
  function: (attribute
    attribute: (identifier) @name.reference.method)) @reference.method
"#;

const GO_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name.definition.function) @definition.function

(method_declaration
  name: (field_identifier) @name.definition.method) @definition.method

(type_declaration
  (type_spec
    name: (type_identifier) @name.definition.class)) @definition.class

(const_declaration
  (const_spec
    name: (identifier) @name.definition.constant)) @definition.constant

(import_spec
  path: (interpreted_string_literal) @name.import) @import

(call_expression
  function: (identifier) @name.reference.call) @reference.call

(call_expression
  function: (selector_expression
    field: (field_identifier) @name.reference.method)) @reference.method
"#;

const JAVA_QUERY: &str = r#"
(method_declaration
  name: (identifier) @name.definition.method) @definition.method

(constructor_declaration
  name: (identifier) @name.definition.method) @definition.method

(class_declaration
  name: (identifier) @name.definition.class) @definition.class

(interface_declaration
  name: (identifier) @name.definition.interface) @definition.interface

(enum_declaration
  name: (identifier) @name.definition.enum) @definition.enum

(import_declaration
  (scoped_identifier) @name.import) @import

(method_invocation
  name: (identifier) @name.reference.method) @reference.method

(object_creation_expression
  type: (type_identifier) @name.reference.class) @reference.class
"#;

const CPP_QUERY: &str = r#"
(function_definition
  declarator: (function_declarator
    declarator: [(identifier) (field_identifier) (qualified_identifier)] @name.definition.function)) @definition.function

(class_specifier
  name: (type_identifier) @name.definition.class
  body: (field_declaration_list)) @definition.class

(struct_specifier
  name: (type_identifier) @name.definition.class
  body: (field_declaration_list)) @definition.class

(enum_specifier
  name: (type_identifier) @name.definition.enum) @definition.enum

(preproc_include
  path: (_) @name.import) @import

(call_expression
  function: (identifier) @name.reference.call) @reference.call

(call_expression
  function: (field_expression
    field: (field_identifier) @name.reference.method)) @reference.method
"#;
