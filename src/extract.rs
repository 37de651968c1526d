//! Symbol extraction.
//!
//! Runs a language's compiled structural query over a parsed syntax tree and
//! groups the captures into [`SymbolRecord`]s. Definition snippets carry the
//! enclosing declaration text plus any immediately preceding comment block;
//! reference and import snippets carry a fixed-radius line window.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor};

use crate::error::{IndexError, Result};
use crate::grammar::Grammar;
use crate::types::{SymbolKind, SymbolRecord};

/// Upper bound on definition snippet length, in lines
const MAX_SNIPPET_LINES: usize = 64;

/// Lines of context on each side of a reference or import
const REFERENCE_WINDOW: usize = 2;

/// Parse `text` and extract all symbols captured by the grammar's query.
///
/// Records are returned in source order (ascending start offset) with exact
/// span+kind duplicates dropped. A parse failure yields `IndexError::Parse`;
/// callers treat it as a per-file skip.
pub fn extract(rel_path: &str, text: &str, grammar: &Grammar) -> Result<Vec<SymbolRecord>> {
    let mut parser = grammar.parser()?;
    let Some(tree) = parser.parse(text, None) else {
        return Err(IndexError::Parse {
            path: rel_path.to_string(),
            message: "tree-sitter produced no syntax tree".to_string(),
        });
    };

    let root = tree.root_node();
    let capture_names = grammar.query.capture_names();

    let mut records = Vec::new();
    let mut seen: HashSet<(u32, u32, SymbolKind)> = HashSet::new();

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&grammar.query, root, text.as_bytes());
    while let Some(m) = matches.next() {
        let mut kind_capture: Option<(SymbolKind, Node)> = None;
        let mut name_node: Option<Node> = None;

        for capture in m.captures {
            let capture_name = capture_names[capture.index as usize];
            if capture_name.starts_with("name.") {
                name_node = Some(capture.node);
            } else if let Some(kind) = SymbolKind::from_tag(capture_name) {
                kind_capture = Some((kind, capture.node));
            }
        }

        let (Some((mut kind, node)), Some(name_node)) = (kind_capture, name_node) else {
            continue;
        };

        let start_byte = node.start_byte() as u32;
        let end_byte = node.end_byte() as u32;
        let name = clean_symbol_name(node_text(name_node, text));
        if name.is_empty() {
            continue;
        }

        let (scope, scope_is_type) = enclosing_scope(node, text);
        if kind == SymbolKind::DefFunction && scope_is_type {
            kind = SymbolKind::DefMethod;
        }

        if !seen.insert((start_byte, end_byte, kind)) {
            continue;
        }

        let snippet = if kind.is_definition() {
            definition_snippet(node, text)
        } else {
            line_window(text, node.start_position().row, node.end_position().row)
        };

        records.push(SymbolRecord {
            id: symbol_id(rel_path, kind, start_byte, end_byte),
            file_path: rel_path.to_string(),
            kind,
            name,
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            start_byte,
            end_byte,
            scope,
            snippet,
        });
    }

    records.sort_by_key(|r| (r.start_byte, r.end_byte, r.kind.as_tag()));
    Ok(records)
}

fn node_text<'a>(node: Node, text: &'a str) -> &'a str {
    &text[node.byte_range()]
}

/// Strip quotes and include brackets from captured import/name text
fn clean_symbol_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '<' | '>'))
        .to_string()
}

/// Name of the nearest enclosing definition, plus whether that ancestor is a
/// type-like container (class/impl/trait), which turns plain functions into
/// methods.
fn enclosing_scope(node: Node, text: &str) -> (Option<String>, bool) {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        let name_node = ancestor
            .child_by_field_name("name")
            .or_else(|| ancestor.child_by_field_name("type"));
        if let Some(name_node) = name_node {
            let kind = ancestor.kind();
            if is_definition_container(kind) {
                let scope = clean_symbol_name(node_text(name_node, text));
                return (Some(scope), is_type_container(kind));
            }
        }
        current = ancestor.parent();
    }
    (None, false)
}

fn is_definition_container(kind: &str) -> bool {
    matches!(
        kind,
        "function_item"
            | "function_definition"
            | "function_declaration"
            | "method_definition"
            | "method_declaration"
            | "impl_item"
            | "trait_item"
            | "mod_item"
            | "class_declaration"
            | "class_definition"
            | "class_specifier"
            | "struct_specifier"
            | "interface_declaration"
            | "enum_declaration"
    )
}

fn is_type_container(kind: &str) -> bool {
    matches!(
        kind,
        "impl_item"
            | "trait_item"
            | "class_declaration"
            | "class_definition"
            | "class_specifier"
            | "struct_specifier"
            | "interface_declaration"
    )
}

/// Definition snippet: preceding contiguous comment block (markers stripped)
/// followed by the declaration text, capped at a fixed line budget.
fn definition_snippet(node: Node, text: &str) -> String {
    let mut doc_lines: Vec<String> = Vec::new();
    let mut boundary = node;
    while let Some(prev) = boundary.prev_sibling() {
        if !prev.kind().contains("comment") {
            break;
        }
        // Only comments touching the declaration (no blank line between)
        if boundary.start_position().row > prev.end_position().row + 1 {
            break;
        }
        let stripped: Vec<String> = node_text(prev, text)
            .lines()
            .map(strip_comment_markers)
            .filter(|l| !l.is_empty())
            .collect();
        doc_lines.splice(0..0, stripped);
        boundary = prev;
    }

    let mut snippet = String::new();
    for line in &doc_lines {
        snippet.push_str(line);
        snippet.push('\n');
    }

    let body = node_text(node, text);
    let mut body_lines = body.lines();
    for line in body_lines.by_ref().take(MAX_SNIPPET_LINES) {
        snippet.push_str(line);
        snippet.push('\n');
    }
    if body_lines.next().is_some() {
        snippet.push_str("…\n");
    }
    snippet.truncate(snippet.trim_end().len());
    snippet
}

fn strip_comment_markers(line: &str) -> String {
    let trimmed = line.trim();
    let stripped = trimmed
        .strip_prefix("///")
        .or_else(|| trimmed.strip_prefix("//!"))
        .or_else(|| trimmed.strip_prefix("//"))
        .or_else(|| trimmed.strip_prefix("/**"))
        .or_else(|| trimmed.strip_prefix("/*"))
        .or_else(|| trimmed.strip_prefix("*/"))
        .or_else(|| trimmed.strip_prefix('*'))
        .or_else(|| trimmed.strip_prefix('#'))
        .unwrap_or(trimmed);
    stripped.trim_end_matches("*/").trim().to_string()
}

/// Fixed-radius window of source lines around a reference span (0-based rows)
fn line_window(text: &str, start_row: usize, end_row: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let from = start_row.saturating_sub(REFERENCE_WINDOW);
    let to = (end_row + REFERENCE_WINDOW + 1).min(lines.len());
    lines[from..to].join("\n")
}

fn symbol_id(rel_path: &str, kind: SymbolKind, start_byte: u32, end_byte: u32) -> String {
    let input = format!("{rel_path}:{}:{start_byte}:{end_byte}", kind.as_tag());
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..8])
}
