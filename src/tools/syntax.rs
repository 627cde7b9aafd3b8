//! Syntax validation for written files
//!
//! Python and Rust are checked with tree-sitter grammars; the data formats
//! with their serde parsers. Errors carry a 1-based line and column when the
//! parser reports one.

use std::path::Path;

use serde::Serialize;
use tree_sitter::{Language, Node, Parser};

use crate::error::{McpError, Result};

/// Target format of a written file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Python,
    Rust,
    Json,
    Yaml,
    Toml,
    /// No validator, written as-is
    Text,
}

impl SourceFormat {
    /// Choose the format from the content type, falling back to the extension
    pub fn detect(content_type: Option<&str>, path: &Path) -> Self {
        content_type
            .and_then(Self::from_content_type)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(Self::from_extension)
            })
            .unwrap_or(Self::Text)
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_lowercase();
        match mime.as_str() {
            "text/python" | "text/x-python" | "application/x-python" | "application/x-python-code" => {
                Some(Self::Python)
            }
            "text/rust" | "text/x-rust" => Some(Self::Rust),
            "application/json" | "text/json" => Some(Self::Json),
            "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => Some(Self::Yaml),
            "application/toml" | "text/toml" | "text/x-toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Text => "text",
        }
    }

    /// Check that `content` parses in this format
    pub fn validate(&self, content: &str) -> Result<()> {
        match self {
            Self::Python => check_grammar(content, tree_sitter_python::LANGUAGE.into(), "Python"),
            Self::Rust => check_grammar(content, tree_sitter_rust::LANGUAGE.into(), "Rust"),
            Self::Json => serde_json::from_str::<serde_json::Value>(content)
                .map(|_| ())
                .map_err(|e| {
                    McpError::SyntaxError(format!("JSON parse error at line {}, column {}: {}", e.line(), e.column(), e))
                }),
            Self::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
                .map(|_| ())
                .map_err(|e| match e.location() {
                    Some(loc) => McpError::SyntaxError(format!(
                        "YAML parse error at line {}, column {}: {}",
                        loc.line(),
                        loc.column(),
                        e
                    )),
                    None => McpError::SyntaxError(format!("YAML parse error: {}", e)),
                }),
            Self::Toml => content
                .parse::<toml::Table>()
                .map(|_| ())
                .map_err(|e| McpError::SyntaxError(format!("TOML parse error: {}", e.message()))),
            Self::Text => Ok(()),
        }
    }
}

fn check_grammar(content: &str, language: Language, label: &str) -> Result<()> {
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| McpError::Internal(format!("{} grammar unavailable: {}", label, e)))?;
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| McpError::Internal(format!("{} parser returned no tree", label)))?;

    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let node = first_error(root).unwrap_or(root);
    let pos = node.start_position();
    let what = if node.is_missing() {
        format!("missing '{}'", node.kind())
    } else {
        "unexpected input".to_string()
    };
    Err(McpError::SyntaxError(format!(
        "{} parse error at line {}, column {}: {}",
        label,
        pos.row + 1,
        pos.column + 1,
        what
    )))
}

/// Depth-first search for the first ERROR or MISSING node
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}
