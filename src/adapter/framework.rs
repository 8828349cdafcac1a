//! Core adapter framework
//!
//! Defines the trait a language front end implements and the parsed
//! document type every later stage works on.

use crate::{Error, Result};
use std::path::Path;
use tree_sitter::{Language, Node, Parser, Tree};

/// A parsed source document ready for declaration and relationship passes
#[derive(Debug)]
pub struct SourceDocument {
    /// Path recorded as the `file_path` of every symbol declared here
    pub path: String,
    /// Index of the owning project in the workspace
    pub project: usize,
    pub source: String,
    pub tree: Tree,
}

impl SourceDocument {
    /// Parse `source` with `parser` (already configured for a language)
    pub fn parse(parser: &mut Parser, path: impl Into<String>, project: usize, source: String) -> Result<Self> {
        let path = path.into();
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| Error::Parse(format!("parser produced no tree for {}", path)))?;
        Ok(Self {
            path,
            project,
            source,
            tree,
        })
    }

    /// Text covered by a node of this document's tree
    pub fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// True if the tree contains any error or missing node
    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// 1-based line of a node's first token
pub fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Trait for language front ends
///
/// Each adapter is responsible for:
/// 1. Identifying files it can parse
/// 2. Providing the tree-sitter grammar used to parse them
pub trait LanguageAdapter: Send + Sync {
    /// Get the language name (for display)
    fn language_name(&self) -> &str;

    /// Get file extensions this adapter handles
    fn file_extensions(&self) -> &[&str];

    /// Tree-sitter grammar for this language
    fn language(&self) -> Language;

    /// Check if this adapter can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.file_extensions()
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        } else {
            false
        }
    }

    /// Create a parser configured for this language
    fn parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language())
            .map_err(|e| Error::Parse(format!("Failed to set {} language: {}", self.language_name(), e)))?;
        Ok(parser)
    }
}
