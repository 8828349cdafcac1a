//! # Codegraph - symbol graph builder for C# workspaces
//!
//! Parses a set of C# projects into a graph of classes, interfaces and
//! methods linked by inheritance, implementation and call relationships, and
//! answers "which files are related to these files" queries over it.
//!
//! Codegraph provides:
//! - Idempotent workspace loading from a manifest of project files
//! - Tree-sitter based parsing with a workspace-wide declaration index
//! - A two-pass extractor (declarations, then relationships)
//! - A JSON graph artifact and a single-hop reverse-dependency query engine

pub mod symbol;
pub mod edge;
pub mod graph;
pub mod workspace;
pub mod adapter;
pub mod scope;
pub mod model;
pub mod binder;
pub mod extractor;
pub mod query;
pub mod ignore;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use symbol::{CodeSymbol, SymbolKind};
pub use edge::{RelationshipKind, SymbolRelationship};
pub use graph::{CodeGraph, GraphStats};
pub use workspace::{Workspace, WorkspaceDiagnostic};
pub use extractor::{Extractor, ExtractorOptions, ExtractionReport};
pub use query::QueryEngine;

use std::path::PathBuf;

/// Result type alias for Codegraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Codegraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Config already exists at {0} (use --force to overwrite)")]
    ConfigExists(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Worker thread failed: {0}")]
    Worker(String),

    #[error("Failed to load project {path}: {reason}")]
    ProjectLoad { path: PathBuf, reason: String },

    #[error("Graph file not found: {0}")]
    GraphNotFound(PathBuf),

    #[error("Graph file contains no symbols: {0}")]
    EmptyGraph(PathBuf),

    #[error("Invalid kind: {0}")]
    InvalidKind(String),
}
