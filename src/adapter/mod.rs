//! Language Adapter Framework
//!
//! An adapter supplies a tree-sitter grammar and the syntax helpers for one
//! source language. C# is the only language indexed today.

pub mod framework;
pub mod csharp;
pub mod parser;

pub use framework::{line_of, LanguageAdapter, SourceDocument};
pub use csharp::CSharpAdapter;
pub use parser::{parse_documents, ParseOutcome};
