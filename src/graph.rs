//! Code Graph - the serialized artifact shared by indexing and querying
//!
//! A flat collection of symbols keyed by full name. Insertion is
//! first-write-wins: a second symbol with an already-recorded full name is
//! dropped, which is how duplicate declarations (partial classes, a document
//! reached through two projects) collapse to one node.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::edge::{RelationshipKind, SymbolRelationship};
use crate::symbol::{CodeSymbol, SymbolKind};
use crate::{Error, Result};

/// In-memory code graph.
///
/// Symbols are kept in insertion order so the written artifact is stable
/// across runs; lookups by full name go through a hash index.
#[derive(Debug, Default, Clone)]
pub struct CodeGraph {
    symbols: Vec<CodeSymbol>,
    by_name: HashMap<String, usize>,
}

impl CodeGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from symbols, keeping the first of any duplicate names
    pub fn from_symbols(symbols: impl IntoIterator<Item = CodeSymbol>) -> Self {
        let mut graph = Self::new();
        for symbol in symbols {
            graph.insert(symbol);
        }
        graph
    }

    /// Insert a symbol if its full name is not already present.
    ///
    /// Returns `false` when the symbol was dropped as a duplicate.
    pub fn insert(&mut self, symbol: CodeSymbol) -> bool {
        if self.by_name.contains_key(&symbol.full_name) {
            return false;
        }
        self.by_name
            .insert(symbol.full_name.clone(), self.symbols.len());
        self.symbols.push(symbol);
        true
    }

    /// Get a symbol by its full name
    pub fn get(&self, full_name: &str) -> Option<&CodeSymbol> {
        self.by_name.get(full_name).map(|&i| &self.symbols[i])
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.by_name.contains_key(full_name)
    }

    /// Append a relationship to an existing symbol.
    ///
    /// Returns `false` if no symbol with `owner` as full name exists.
    pub fn add_relationship(&mut self, owner: &str, relationship: SymbolRelationship) -> bool {
        match self.by_name.get(owner) {
            Some(&i) => {
                self.symbols[i].relationships.push(relationship);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Get all symbols in insertion order
    pub fn symbols(&self) -> &[CodeSymbol] {
        &self.symbols
    }

    /// Get all symbols declared in a file
    pub fn symbols_in_file<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a CodeSymbol> {
        self.symbols.iter().filter(move |s| s.file_path == path)
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        let mut files = HashSet::new();

        for symbol in &self.symbols {
            files.insert(symbol.file_path.as_str());
            match symbol.kind {
                SymbolKind::Class => stats.classes += 1,
                SymbolKind::Interface => stats.interfaces += 1,
                SymbolKind::Method => stats.methods += 1,
            }
            for rel in &symbol.relationships {
                match rel.kind {
                    RelationshipKind::Calls => stats.calls += 1,
                    RelationshipKind::InheritsFrom => stats.inherits += 1,
                    RelationshipKind::Implements => stats.implements += 1,
                }
                if !self.contains(&rel.target_full_name) {
                    stats.dangling += 1;
                }
            }
        }

        stats.symbols = self.symbols.len();
        stats.files = files.len();
        stats
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the graph as indented JSON.
    ///
    /// The document is fully rendered before the file is touched, so a
    /// serialization failure never leaves a partial file behind.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a graph previously written by [`CodeGraph::write_to`].
    ///
    /// A missing file and a graph with no symbols are both errors.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::GraphNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Err(Error::EmptyGraph(path.to_path_buf()));
        }
        let graph: CodeGraph = serde_json::from_str(&contents)?;
        if graph.is_empty() {
            return Err(Error::EmptyGraph(path.to_path_buf()));
        }
        Ok(graph)
    }
}

impl PartialEq for CodeGraph {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .symbols
                .iter()
                .all(|s| other.get(&s.full_name) == Some(s))
    }
}

impl Eq for CodeGraph {}

impl Serialize for CodeGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.symbols.serialize(serializer)
    }
}

/// On-disk shapes accepted when loading a graph
#[derive(Deserialize)]
#[serde(untagged)]
enum GraphFile {
    Flat(Vec<CodeSymbol>),
    Wrapped {
        #[serde(alias = "Symbols")]
        symbols: Vec<CodeSymbol>,
    },
}

impl<'de> Deserialize<'de> for CodeGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let symbols = match GraphFile::deserialize(deserializer)? {
            GraphFile::Flat(symbols) => symbols,
            GraphFile::Wrapped { symbols } => symbols,
        };
        Ok(CodeGraph::from_symbols(symbols))
    }
}

/// Statistics about a code graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub symbols: usize,
    pub classes: usize,
    pub interfaces: usize,
    pub methods: usize,
    pub files: usize,
    pub calls: usize,
    pub inherits: usize,
    pub implements: usize,
    /// Relationships whose target is not a symbol of this graph
    pub dangling: usize,
}

impl GraphStats {
    pub fn relationships(&self) -> usize {
        self.calls + self.inherits + self.implements
    }
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Code Graph Statistics:")?;
        writeln!(f, "  Files: {}", self.files)?;
        writeln!(
            f,
            "  Symbols: {} (classes: {}, interfaces: {}, methods: {})",
            self.symbols, self.classes, self.interfaces, self.methods
        )?;
        writeln!(
            f,
            "  Relationships: {} (calls: {}, inherits: {}, implements: {}, dangling: {})",
            self.relationships(),
            self.calls,
            self.inherits,
            self.implements,
            self.dangling
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, file: &str, line: u32) -> CodeSymbol {
        CodeSymbol::new(name, SymbolKind::Method, Some(file), line)
    }

    #[test]
    fn test_first_write_wins() {
        let mut graph = CodeGraph::new();
        assert!(graph.insert(method("A.Foo()", "A.cs", 3)));
        assert!(!graph.insert(method("A.Foo()", "A.Partial.cs", 9)));

        assert_eq!(graph.len(), 1);
        let kept = graph.get("A.Foo()").unwrap();
        assert_eq!(kept.file_path, "A.cs");
        assert_eq!(kept.line_number, 3);
    }

    #[test]
    fn test_add_relationship_keeps_repeats() {
        let mut graph = CodeGraph::new();
        graph.insert(method("A.Foo()", "A.cs", 3));

        assert!(graph.add_relationship("A.Foo()", SymbolRelationship::calls("B.Bar()")));
        assert!(graph.add_relationship("A.Foo()", SymbolRelationship::calls("B.Bar()")));
        assert!(!graph.add_relationship("Missing()", SymbolRelationship::calls("B.Bar()")));

        assert_eq!(graph.get("A.Foo()").unwrap().relationships.len(), 2);
    }

    #[test]
    fn test_roundtrip_preserves_relationship_order() {
        let mut graph = CodeGraph::new();
        graph.insert(
            method("A.Foo()", "A.cs", 3)
                .with_relationship(SymbolRelationship::calls("B.Bar()"))
                .with_relationship(SymbolRelationship::calls("C.Baz()"))
                .with_relationship(SymbolRelationship::calls("B.Bar()")),
        );
        graph.insert(CodeSymbol::new("B", SymbolKind::Class, Some("B.cs"), 1));

        let json = graph.to_json_pretty().unwrap();
        assert!(json.starts_with('['));
        let parsed: CodeGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, graph);

        let targets: Vec<_> = parsed.get("A.Foo()").unwrap().relationships.iter()
            .map(|r| r.target_full_name.as_str())
            .collect();
        assert_eq!(targets, vec!["B.Bar()", "C.Baz()", "B.Bar()"]);
    }

    #[test]
    fn test_wrapped_legacy_form() {
        let json = r#"{"Symbols": [
            {"FullName": "A", "Kind": "Class", "FilePath": "A.cs", "LineNumber": 1, "Relationships": []},
            {"FullName": "A", "Kind": "Class", "FilePath": "A2.cs", "LineNumber": 1, "Relationships": []}
        ]}"#;
        let graph: CodeGraph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get("A").unwrap().file_path, "A.cs");
    }

    #[test]
    fn test_load_legacy_numeric_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        std::fs::write(
            &path,
            r#"{"Symbols": [
                {"FullName": "A", "Kind": 0, "FilePath": "A.cs", "LineNumber": 1, "Relationships": []},
                {"FullName": "A.Foo()", "Kind": 2, "FilePath": "A.cs", "LineNumber": 1,
                 "Relationships": [{"TargetSymbolFullName": "B.Bar()", "Kind": 2}]},
                {"FullName": "IB", "Kind": 1, "FilePath": "IB.cs", "LineNumber": 1, "Relationships": []}
            ]}"#,
        )
        .unwrap();

        let graph = CodeGraph::load(&path).unwrap();
        assert_eq!(graph.get("A").unwrap().kind, SymbolKind::Class);
        assert_eq!(graph.get("IB").unwrap().kind, SymbolKind::Interface);
        assert_eq!(
            graph.get("A.Foo()").unwrap().relationships,
            vec![SymbolRelationship::calls("B.Bar()")]
        );
    }

    #[test]
    fn test_stats_counts_dangling() {
        let mut graph = CodeGraph::new();
        graph.insert(
            method("A.Foo()", "A.cs", 3)
                .with_relationship(SymbolRelationship::calls("B.Bar()"))
                .with_relationship(SymbolRelationship::calls("System.Console.WriteLine(string)")),
        );
        graph.insert(method("B.Bar()", "B.cs", 2));
        graph.insert(
            CodeSymbol::new("B", SymbolKind::Class, Some("B.cs"), 1)
                .with_relationship(SymbolRelationship::new("IB", RelationshipKind::Implements)),
        );

        let stats = graph.stats();
        assert_eq!(stats.symbols, 3);
        assert_eq!(stats.methods, 2);
        assert_eq!(stats.classes, 1);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.implements, 1);
        assert_eq!(stats.dangling, 2);
        assert_eq!(stats.relationships(), 3);
    }

    #[test]
    fn test_load_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(CodeGraph::load(&missing), Err(Error::GraphNotFound(_))));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "[]").unwrap();
        assert!(matches!(CodeGraph::load(&empty), Err(Error::EmptyGraph(_))));

        let blank = dir.path().join("blank.json");
        std::fs::write(&blank, "").unwrap();
        assert!(matches!(CodeGraph::load(&blank), Err(Error::EmptyGraph(_))));
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("graph.json");

        let graph = CodeGraph::from_symbols(vec![method("A.Foo()", "A.cs", 3)]);
        graph.write_to(&path).unwrap();

        let loaded = CodeGraph::load(&path).unwrap();
        assert_eq!(loaded, graph);
    }
}
