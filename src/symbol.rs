//! Symbol types - the nodes of the code graph
//!
//! Only three kinds of declared program elements are tracked:
//! - `Class`: a `class` declaration
//! - `Interface`: an `interface` declaration
//! - `Method`: a method declared directly inside a class body
//!
//! Every symbol is keyed by its fully qualified, signature-disambiguated name
//! and owns its outgoing relationships.

use crate::edge::SymbolRelationship;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// File path recorded when the originating document has no path.
pub const UNKNOWN_FILE: &str = "unknown";

/// The kind of a symbol in the code graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Class,
    Interface,
    Method,
}

impl SymbolKind {
    /// Get the string representation of the symbol kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "Class",
            SymbolKind::Interface => "Interface",
            SymbolKind::Method => "Method",
        }
    }

    /// Get all symbol kinds
    pub fn all() -> &'static [SymbolKind] {
        &[SymbolKind::Class, SymbolKind::Interface, SymbolKind::Method]
    }
}

impl FromStr for SymbolKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "class" => Ok(SymbolKind::Class),
            "interface" => Ok(SymbolKind::Interface),
            "method" => Ok(SymbolKind::Method),
            _ => Err(Error::InvalidKind(format!("Unknown symbol kind: {}", s))),
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for SymbolKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl SymbolKind {
    /// Kind from its numeric value in legacy graph files
    pub fn from_index(index: u64) -> Result<Self> {
        match index {
            0 => Ok(SymbolKind::Class),
            1 => Ok(SymbolKind::Interface),
            2 => Ok(SymbolKind::Method),
            _ => Err(Error::InvalidKind(format!("Unknown symbol kind: {}", index))),
        }
    }
}

/// A kind as stored on disk: its name, or its enum value in legacy files
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum KindRepr {
    Name(String),
    Index(u64),
}

impl<'de> Deserialize<'de> for SymbolKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match KindRepr::deserialize(deserializer)? {
            KindRepr::Name(name) => SymbolKind::from_str(&name),
            KindRepr::Index(index) => SymbolKind::from_index(index),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// A declared program element tracked as a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSymbol {
    /// Fully qualified, signature-disambiguated name. Unique within a graph.
    #[serde(alias = "FullName")]
    pub full_name: String,
    #[serde(alias = "Kind")]
    pub kind: SymbolKind,
    /// Declaring source file
    #[serde(alias = "FilePath", default = "unknown_file")]
    pub file_path: String,
    /// Line of the declaring identifier token (1-indexed)
    #[serde(alias = "LineNumber")]
    pub line_number: u32,
    /// Outgoing edges in discovery order; repeats are kept
    #[serde(alias = "Relationships", default)]
    pub relationships: Vec<SymbolRelationship>,
}

fn unknown_file() -> String {
    UNKNOWN_FILE.to_string()
}

impl CodeSymbol {
    /// Create a new symbol with no relationships
    pub fn new(
        full_name: impl Into<String>,
        kind: SymbolKind,
        file_path: Option<&str>,
        line_number: u32,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            kind,
            file_path: file_path
                .filter(|p| !p.is_empty())
                .unwrap_or(UNKNOWN_FILE)
                .to_string(),
            line_number,
            relationships: Vec::new(),
        }
    }

    /// Append a relationship
    pub fn with_relationship(mut self, relationship: SymbolRelationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Check whether any relationship of this symbol targets one of `names`
    pub fn references_any(&self, names: &std::collections::HashSet<&str>) -> bool {
        self.relationships
            .iter()
            .any(|r| names.contains(r.target_full_name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::RelationshipKind;

    #[test]
    fn test_symbol_kind_roundtrip() {
        for kind in SymbolKind::all() {
            let parsed: SymbolKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_symbol_kind_case_insensitive() {
        assert_eq!(SymbolKind::from_str("class").unwrap(), SymbolKind::Class);
        assert_eq!(SymbolKind::from_str("INTERFACE").unwrap(), SymbolKind::Interface);
        assert!(SymbolKind::from_str("field").is_err());
    }

    #[test]
    fn test_missing_path_falls_back_to_unknown() {
        let symbol = CodeSymbol::new("A", SymbolKind::Class, None, 1);
        assert_eq!(symbol.file_path, UNKNOWN_FILE);

        let symbol = CodeSymbol::new("A", SymbolKind::Class, Some(""), 1);
        assert_eq!(symbol.file_path, UNKNOWN_FILE);
    }

    #[test]
    fn test_json_shape() {
        let symbol = CodeSymbol::new("A.Foo()", SymbolKind::Method, Some("A.cs"), 3)
            .with_relationship(SymbolRelationship::new("B.Bar()", RelationshipKind::Calls));

        let value = serde_json::to_value(&symbol).unwrap();
        assert_eq!(value["full_name"], "A.Foo()");
        assert_eq!(value["kind"], "Method");
        assert_eq!(value["file_path"], "A.cs");
        assert_eq!(value["line_number"], 3);
        assert_eq!(value["relationships"][0]["target_symbol_full_name"], "B.Bar()");
        assert_eq!(value["relationships"][0]["kind"], "Calls");
    }

    #[test]
    fn test_legacy_field_names() {
        let json = r#"{
            "FullName": "N.C",
            "Kind": "Class",
            "FilePath": "C.cs",
            "LineNumber": 7,
            "Relationships": [{"TargetSymbolFullName": "N.Base", "Kind": "InheritsFrom"}]
        }"#;
        let symbol: CodeSymbol = serde_json::from_str(json).unwrap();
        assert_eq!(symbol.full_name, "N.C");
        assert_eq!(symbol.relationships[0].kind, RelationshipKind::InheritsFrom);
    }

    #[test]
    fn test_numeric_kinds() {
        let json = r#"{
            "FullName": "N.C.Run()",
            "Kind": 2,
            "FilePath": "C.cs",
            "LineNumber": 9,
            "Relationships": [{"TargetSymbolFullName": "N.D.Go()", "Kind": 2}]
        }"#;
        let symbol: CodeSymbol = serde_json::from_str(json).unwrap();
        assert_eq!(symbol.kind, SymbolKind::Method);
        assert_eq!(symbol.relationships[0].kind, RelationshipKind::Calls);

        assert_eq!(SymbolKind::from_index(1).unwrap(), SymbolKind::Interface);
        assert!(SymbolKind::from_index(3).is_err());
        assert!(serde_json::from_str::<SymbolKind>("7").is_err());
    }
}
