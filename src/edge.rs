//! Edge types - directed, typed references between symbols
//!
//! Relationships name their target by full name rather than by identity, so
//! forward references, cross-project edges and edges into code that was never
//! analyzed are all representable:
//! - `InheritsFrom`: class → base class, interface → base interface
//! - `Implements`: class → interface
//! - `Calls`: method → invoked method

use crate::symbol::KindRepr;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// The kind of a relationship between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationshipKind {
    InheritsFrom,
    Implements,
    Calls,
}

impl RelationshipKind {
    /// Get the string representation of the relationship kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::InheritsFrom => "InheritsFrom",
            RelationshipKind::Implements => "Implements",
            RelationshipKind::Calls => "Calls",
        }
    }

    /// Get all relationship kinds
    pub fn all() -> &'static [RelationshipKind] {
        &[
            RelationshipKind::InheritsFrom,
            RelationshipKind::Implements,
            RelationshipKind::Calls,
        ]
    }

    /// Check if this is a type-hierarchy edge rather than a call
    pub fn is_hierarchy(&self) -> bool {
        matches!(self, RelationshipKind::InheritsFrom | RelationshipKind::Implements)
    }
}

impl FromStr for RelationshipKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inheritsfrom" | "inherits_from" | "inherits" => Ok(RelationshipKind::InheritsFrom),
            "implements" => Ok(RelationshipKind::Implements),
            "calls" => Ok(RelationshipKind::Calls),
            _ => Err(Error::InvalidKind(format!("Unknown relationship kind: {}", s))),
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for RelationshipKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl RelationshipKind {
    /// Kind from its numeric value in legacy graph files
    pub fn from_index(index: u64) -> Result<Self> {
        match index {
            0 => Ok(RelationshipKind::InheritsFrom),
            1 => Ok(RelationshipKind::Implements),
            2 => Ok(RelationshipKind::Calls),
            _ => Err(Error::InvalidKind(format!("Unknown relationship kind: {}", index))),
        }
    }
}

impl<'de> Deserialize<'de> for RelationshipKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match KindRepr::deserialize(deserializer)? {
            KindRepr::Name(name) => RelationshipKind::from_str(&name),
            KindRepr::Index(index) => RelationshipKind::from_index(index),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// A directed, typed edge from the owning symbol to another symbol.
///
/// The target does not have to exist in the graph; dangling targets are kept
/// and simply never match during queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolRelationship {
    #[serde(rename = "target_symbol_full_name", alias = "TargetSymbolFullName")]
    pub target_full_name: String,
    #[serde(alias = "Kind")]
    pub kind: RelationshipKind,
}

impl SymbolRelationship {
    pub fn new(target_full_name: impl Into<String>, kind: RelationshipKind) -> Self {
        Self {
            target_full_name: target_full_name.into(),
            kind,
        }
    }

    pub fn calls(target_full_name: impl Into<String>) -> Self {
        Self::new(target_full_name, RelationshipKind::Calls)
    }
}
