//! Scope Graph - C# name binding model
//!
//! The model indexes declarations into a scope graph; the resolver binds
//! written type names against it.

pub mod graph;
pub mod resolver;
pub mod type_ref;

pub use graph::{ScopeGraph, ScopeId, ScopeKind, UsingDirective};
pub use resolver::{NameResolver, TypeLookup};
pub use type_ref::{TypeRef, TypeSegment};
