//! Name Resolver - resolves written type names to declared types
//!
//! Resolution order for a simple name written in a scope:
//! 1. `using` alias on the first segment
//! 2. Nested types of the enclosing types, and of their base types
//! 3. The namespace chain, innermost to global
//! 4. Imported namespaces (`using` and `global using`)
//!
//! Qualified names resolve their first segment that way and walk nested
//! types from there, or are tried as namespace-qualified names relative to
//! every enclosing namespace.

use std::collections::HashSet;

use super::graph::{namespace_chain, qualify, ScopeGraph, ScopeId, UsingDirective};
use super::type_ref::{TypeRef, TypeSegment};

/// Access to the declared types a resolver binds names against
pub trait TypeLookup {
    /// Does a type with this key exist
    fn has_type(&self, key: &str) -> bool;

    /// Keys of the resolved base types of a type
    fn base_keys(&self, key: &str) -> Vec<String>;

    /// Type parameter names declared on a type
    fn type_params(&self, key: &str) -> Vec<String>;
}

/// Name resolver using scope graph
pub struct NameResolver<'a, L: TypeLookup> {
    scopes: &'a ScopeGraph,
    lookup: &'a L,
}

impl<'a, L: TypeLookup> NameResolver<'a, L> {
    /// Create a new resolver
    pub fn new(scopes: &'a ScopeGraph, lookup: &'a L) -> Self {
        Self { scopes, lookup }
    }

    /// Resolve a written type to a declared type key
    pub fn resolve(&self, scope: ScopeId, ty: &TypeRef) -> Option<String> {
        self.resolve_segments(scope, ty.named_core()?)
    }

    /// Resolve dotted segments (`Outer<T>.Inner`) to a declared type key
    pub fn resolve_segments(&self, scope: ScopeId, segments: &[TypeSegment]) -> Option<String> {
        let (first, rest) = segments.split_first()?;

        // 1. Alias on the first segment
        if first.args.is_empty() {
            if let Some(target) = self.scopes.alias(scope, &first.name) {
                return self.resolve_alias(scope, target, rest);
            }
        }

        // 2-4. First segment as a type, then nested types
        if let Some(key) = self.resolve_simple(scope, first) {
            if let Some(found) = self.walk_nested(&key, rest) {
                return Some(found);
            }
        }

        // Namespace-qualified name relative to each enclosing namespace
        if !rest.is_empty() {
            let path = segment_path(segments);
            for ns in namespace_chain(self.scopes.namespace(scope)) {
                let candidate = qualify(&ns, &path);
                if self.lookup.has_type(&candidate) {
                    return Some(candidate);
                }
            }
        }

        None
    }

    /// Resolve a name relative to a namespace only (no usings): used for
    /// `using` targets, which C# binds without other usings in effect
    pub fn resolve_in_namespace(&self, namespace: &str, ty: &TypeRef) -> Option<String> {
        let path = segment_path(ty.named_core()?);
        namespace_chain(namespace)
            .into_iter()
            .map(|ns| qualify(&ns, &path))
            .find(|candidate| self.lookup.has_type(candidate))
    }

    /// Keys of the types named by `using static` directives in scope
    pub fn static_using_types(&self, scope: ScopeId) -> Vec<String> {
        let namespace = self.scopes.namespace(scope);
        self.scopes
            .static_usings(scope)
            .into_iter()
            .filter_map(|target| self.resolve_in_namespace(namespace, &TypeRef::parse(target)))
            .collect()
    }

    /// Whether a simple name refers to a type parameter of an enclosing type
    pub fn is_type_parameter(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes
            .enclosing_types(scope)
            .into_iter()
            .any(|key| self.lookup.type_params(key).iter().any(|p| p == name))
    }

    /// Every type key reachable through base lists, excluding `key` itself
    pub fn base_chain(&self, key: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        seen.insert(key.to_string());
        let mut order = Vec::new();
        let mut stack = self.lookup.base_keys(key);
        stack.reverse();
        while let Some(next) = stack.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            let mut bases = self.lookup.base_keys(&next);
            bases.reverse();
            stack.extend(bases);
            order.push(next);
        }
        order
    }

    fn resolve_alias(&self, scope: ScopeId, target: &str, rest: &[TypeSegment]) -> Option<String> {
        let target_ref = TypeRef::parse(target);
        let namespace = self.scopes.namespace(scope);
        if let Some(key) = self.resolve_in_namespace(namespace, &target_ref) {
            return self.walk_nested(&key, rest);
        }
        // Namespace alias: `using Data = Shop.Data;` then `Data.Order`
        if rest.is_empty() {
            return None;
        }
        let target_path = target_ref.named_core().map(segment_path)?;
        let candidate = qualify(&target_path, &segment_path(rest));
        self.lookup.has_type(&candidate).then_some(candidate)
    }

    fn resolve_simple(&self, scope: ScopeId, segment: &TypeSegment) -> Option<String> {
        let key = segment.key();

        if segment.args.is_empty() && self.is_type_parameter(scope, &segment.name) {
            return None;
        }

        // Nested types of enclosing types and their bases
        for owner in self.scopes.enclosing_types(scope) {
            let candidate = qualify(owner, &key);
            if self.lookup.has_type(&candidate) {
                return Some(candidate);
            }
            for base in self.base_chain(owner) {
                let candidate = qualify(&base, &key);
                if self.lookup.has_type(&candidate) {
                    return Some(candidate);
                }
            }
        }

        // Namespace chain
        for ns in namespace_chain(self.scopes.namespace(scope)) {
            let candidate = qualify(&ns, &key);
            if self.lookup.has_type(&candidate) {
                return Some(candidate);
            }
        }

        // Imported namespaces
        for using in self.scopes.visible_usings(scope) {
            if let UsingDirective::Namespace(ns) = using {
                let candidate = qualify(ns, &key);
                if self.lookup.has_type(&candidate) {
                    return Some(candidate);
                }
            }
        }

        None
    }

    fn walk_nested(&self, key: &str, rest: &[TypeSegment]) -> Option<String> {
        let mut current = key.to_string();
        for segment in rest {
            let direct = qualify(&current, &segment.key());
            if self.lookup.has_type(&direct) {
                current = direct;
                continue;
            }
            // Nested types are inherited
            current = self
                .base_chain(&current)
                .into_iter()
                .map(|base| qualify(&base, &segment.key()))
                .find(|candidate| self.lookup.has_type(candidate))?;
        }
        Some(current)
    }
}

/// Dotted key path of segments (`Outer`1.Inner`)
pub fn segment_path(segments: &[TypeSegment]) -> String {
    segments
        .iter()
        .map(TypeSegment::key)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::graph::ScopeKind;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Types {
        bases: HashMap<String, Vec<String>>,
        params: HashMap<String, Vec<String>>,
    }

    impl Types {
        fn with(mut self, key: &str, bases: &[&str]) -> Self {
            self.bases.insert(key.into(), bases.iter().map(|s| s.to_string()).collect());
            self
        }
    }

    impl TypeLookup for Types {
        fn has_type(&self, key: &str) -> bool {
            self.bases.contains_key(key)
        }
        fn base_keys(&self, key: &str) -> Vec<String> {
            self.bases.get(key).cloned().unwrap_or_default()
        }
        fn type_params(&self, key: &str) -> Vec<String> {
            self.params.get(key).cloned().unwrap_or_default()
        }
    }

    fn sample_scopes() -> (ScopeGraph, ScopeId, ScopeId) {
        let mut graph = ScopeGraph::new();
        let unit = graph.add_scope(None, ScopeKind::CompilationUnit, "", 0);
        graph.add_using(unit, UsingDirective::Namespace("Shop.Data".into()));
        graph.add_using(unit, UsingDirective::Alias { alias: "Cust".into(), target: "Shop.Data.Customer".into() });
        graph.add_using(unit, UsingDirective::Alias { alias: "Data".into(), target: "Shop.Data".into() });
        let ns = graph.add_scope(Some(unit), ScopeKind::Namespace, "Shop.Orders", 0);
        let ty = graph.add_scope(Some(ns), ScopeKind::Type("Shop.Orders.Service".into()), "Shop.Orders", 0);
        (graph, ns, ty)
    }

    fn sample_types() -> Types {
        Types::default()
            .with("Shop.Orders.Service", &["Shop.Core.Base"])
            .with("Shop.Orders.Order", &[])
            .with("Shop.Core.Base", &[])
            .with("Shop.Core.Base.Options", &[])
            .with("Shop.Data.Customer", &[])
            .with("Shop.Data.Repository`1", &[])
            .with("Shop.Money", &[])
    }

    #[test]
    fn test_resolve_namespace_chain() {
        let (graph, _, ty) = sample_scopes();
        let types = sample_types();
        let resolver = NameResolver::new(&graph, &types);

        assert_eq!(resolver.resolve(ty, &TypeRef::parse("Order")).as_deref(), Some("Shop.Orders.Order"));
        assert_eq!(resolver.resolve(ty, &TypeRef::parse("Money")).as_deref(), Some("Shop.Money"));
        assert_eq!(resolver.resolve(ty, &TypeRef::parse("Core.Base")).as_deref(), Some("Shop.Core.Base"));
    }

    #[test]
    fn test_resolve_usings_and_generics() {
        let (graph, _, ty) = sample_scopes();
        let types = sample_types();
        let resolver = NameResolver::new(&graph, &types);

        assert_eq!(resolver.resolve(ty, &TypeRef::parse("Customer[]")).as_deref(), Some("Shop.Data.Customer"));
        assert_eq!(
            resolver.resolve(ty, &TypeRef::parse("Repository<Order>")).as_deref(),
            Some("Shop.Data.Repository`1")
        );
        // Arity is part of the identity
        assert_eq!(resolver.resolve(ty, &TypeRef::parse("Repository")), None);
        assert_eq!(resolver.resolve(ty, &TypeRef::parse("int")), None);
    }

    #[test]
    fn test_resolve_inherited_nested_type() {
        let (graph, _, ty) = sample_scopes();
        let types = sample_types();
        let resolver = NameResolver::new(&graph, &types);

        assert_eq!(resolver.resolve(ty, &TypeRef::parse("Options")).as_deref(), Some("Shop.Core.Base.Options"));
        assert_eq!(resolver.resolve(ty, &TypeRef::parse("Service.Options")).as_deref(), Some("Shop.Core.Base.Options"));
    }

    #[test]
    fn test_resolve_alias() {
        let (graph, ns, _) = sample_scopes();
        let types = sample_types();
        let resolver = NameResolver::new(&graph, &types);

        assert_eq!(resolver.resolve(ns, &TypeRef::parse("Cust")).as_deref(), Some("Shop.Data.Customer"));
        assert_eq!(resolver.resolve(ns, &TypeRef::parse("Data.Customer")).as_deref(), Some("Shop.Data.Customer"));
        assert_eq!(resolver.resolve(ns, &TypeRef::parse("Data.Missing")), None);
    }

    #[test]
    fn test_type_parameters_shadow_types() {
        let (graph, _, ty) = sample_scopes();
        let mut types = sample_types().with("Shop.Orders.T", &[]);
        types.params.insert("Shop.Orders.Service".into(), vec!["T".into()]);
        let resolver = NameResolver::new(&graph, &types);

        assert_eq!(resolver.resolve(ty, &TypeRef::parse("T")), None);
    }

    #[test]
    fn test_base_chain_handles_cycles() {
        let graph = ScopeGraph::new();
        let types = Types::default().with("A", &["B"]).with("B", &["C", "A"]).with("C", &[]);
        let resolver = NameResolver::new(&graph, &types);
        assert_eq!(resolver.base_chain("A"), vec!["B", "C"]);
    }
}
