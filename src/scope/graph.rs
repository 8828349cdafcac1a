//! Scope graph for C# name binding
//!
//! The scope graph tracks:
//! - Scope hierarchy (compilation unit, namespaces, type bodies)
//! - The namespace in effect for each scope
//! - `using` directives (namespaces, aliases, `using static`)
//! - Project-wide `global using` directives

use std::collections::HashMap;

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// The kind of scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// Top of one source document
    CompilationUnit,
    /// A block-scoped or file-scoped namespace
    Namespace,
    /// The body of a type declaration; carries the type's key
    Type(String),
}

/// A `using` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsingDirective {
    /// `using A.B;`
    Namespace(String),
    /// `using static A.B.C;`
    Static(String),
    /// `using X = A.B.C;`
    Alias { alias: String, target: String },
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Fully qualified namespace in effect ("" for the global namespace)
    pub namespace: String,
    /// Project the owning document belongs to
    pub project: usize,
    pub usings: Vec<UsingDirective>,
}

/// Arena of scopes for every document in a workspace
#[derive(Debug, Default)]
pub struct ScopeGraph {
    scopes: Vec<Scope>,
    /// `global using` directives per project
    global_usings: HashMap<usize, Vec<UsingDirective>>,
}

impl ScopeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new scope
    pub fn add_scope(
        &mut self,
        parent: Option<ScopeId>,
        kind: ScopeKind,
        namespace: impl Into<String>,
        project: usize,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent,
            namespace: namespace.into(),
            project,
            usings: Vec::new(),
        });
        id
    }

    /// Add a `using` directive to a scope
    pub fn add_using(&mut self, scope: ScopeId, using: UsingDirective) {
        if let Some(s) = self.scopes.get_mut(scope.0 as usize) {
            s.usings.push(using);
        }
    }

    /// Add a `global using` directive to a project
    pub fn add_global_using(&mut self, project: usize, using: UsingDirective) {
        self.global_usings.entry(project).or_default().push(using);
    }

    pub fn get(&self, scope: ScopeId) -> Option<&Scope> {
        self.scopes.get(scope.0 as usize)
    }

    /// Get the parent of a scope
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.get(scope).and_then(|s| s.parent)
    }

    pub fn namespace(&self, scope: ScopeId) -> &str {
        self.get(scope).map(|s| s.namespace.as_str()).unwrap_or("")
    }

    /// Get scope chain from a scope up to its compilation unit
    pub fn scope_chain(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Keys of the types enclosing a scope, innermost first
    pub fn enclosing_types(&self, scope: ScopeId) -> Vec<&str> {
        self.scope_chain(scope)
            .into_iter()
            .filter_map(|id| match &self.get(id)?.kind {
                ScopeKind::Type(key) => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every directive visible from a scope: those of the scope chain,
    /// innermost first, then the project's global usings
    pub fn visible_usings(&self, scope: ScopeId) -> Vec<&UsingDirective> {
        let mut usings: Vec<&UsingDirective> = self
            .scope_chain(scope)
            .into_iter()
            .filter_map(|id| self.get(id))
            .flat_map(|s| s.usings.iter())
            .collect();
        if let Some(project) = self.get(scope).map(|s| s.project) {
            if let Some(global) = self.global_usings.get(&project) {
                usings.extend(global.iter());
            }
        }
        usings
    }

    /// Target of a `using` alias visible from a scope
    pub fn alias(&self, scope: ScopeId, name: &str) -> Option<&str> {
        self.visible_usings(scope).into_iter().find_map(|u| match u {
            UsingDirective::Alias { alias, target } if alias == name => Some(target.as_str()),
            _ => None,
        })
    }

    /// Namespaces whose types (and extension methods) are in scope:
    /// the enclosing namespace chain, then imported namespaces
    pub fn namespaces_in_scope(&self, scope: ScopeId) -> Vec<String> {
        let mut namespaces = namespace_chain(self.namespace(scope));
        for using in self.visible_usings(scope) {
            if let UsingDirective::Namespace(ns) = using {
                if !namespaces.contains(ns) {
                    namespaces.push(ns.clone());
                }
            }
        }
        namespaces
    }

    /// Types named by `using static` directives visible from a scope
    pub fn static_usings(&self, scope: ScopeId) -> Vec<&str> {
        self.visible_usings(scope)
            .into_iter()
            .filter_map(|u| match u {
                UsingDirective::Static(target) => Some(target.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// `A.B.C` → `["A.B.C", "A.B", "A", ""]`
pub fn namespace_chain(namespace: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = namespace;
    while !current.is_empty() {
        chain.push(current.to_string());
        current = match current.rfind('.') {
            Some(idx) => &current[..idx],
            None => "",
        };
    }
    chain.push(String::new());
    chain
}

/// Join a namespace or type key with a member name
pub fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_hierarchy() {
        let mut graph = ScopeGraph::new();
        let unit = graph.add_scope(None, ScopeKind::CompilationUnit, "", 0);
        let ns = graph.add_scope(Some(unit), ScopeKind::Namespace, "Shop", 0);
        let outer = graph.add_scope(Some(ns), ScopeKind::Type("Shop.Outer".into()), "Shop", 0);
        let inner = graph.add_scope(Some(outer), ScopeKind::Type("Shop.Outer.Inner".into()), "Shop", 0);

        assert_eq!(graph.parent(ns), Some(unit));
        assert_eq!(graph.parent(unit), None);
        assert_eq!(graph.scope_chain(inner), vec![inner, outer, ns, unit]);
        assert_eq!(graph.enclosing_types(inner), vec!["Shop.Outer.Inner", "Shop.Outer"]);
    }

    #[test]
    fn test_usings_are_visible_from_nested_scopes() {
        let mut graph = ScopeGraph::new();
        let unit = graph.add_scope(None, ScopeKind::CompilationUnit, "", 3);
        graph.add_using(unit, UsingDirective::Namespace("System.Linq".into()));
        graph.add_using(unit, UsingDirective::Alias { alias: "Repo".into(), target: "Shop.Data.Repository".into() });
        let ns = graph.add_scope(Some(unit), ScopeKind::Namespace, "Shop.Orders", 3);
        graph.add_using(ns, UsingDirective::Static("Shop.Util.Guard".into()));
        graph.add_global_using(3, UsingDirective::Namespace("Shop.Common".into()));

        assert_eq!(graph.alias(ns, "Repo"), Some("Shop.Data.Repository"));
        assert_eq!(graph.alias(ns, "Other"), None);
        assert_eq!(graph.static_usings(ns), vec!["Shop.Util.Guard"]);
        assert_eq!(
            graph.namespaces_in_scope(ns),
            vec!["Shop.Orders", "Shop", "", "System.Linq", "Shop.Common"]
        );
    }

    #[test]
    fn test_namespace_chain() {
        assert_eq!(namespace_chain("A.B"), vec!["A.B", "A", ""]);
        assert_eq!(namespace_chain(""), vec![""]);
        assert_eq!(qualify("", "X"), "X");
        assert_eq!(qualify("A", "X"), "A.X");
    }
}
