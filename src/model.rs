//! Semantic model - the workspace-wide declaration index
//!
//! Built once from every parsed document before any symbol is emitted, so
//! that both extraction passes can bind names across files and projects.
//! The model records, per type, its base list, methods, fields and
//! properties, and the lexical scope each declaration was written in.
//! Partial declarations of one type merge into a single entry.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::adapter::csharp::{
    base_types, has_modifier, is_type_declaration, name_node, namespace_name, parameter_list, parameters,
    parse_using, return_type, type_parameters, variable_declaration, variable_declarators,
};
use crate::adapter::{line_of, SourceDocument};
use crate::scope::graph::qualify;
use crate::scope::type_ref::segment_key;
use crate::scope::{NameResolver, ScopeGraph, ScopeId, ScopeKind, TypeLookup, TypeRef, TypeSegment};

pub type MethodId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Record,
    Enum,
}

impl TypeKind {
    fn from_node_kind(kind: &str) -> Self {
        match kind {
            "class_declaration" => TypeKind::Class,
            "interface_declaration" => TypeKind::Interface,
            "struct_declaration" | "record_struct_declaration" => TypeKind::Struct,
            "record_declaration" => TypeKind::Record,
            _ => TypeKind::Enum,
        }
    }
}

/// A base list entry and the scope it is resolved in
#[derive(Debug, Clone)]
pub struct BaseEntry {
    pub written: TypeRef,
    pub scope: ScopeId,
    pub resolved: Option<String>,
}

/// A field or property
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub type_ref: TypeRef,
    pub scope: ScopeId,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    /// Lookup key: namespace-qualified, generic arity marked (`Shop.Repo`1`)
    pub key: String,
    pub name: String,
    pub namespace: String,
    pub outer: Option<String>,
    pub kind: TypeKind,
    pub type_params: Vec<String>,
    /// Display name (`Shop.Repo<T>`)
    pub full_name: String,
    pub bases: Vec<BaseEntry>,
    pub methods: Vec<MethodId>,
    pub members: HashMap<String, MemberDecl>,
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub type_ref: Option<TypeRef>,
    pub modifier: Option<String>,
    pub is_this: bool,
    pub has_default: bool,
}

impl ParamDecl {
    pub fn is_params(&self) -> bool {
        self.modifier.as_deref() == Some("params")
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    /// Key of the declaring type
    pub owner: String,
    /// Type-body scope the method was written in
    pub scope: ScopeId,
    pub type_params: Vec<String>,
    pub params: Vec<ParamDecl>,
    pub return_type: Option<TypeRef>,
    pub is_static: bool,
    pub is_extension: bool,
    pub full_name: String,
    pub doc: usize,
    pub line: u32,
}

impl MethodDecl {
    /// Whether a call passing `count` arguments can bind to this method
    pub fn accepts_arity(&self, count: usize) -> bool {
        let required = self
            .params
            .iter()
            .filter(|p| !p.has_default && !p.is_params())
            .count();
        let has_params = self.params.iter().any(ParamDecl::is_params);
        count >= required && (has_params || count <= self.params.len())
    }
}

/// What a declaration node declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declared {
    Type(String),
    Method(MethodId),
}

/// Static type of an expression, as far as the model can tell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    /// A type declared in the workspace
    Decl { key: String, args: Vec<Ty> },
    /// A type from outside the workspace (`int`, `List<T>`, `Task<T>`)
    External { name: String, args: Vec<Ty> },
    Array(Box<Ty>),
    TypeParam(String),
}

impl Ty {
    pub fn decl_key(&self) -> Option<&str> {
        match self {
            Ty::Decl { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Replace type parameters using `map`
    pub fn substitute(&self, map: &HashMap<String, Ty>) -> Ty {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Ty::TypeParam(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Ty::Decl { key, args } => Ty::Decl {
                key: key.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            Ty::External { name, args } => Ty::External {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            Ty::Array(element) => Ty::Array(Box::new(element.substitute(map))),
        }
    }

    /// Element type when iterating: arrays, or the last generic argument
    /// of a collection (`List<T>`, `IEnumerable<T>`, `Dictionary<K, V>` gives `V`
    /// only when nothing better is known)
    pub fn element(&self) -> Option<Ty> {
        match self {
            Ty::Array(element) => Some((**element).clone()),
            Ty::External { args, .. } | Ty::Decl { args, .. } if args.len() == 1 => args.first().cloned(),
            _ => None,
        }
    }
}

/// The declaration index for one set of documents
#[derive(Debug, Default)]
pub struct SemanticModel {
    scopes: ScopeGraph,
    types: HashMap<String, TypeDecl>,
    type_order: Vec<String>,
    methods: Vec<MethodDecl>,
    by_node: HashMap<(usize, usize), Declared>,
    extensions: HashMap<String, Vec<MethodId>>,
}

impl SemanticModel {
    /// Index every document, resolve base lists, then compute display names
    pub fn build(documents: &[SourceDocument]) -> Self {
        let mut model = Self::default();
        for (index, doc) in documents.iter().enumerate() {
            let unit = model
                .scopes
                .add_scope(None, ScopeKind::CompilationUnit, "", doc.project);
            let mut indexer = Indexer {
                model: &mut model,
                doc,
                doc_index: index,
            };
            indexer.walk_members(doc.tree.root_node(), unit, "", None);
        }

        // Nested types reached through bases need earlier bases resolved;
        // a second round picks those up.
        model.resolve_bases();
        model.resolve_bases();
        model.compute_names();

        tracing::debug!(
            "Semantic model: {} type(s), {} method(s), {} scope(s)",
            model.types.len(),
            model.methods.len(),
            model.scopes.len()
        );
        model
    }

    pub fn scopes(&self) -> &ScopeGraph {
        &self.scopes
    }

    pub fn resolver(&self) -> NameResolver<'_, Self> {
        NameResolver::new(&self.scopes, self)
    }

    pub fn type_decl(&self, key: &str) -> Option<&TypeDecl> {
        self.types.get(key)
    }

    /// Types in first-declaration order
    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.type_order.iter().filter_map(|k| self.types.get(k))
    }

    pub fn method(&self, id: MethodId) -> &MethodDecl {
        &self.methods[id]
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// The type or method declared by a node of document `doc`
    pub fn declared_at(&self, doc: usize, node: Node) -> Option<&Declared> {
        self.by_node.get(&(doc, node.start_byte()))
    }

    /// Methods named `name` on a type and then on its bases, most derived
    /// first
    pub fn methods_named(&self, key: &str, name: &str) -> Vec<MethodId> {
        let mut chain = vec![key.to_string()];
        chain.extend(self.resolver().base_chain(key));
        chain
            .iter()
            .filter_map(|k| self.types.get(k))
            .flat_map(|decl| decl.methods.iter().copied())
            .filter(|id| self.methods[*id].name == name)
            .collect()
    }

    /// Extension methods with a given name
    pub fn extension_methods(&self, name: &str) -> &[MethodId] {
        self.extensions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Field or property `name` on a type or its bases, with the key of
    /// the type declaring it
    pub fn member(&self, key: &str, name: &str) -> Option<(&MemberDecl, &TypeDecl)> {
        let mut chain = vec![key.to_string()];
        chain.extend(self.resolver().base_chain(key));
        chain.iter().filter_map(|k| self.types.get(k)).find_map(|decl| {
            decl.members.get(name).map(|member| (member, decl))
        })
    }

    /// Static type of a written type in a scope; `type_params` are extra
    /// type parameter names in effect (a method's own)
    pub fn resolve_ty(&self, scope: ScopeId, ty: &TypeRef, type_params: &[String]) -> Option<Ty> {
        match ty {
            TypeRef::Predefined(name) => Some(Ty::External {
                name: name.clone(),
                args: Vec::new(),
            }),
            TypeRef::Named(segments) => {
                let last = segments.last()?;
                if segments.len() == 1 && last.args.is_empty() {
                    if ty.is_var() {
                        return None;
                    }
                    if type_params.contains(&last.name) || self.resolver().is_type_parameter(scope, &last.name) {
                        return Some(Ty::TypeParam(last.name.clone()));
                    }
                }
                let args: Vec<Ty> = last
                    .args
                    .iter()
                    .map(|a| {
                        self.resolve_ty(scope, a, type_params).unwrap_or_else(|| Ty::External {
                            name: a.to_string(),
                            args: Vec::new(),
                        })
                    })
                    .collect();
                match self.resolver().resolve_segments(scope, segments) {
                    Some(key) => Some(Ty::Decl { key, args }),
                    None => Some(Ty::External {
                        name: last.name.clone(),
                        args,
                    }),
                }
            }
            TypeRef::Nullable(inner) => self.resolve_ty(scope, inner, type_params),
            TypeRef::Array { element, .. } => {
                let element = self.resolve_ty(scope, element, type_params).unwrap_or_else(|| Ty::External {
                    name: element.to_string(),
                    args: Vec::new(),
                });
                Some(Ty::Array(Box::new(element)))
            }
            TypeRef::Pointer(_) | TypeRef::Tuple(_) | TypeRef::Unparsed(_) => None,
        }
    }

    /// Type arguments in effect for members of `owner` when accessed
    /// through `receiver` (walks base lists, so `class OrderRepo :
    /// Repo<Order>` maps `T` to `Order`)
    pub fn type_args_for(&self, receiver: &Ty, owner: &str) -> HashMap<String, Ty> {
        self.type_args_walk(receiver, owner, 0).unwrap_or_default()
    }

    fn type_args_walk(&self, receiver: &Ty, owner: &str, depth: usize) -> Option<HashMap<String, Ty>> {
        const MAX_DEPTH: usize = 16;
        let Ty::Decl { key, args } = receiver else {
            return None;
        };
        let decl = self.types.get(key)?;
        let map: HashMap<String, Ty> = decl
            .type_params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        if key == owner {
            return Some(map);
        }
        if depth >= MAX_DEPTH {
            return None;
        }
        decl.bases.iter().find_map(|base| {
            base.resolved.as_ref()?;
            let base_ty = self
                .resolve_ty(base.scope, &base.written, &decl.type_params)?
                .substitute(&map);
            self.type_args_walk(&base_ty, owner, depth + 1)
        })
    }

    /// Render a written type for a method signature: workspace types by
    /// full name, everything else as written
    pub fn render_type(&self, scope: ScopeId, ty: &TypeRef, type_params: &[String]) -> String {
        ty.render_with(&|segments: &[TypeSegment]| self.render_named(scope, segments, type_params))
    }

    fn render_named(&self, scope: ScopeId, segments: &[TypeSegment], type_params: &[String]) -> Option<String> {
        if let [only] = segments {
            if only.args.is_empty() && type_params.contains(&only.name) {
                return None;
            }
        }
        let key = self.resolver().resolve_segments(scope, segments)?;

        // Declaring chain, outermost first
        let mut chain = Vec::new();
        let mut current = self.types.get(&key);
        while let Some(decl) = current {
            chain.push(decl);
            current = decl.outer.as_ref().and_then(|o| self.types.get(o));
        }
        chain.reverse();

        let namespace = chain.first().map(|d| d.namespace.clone()).unwrap_or_default();
        let offset = chain.len() as isize - segments.len() as isize;
        let parts: Vec<String> = chain
            .iter()
            .enumerate()
            .map(|(i, decl)| {
                let written = usize::try_from(i as isize - offset)
                    .ok()
                    .and_then(|w| segments.get(w))
                    .filter(|w| w.args.len() == decl.type_params.len());
                let args: Vec<String> = match written {
                    Some(w) => w
                        .args
                        .iter()
                        .map(|a| self.render_type(scope, a, type_params))
                        .collect(),
                    None => decl.type_params.clone(),
                };
                if args.is_empty() {
                    decl.name.clone()
                } else {
                    format!("{}<{}>", decl.name, args.join(", "))
                }
            })
            .collect();
        Some(qualify(&namespace, &parts.join(".")))
    }

    fn resolve_bases(&mut self) {
        for index in 0..self.type_order.len() {
            let key = self.type_order[index].clone();
            let resolved: Vec<Option<String>> = match self.types.get(&key) {
                Some(decl) => {
                    let resolver = self.resolver();
                    decl.bases
                        .iter()
                        .map(|base| resolver.resolve(base.scope, &base.written).filter(|k| *k != key))
                        .collect()
                }
                None => continue,
            };
            if let Some(decl) = self.types.get_mut(&key) {
                for (base, resolved) in decl.bases.iter_mut().zip(resolved) {
                    base.resolved = resolved;
                }
            }
        }
    }

    fn compute_names(&mut self) {
        let mut type_names = Vec::with_capacity(self.type_order.len());
        for key in &self.type_order {
            type_names.push((key.clone(), self.display_name(key)));
        }
        for (key, name) in type_names {
            if let Some(decl) = self.types.get_mut(&key) {
                decl.full_name = name;
            }
        }

        let method_names: Vec<String> = (0..self.methods.len())
            .map(|id| self.method_display_name(id))
            .collect();
        for (method, name) in self.methods.iter_mut().zip(method_names) {
            method.full_name = name;
        }
    }

    fn display_name(&self, key: &str) -> String {
        let Some(decl) = self.types.get(key) else {
            return key.to_string();
        };
        let prefix = match &decl.outer {
            Some(outer) => self.display_name(outer),
            None => decl.namespace.clone(),
        };
        let name = if decl.type_params.is_empty() {
            decl.name.clone()
        } else {
            format!("{}<{}>", decl.name, decl.type_params.join(", "))
        };
        qualify(&prefix, &name)
    }

    fn method_display_name(&self, id: MethodId) -> String {
        let method = &self.methods[id];
        let owner = self
            .types
            .get(&method.owner)
            .map(|d| d.full_name.clone())
            .unwrap_or_else(|| method.owner.clone());
        let type_params = if method.type_params.is_empty() {
            String::new()
        } else {
            format!("<{}>", method.type_params.join(", "))
        };
        let params: Vec<String> = method
            .params
            .iter()
            .map(|p| {
                let ty = p
                    .type_ref
                    .as_ref()
                    .map(|t| self.render_type(method.scope, t, &method.type_params))
                    .unwrap_or_default();
                match &p.modifier {
                    Some(modifier) => format!("{} {}", modifier, ty),
                    None => ty,
                }
            })
            .collect();
        format!("{}.{}{}({})", owner, method.name, type_params, params.join(", "))
    }
}

impl TypeLookup for SemanticModel {
    fn has_type(&self, key: &str) -> bool {
        self.types.contains_key(key)
    }

    fn base_keys(&self, key: &str) -> Vec<String> {
        self.types
            .get(key)
            .map(|d| d.bases.iter().filter_map(|b| b.resolved.clone()).collect())
            .unwrap_or_default()
    }

    fn type_params(&self, key: &str) -> Vec<String> {
        self.types
            .get(key)
            .map(|d| d.type_params.clone())
            .unwrap_or_default()
    }
}

/// Walks one document, adding its declarations to the model
struct Indexer<'m, 'd> {
    model: &'m mut SemanticModel,
    doc: &'d SourceDocument,
    doc_index: usize,
}

impl Indexer<'_, '_> {
    fn walk_members(&mut self, node: Node, scope: ScopeId, namespace: &str, outer: Option<&str>) {
        let mut scope = scope;
        let mut namespace = namespace.to_string();
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "using_directive" => self.add_using(child, scope),
                "namespace_declaration" => {
                    let Some(name) = namespace_name(self.doc, child) else {
                        continue;
                    };
                    let ns = qualify(&namespace, &name);
                    let ns_scope = self.add_scope(scope, ScopeKind::Namespace, &ns);
                    if let Some(body) = body_of(child) {
                        self.walk_members(body, ns_scope, &ns, None);
                    }
                }
                "file_scoped_namespace_declaration" => {
                    let Some(name) = namespace_name(self.doc, child) else {
                        continue;
                    };
                    let ns = qualify(&namespace, &name);
                    let ns_scope = self.add_scope(scope, ScopeKind::Namespace, &ns);
                    // Members may be children of the declaration or its
                    // following siblings depending on the grammar version
                    self.walk_members(child, ns_scope, &ns, None);
                    scope = ns_scope;
                    namespace = ns;
                }
                kind if is_type_declaration(kind) => self.declare_type(child, scope, &namespace, outer),
                "method_declaration" => {
                    if let Some(owner) = outer {
                        self.declare_method(child, scope, owner);
                    }
                }
                "field_declaration" | "event_field_declaration" => {
                    if let Some(owner) = outer {
                        self.declare_fields(child, scope, owner);
                    }
                }
                "property_declaration" | "event_declaration" => {
                    if let Some(owner) = outer {
                        self.declare_property(child, scope, owner);
                    }
                }
                "declaration_list" => self.walk_members(child, scope, &namespace, outer),
                _ => {}
            }
        }
    }

    fn add_scope(&mut self, parent: ScopeId, kind: ScopeKind, namespace: &str) -> ScopeId {
        self.model
            .scopes
            .add_scope(Some(parent), kind, namespace, self.doc.project)
    }

    fn add_using(&mut self, node: Node, scope: ScopeId) {
        match parse_using(self.doc.text(node)) {
            Some((true, using)) => self.model.scopes.add_global_using(self.doc.project, using),
            Some((false, using)) => self.model.scopes.add_using(scope, using),
            None => tracing::trace!("Unrecognized using directive in {}", self.doc.path),
        }
    }

    fn declare_type(&mut self, node: Node, scope: ScopeId, namespace: &str, outer: Option<&str>) {
        let Some(name_node) = name_node(node) else {
            return;
        };
        let name = self.doc.text(name_node).trim_start_matches('@').to_string();
        let type_params = type_parameters(self.doc, node);
        let segment = segment_key(&name, type_params.len());
        let key = qualify(outer.unwrap_or(namespace), &segment);
        let kind = TypeKind::from_node_kind(node.kind());

        let type_scope = self.add_scope(scope, ScopeKind::Type(key.clone()), namespace);

        if !self.model.types.contains_key(&key) {
            self.model.type_order.push(key.clone());
            self.model.types.insert(
                key.clone(),
                TypeDecl {
                    key: key.clone(),
                    name,
                    namespace: namespace.to_string(),
                    outer: outer.map(str::to_string),
                    kind,
                    type_params: type_params.clone(),
                    full_name: String::new(),
                    bases: Vec::new(),
                    methods: Vec::new(),
                    members: HashMap::new(),
                },
            );
        }

        let bases: Vec<BaseEntry> = base_types(node)
            .into_iter()
            .map(|base| BaseEntry {
                written: TypeRef::parse(self.doc.text(base)),
                scope,
                resolved: None,
            })
            .collect();

        // Record primary constructor parameters become properties
        let mut members = Vec::new();
        if matches!(kind, TypeKind::Record | TypeKind::Class | TypeKind::Struct) {
            if let Some(list) = parameter_list(node) {
                for param in parameters(self.doc, list) {
                    if let Some(type_text) = param.type_text {
                        members.push((param.name, TypeRef::parse(&type_text)));
                    }
                }
            }
        }

        if let Some(decl) = self.model.types.get_mut(&key) {
            decl.bases.extend(bases);
            for (member, type_ref) in members {
                decl.members.entry(member).or_insert(MemberDecl {
                    type_ref,
                    scope: type_scope,
                });
            }
        }
        self.model
            .by_node
            .insert((self.doc_index, node.start_byte()), Declared::Type(key.clone()));

        if kind != TypeKind::Enum {
            if let Some(body) = body_of(node) {
                self.walk_members(body, type_scope, namespace, Some(key.as_str()));
            }
        }
    }

    fn declare_method(&mut self, node: Node, scope: ScopeId, owner: &str) {
        let Some(name_node) = name_node(node) else {
            return;
        };
        let params: Vec<ParamDecl> = parameter_list(node)
            .map(|list| parameters(self.doc, list))
            .unwrap_or_default()
            .into_iter()
            .map(|p| ParamDecl {
                type_ref: p.type_text.as_deref().map(TypeRef::parse),
                name: p.name,
                modifier: p.modifier,
                is_this: p.is_this,
                has_default: p.has_default,
            })
            .collect();

        let is_static = has_modifier(self.doc, node, "static");
        let is_extension = is_static && params.first().is_some_and(|p| p.is_this);
        let name = self.doc.text(name_node).trim_start_matches('@').to_string();

        let id = self.model.methods.len();
        self.model.methods.push(MethodDecl {
            name: name.clone(),
            owner: owner.to_string(),
            scope,
            type_params: type_parameters(self.doc, node),
            params,
            return_type: return_type(node).map(|t| TypeRef::parse(self.doc.text(t))),
            is_static,
            is_extension,
            full_name: String::new(),
            doc: self.doc_index,
            line: line_of(name_node),
        });

        if let Some(decl) = self.model.types.get_mut(owner) {
            decl.methods.push(id);
        }
        if is_extension {
            self.model.extensions.entry(name).or_default().push(id);
        }
        self.model
            .by_node
            .insert((self.doc_index, node.start_byte()), Declared::Method(id));
    }

    fn declare_fields(&mut self, node: Node, scope: ScopeId, owner: &str) {
        let Some(declaration) = variable_declaration(node) else {
            return;
        };
        let Some(type_node) = declaration.child_by_field_name("type") else {
            return;
        };
        let type_ref = TypeRef::parse(self.doc.text(type_node));
        let names: Vec<String> = variable_declarators(self.doc, declaration)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        if let Some(decl) = self.model.types.get_mut(owner) {
            for name in names {
                decl.members.entry(name).or_insert(MemberDecl {
                    type_ref: type_ref.clone(),
                    scope,
                });
            }
        }
    }

    fn declare_property(&mut self, node: Node, scope: ScopeId, owner: &str) {
        let (Some(type_node), Some(name_node)) = (node.child_by_field_name("type"), name_node(node)) else {
            return;
        };
        let type_ref = TypeRef::parse(self.doc.text(type_node));
        let name = self.doc.text(name_node).to_string();
        if let Some(decl) = self.model.types.get_mut(owner) {
            decl.members.entry(name).or_insert(MemberDecl { type_ref, scope });
        }
    }
}

/// Body of a namespace or type declaration
fn body_of(node: Node) -> Option<Node> {
    if let Some(body) = node.child_by_field_name("body") {
        return Some(body);
    }
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "declaration_list");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{CSharpAdapter, LanguageAdapter};

    fn build(sources: &[&str]) -> (Vec<SourceDocument>, SemanticModel) {
        let mut parser = CSharpAdapter.parser().unwrap();
        let docs: Vec<SourceDocument> = sources
            .iter()
            .enumerate()
            .map(|(i, s)| SourceDocument::parse(&mut parser, format!("F{i}.cs"), 0, s.to_string()).unwrap())
            .collect();
        let model = SemanticModel::build(&docs);
        (docs, model)
    }

    fn method_names(model: &SemanticModel) -> Vec<&str> {
        (0..model.method_count()).map(|id| model.method(id).full_name.as_str()).collect()
    }

    #[test]
    fn test_simple_names() {
        let (_, model) = build(&["class A { void Foo() { } }", "class B { void Bar() {} }"]);
        assert_eq!(model.type_decl("A").unwrap().full_name, "A");
        assert_eq!(method_names(&model), vec!["A.Foo()", "B.Bar()"]);
        assert_eq!(model.method(0).line, 1);
    }

    #[test]
    fn test_namespaces_generics_and_nesting() {
        let (_, model) = build(&[r#"
namespace Shop.Orders
{
    public class Order { }

    public class Repository<T> where T : class
    {
        public class Entry { public void Touch(ref int count, Order order, params T[] rest) { } }
        public T Find<TKey>(TKey key, int limit = 10) => default;
    }
}
"#]);
        let entry = model.type_decl("Shop.Orders.Repository`1.Entry").unwrap();
        assert_eq!(entry.full_name, "Shop.Orders.Repository<T>.Entry");
        assert_eq!(
            method_names(&model),
            vec![
                "Shop.Orders.Repository<T>.Entry.Touch(ref int, Shop.Orders.Order, params T[])",
                "Shop.Orders.Repository<T>.Find<TKey>(TKey, int)",
            ]
        );
        let find = model.method(1);
        assert!(find.accepts_arity(1));
        assert!(find.accepts_arity(2));
        assert!(!find.accepts_arity(3));
    }

    #[test]
    fn test_file_scoped_namespace_and_usings() {
        let (_, model) = build(&[
            "namespace Shop.Data;\npublic class Customer { }\n",
            "using Shop.Data;\nnamespace Shop.Api;\npublic class Controller { public void Save(Customer c, List<Customer> all) { } }\n",
        ]);
        assert!(model.type_decl("Shop.Data.Customer").is_some());
        assert_eq!(
            method_names(&model),
            vec!["Shop.Api.Controller.Save(Shop.Data.Customer, List<Shop.Data.Customer>)"]
        );
    }

    #[test]
    fn test_partial_types_merge() {
        let (_, model) = build(&[
            "partial class P : Base { void One() {} }",
            "partial class P : IThing { int count; void Two() {} }",
            "class Base {}",
        ]);
        let decl = model.type_decl("P").unwrap();
        assert_eq!(decl.methods.len(), 2);
        assert_eq!(decl.bases.len(), 2);
        assert_eq!(decl.bases[0].resolved.as_deref(), Some("Base"));
        assert_eq!(decl.bases[1].resolved, None);
        assert!(decl.members.contains_key("count"));
    }

    #[test]
    fn test_extension_methods_and_members() {
        let (_, model) = build(&[r#"
namespace Ext {
    public static class OrderExtensions {
        public static decimal Total(this Order order) => 0;
    }
    public class Order { public Customer Buyer { get; set; } }
    public class Customer { }
}"#]);
        let ids = model.extension_methods("Total");
        assert_eq!(ids.len(), 1);
        assert_eq!(model.method(ids[0]).full_name, "Ext.OrderExtensions.Total(Ext.Order)");

        let (member, owner) = model.member("Ext.Order", "Buyer").unwrap();
        assert_eq!(owner.key, "Ext.Order");
        let ty = model.resolve_ty(member.scope, &member.type_ref, &[]).unwrap();
        assert_eq!(ty.decl_key(), Some("Ext.Customer"));
    }

    #[test]
    fn test_type_args_through_bases() {
        let (_, model) = build(&[r#"
class Repo<T> { public T Get() => default; }
class Order { }
class OrderRepo : Repo<Order> { }
"#]);
        let receiver = Ty::Decl {
            key: "OrderRepo".into(),
            args: vec![],
        };
        let map = model.type_args_for(&receiver, "Repo`1");
        assert_eq!(map.get("T").and_then(Ty::decl_key), Some("Order"));
        assert_eq!(model.methods_named("OrderRepo", "Get").len(), 1);
    }
}
