//! Binder - static, best-effort binding of invocations and base lists
//!
//! Resolves each `invocation_expression` inside a method declaration to the
//! workspace method it calls, typing receivers from locals, parameters,
//! members, creations, casts and the return types of other bound calls.
//! Calls that do not bind to a workspace method are counted and dropped.

use std::collections::HashSet;
use std::fmt;

use tree_sitter::Node;

use crate::adapter::csharp::{
    invocation_arguments, invocation_function, literal_type, parameter_list, parameters, variable_declaration,
    variable_declarators,
};
use crate::adapter::{line_of, SourceDocument};
use crate::edge::{RelationshipKind, SymbolRelationship};
use crate::model::{Declared, MethodDecl, MethodId, SemanticModel, Ty, TypeKind};
use crate::scope::{ScopeId, TypeRef};

const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BindStats {
    pub bound: usize,
    pub unbound: usize,
    pub total: usize,
}

impl BindStats {
    pub fn merge(&mut self, other: BindStats) {
        self.bound += other.bound;
        self.unbound += other.unbound;
        self.total += other.total;
    }
}

impl fmt::Display for BindStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Binder Stats:")?;
        writeln!(f, "  Total Invocations: {}", self.total)?;
        writeln!(f, "  ✅ Bound: {}", self.bound)?;
        write!(f, "  🌍 Unbound: {}", self.unbound)
    }
}

/// A bound call from one workspace method to another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub caller: MethodId,
    pub callee: MethodId,
    pub line: u32,
}

/// The method an expression is evaluated in
#[derive(Clone, Copy)]
struct CallContext<'a> {
    id: MethodId,
    method: &'a MethodDecl,
    declaration: Node<'a>,
}

impl CallContext<'_> {
    fn scope(&self) -> ScopeId {
        self.method.scope
    }
}

/// Binds the invocations of one document
pub struct Binder<'a> {
    model: &'a SemanticModel,
    doc: &'a SourceDocument,
    doc_index: usize,
}

impl<'a> Binder<'a> {
    pub fn new(model: &'a SemanticModel, doc: &'a SourceDocument, doc_index: usize) -> Self {
        Self { model, doc, doc_index }
    }

    /// Every bound call in the document, in source order
    pub fn calls(&self) -> (Vec<CallSite>, BindStats) {
        let mut calls = Vec::new();
        let mut stats = BindStats::default();
        self.walk(self.doc.tree.root_node(), &mut calls, &mut stats);
        (calls, stats)
    }

    /// Pre-order walk with an explicit stack; generated code can nest
    /// expressions far deeper than a worker thread's stack allows
    fn walk(&self, root: Node<'a>, calls: &mut Vec<CallSite>, stats: &mut BindStats) {
        let mut stack: Vec<(Node<'a>, Option<CallContext<'a>>)> = vec![(root, None)];

        while let Some((node, context)) = stack.pop() {
            let context = if node.kind() == "method_declaration" {
                match self.model.declared_at(self.doc_index, node) {
                    Some(Declared::Method(id)) => Some(CallContext {
                        id: *id,
                        method: self.model.method(*id),
                        declaration: node,
                    }),
                    _ => None,
                }
            } else {
                context
            };

            if node.kind() == "invocation_expression" {
                self.record(node, context, calls, stats);
            }

            let mut cursor = node.walk();
            let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, context)));
        }
    }

    fn record(&self, node: Node<'a>, context: Option<CallContext<'a>>, calls: &mut Vec<CallSite>, stats: &mut BindStats) {
        stats.total += 1;
        let bound = context.and_then(|ctx| {
            let (callee, _) = self.bind_invocation(node, &ctx, 0)?;
            Some(CallSite {
                caller: ctx.id,
                callee,
                line: line_of(node),
            })
        });
        match bound {
            Some(call) => {
                stats.bound += 1;
                calls.push(call);
            }
            None => {
                stats.unbound += 1;
                tracing::trace!(
                    "Unbound invocation `{}` at {}:{}",
                    self.doc.text(node).lines().next().unwrap_or(""),
                    self.doc.path,
                    line_of(node)
                );
            }
        }
    }

    /// Bind an invocation; also returns the receiver type used, for
    /// substituting type arguments into the return type
    fn bind_invocation(&self, invocation: Node<'a>, ctx: &CallContext<'a>, depth: usize) -> Option<(MethodId, Option<Ty>)> {
        if depth > MAX_DEPTH {
            return None;
        }
        let function = invocation_function(invocation)?;
        let args: Vec<Option<Ty>> = invocation_arguments(invocation)
            .into_iter()
            .map(|arg| self.infer(arg, ctx, depth + 1))
            .collect();

        match function.kind() {
            "identifier" | "generic_name" => {
                let (name, explicit) = self.name_and_type_args(function);
                let scope = ctx.scope();
                for owner in self.model.scopes().enclosing_types(scope) {
                    let this = self.this_ty(owner);
                    let candidates = self.model.methods_named(owner, &name);
                    if let Some(id) = self.pick(&candidates, &args, explicit, None) {
                        return Some((id, Some(this)));
                    }
                }
                for owner in self.model.resolver().static_using_types(scope) {
                    let candidates = self.model.methods_named(&owner, &name);
                    if let Some(id) = self.pick(&candidates, &args, explicit, None) {
                        return Some((id, None));
                    }
                }
                None
            }
            "member_access_expression" => {
                let receiver = function.child_by_field_name("expression")?;
                let name_node = function.child_by_field_name("name")?;
                let (name, explicit) = self.name_and_type_args(name_node);
                let receiver = self.infer(receiver, ctx, depth + 1);
                self.bind_member(receiver, &name, explicit, &args, ctx)
            }
            "member_binding_expression" => {
                let name_node = function.child_by_field_name("name").or_else(|| function.named_child(0))?;
                let (name, explicit) = self.name_and_type_args(name_node);
                let receiver = conditional_receiver(function).and_then(|r| self.infer(r, ctx, depth + 1));
                self.bind_member(receiver, &name, explicit, &args, ctx)
            }
            "conditional_access_expression" => {
                let condition = function.child_by_field_name("condition").or_else(|| function.named_child(0))?;
                let binding = last_named_child(function).filter(|b| b.kind() == "member_binding_expression")?;
                let name_node = binding.child_by_field_name("name").or_else(|| binding.named_child(0))?;
                let (name, explicit) = self.name_and_type_args(name_node);
                let receiver = self.infer(condition, ctx, depth + 1);
                self.bind_member(receiver, &name, explicit, &args, ctx)
            }
            _ => None,
        }
    }

    fn bind_member(
        &self,
        receiver: Option<Ty>,
        name: &str,
        explicit: usize,
        args: &[Option<Ty>],
        ctx: &CallContext,
    ) -> Option<(MethodId, Option<Ty>)> {
        if let Some(key) = receiver.as_ref().and_then(Ty::decl_key) {
            let candidates = self.model.methods_named(key, name);
            if let Some(id) = self.pick(&candidates, args, explicit, None) {
                return Some((id, receiver));
            }
        }

        // Extension methods from namespaces in scope
        let namespaces = self.model.scopes().namespaces_in_scope(ctx.scope());
        let candidates: Vec<MethodId> = self
            .model
            .extension_methods(name)
            .iter()
            .copied()
            .filter(|id| {
                let owner = &self.model.method(*id).owner;
                self.model
                    .type_decl(owner)
                    .is_some_and(|decl| namespaces.contains(&decl.namespace))
            })
            .collect();
        let id = self.pick(&candidates, args, explicit, Some(receiver.as_ref()))?;
        Some((id, None))
    }

    /// Choose among overload candidates; `extension` carries the receiver
    /// when the candidates are extension methods
    fn pick(
        &self,
        candidates: &[MethodId],
        args: &[Option<Ty>],
        explicit: usize,
        extension: Option<Option<&Ty>>,
    ) -> Option<MethodId> {
        let offset = usize::from(extension.is_some());
        let mut best: Option<(i32, MethodId)> = None;

        for &id in candidates {
            let method = self.model.method(id);
            if !method.accepts_arity(args.len() + offset) {
                continue;
            }
            if explicit > 0 && method.type_params.len() != explicit {
                continue;
            }

            let mut score = 0;
            if let Some(Some(receiver)) = extension {
                match self.param_match(method, 0, receiver) {
                    Some(true) => score += 2,
                    Some(false) => continue,
                    None => {}
                }
            }
            for (i, arg) in args.iter().enumerate() {
                let Some(arg) = arg else { continue };
                match self.param_match(method, i + offset, arg) {
                    Some(true) => score += 1,
                    Some(false) => score -= 1,
                    None => {}
                }
            }

            if best.is_none_or(|(top, _)| score > top) {
                best = Some((score, id));
            }
        }

        best.map(|(_, id)| id)
    }

    /// Does an argument type fit parameter `index`; `None` when unknown
    fn param_match(&self, method: &MethodDecl, index: usize, arg: &Ty) -> Option<bool> {
        let param = method.params.get(index).or_else(|| method.params.last().filter(|p| p.is_params()))?;
        let declared = self
            .model
            .resolve_ty(method.scope, param.type_ref.as_ref()?, &method.type_params)?;
        // `params T[]` also accepts a single element
        if param.is_params() {
            if let Ty::Array(element) = &declared {
                if let Some(true) = self.ty_matches(arg, element) {
                    return Some(true);
                }
            }
        }
        self.ty_matches(arg, &declared)
    }

    fn ty_matches(&self, arg: &Ty, param: &Ty) -> Option<bool> {
        match (arg, param) {
            (_, Ty::TypeParam(_)) | (Ty::TypeParam(_), _) => None,
            (_, Ty::External { name, .. }) if name == "object" => None,
            (Ty::Decl { key: a, .. }, Ty::Decl { key: p, .. }) => {
                Some(a == p || self.model.resolver().base_chain(a).contains(p))
            }
            (Ty::External { name: a, .. }, Ty::External { name: p, .. }) => {
                if a == p {
                    Some(true)
                } else if is_builtin(a) && is_builtin(p) && !(is_numeric(a) && is_numeric(p)) {
                    Some(false)
                } else {
                    None
                }
            }
            (Ty::External { name, .. }, Ty::Decl { .. }) if is_builtin(name) => Some(false),
            (Ty::Decl { .. }, Ty::External { name, .. }) if is_builtin(name) => Some(false),
            (Ty::Array(a), Ty::Array(p)) => self.ty_matches(a, p),
            _ => None,
        }
    }

    fn name_and_type_args(&self, node: Node) -> (String, usize) {
        if node.kind() == "generic_name" {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            let name = children
                .iter()
                .find(|c| c.kind() == "identifier")
                .map(|c| self.doc.text(*c).to_string())
                .unwrap_or_default();
            let count = children
                .iter()
                .find(|c| c.kind() == "type_argument_list")
                .map(|list| list.named_child_count())
                .unwrap_or(0);
            (name, count)
        } else {
            (self.doc.text(node).trim_start_matches('@').to_string(), 0)
        }
    }

    fn this_ty(&self, key: &str) -> Ty {
        let args = self
            .model
            .type_decl(key)
            .map(|d| d.type_params.iter().map(|p| Ty::TypeParam(p.clone())).collect())
            .unwrap_or_default();
        Ty::Decl {
            key: key.to_string(),
            args,
        }
    }

    fn resolve_written(&self, text: &str, ctx: &CallContext) -> Option<Ty> {
        self.model
            .resolve_ty(ctx.scope(), &TypeRef::parse(text), &ctx.method.type_params)
    }

    /// Return type of a bound method, with the receiver's type arguments
    /// substituted
    fn return_ty(&self, id: MethodId, receiver: Option<&Ty>) -> Option<Ty> {
        let method = self.model.method(id);
        let written = method.return_type.as_ref()?;
        if matches!(written, TypeRef::Predefined(name) if name == "void") {
            return None;
        }
        let ty = self.model.resolve_ty(method.scope, written, &method.type_params)?;
        let map = receiver
            .map(|r| self.model.type_args_for(r, &method.owner))
            .unwrap_or_default();
        Some(ty.substitute(&map))
    }

    /// Static type of an expression
    fn infer(&self, expr: Node<'a>, ctx: &CallContext<'a>, depth: usize) -> Option<Ty> {
        if depth > MAX_DEPTH {
            return None;
        }
        if let Some(builtin) = literal_type(expr.kind()) {
            return Some(Ty::External {
                name: builtin.to_string(),
                args: Vec::new(),
            });
        }

        match expr.kind() {
            "this_expression" | "this" => Some(self.this_ty(&ctx.method.owner)),
            "base_expression" | "base" => self.base_class_ty(&ctx.method.owner),
            "object_creation_expression" | "cast_expression" => {
                let ty = expr.child_by_field_name("type")?;
                self.resolve_written(self.doc.text(ty), ctx)
            }
            "as_expression" => {
                let ty = expr.child_by_field_name("right").or_else(|| last_named_child(expr))?;
                self.resolve_written(self.doc.text(ty), ctx)
            }
            "parenthesized_expression" => self.infer(expr.named_child(0)?, ctx, depth + 1),
            "await_expression" => {
                let inner = self.infer(last_named_child(expr)?, ctx, depth + 1)?;
                match inner {
                    Ty::External { name, args } if name == "Task" || name == "ValueTask" => args.into_iter().next(),
                    other => Some(other),
                }
            }
            "identifier" => self.infer_identifier(expr, ctx, depth),
            "member_access_expression" => {
                let receiver = expr.child_by_field_name("expression")?;
                let name = expr.child_by_field_name("name")?;
                if let Some(receiver_ty) = self.infer(receiver, ctx, depth + 1) {
                    if let Some(ty) = self.member_ty(&receiver_ty, self.doc.text(name)) {
                        return Some(ty);
                    }
                }
                // `Ns.Type` or `Outer.Inner` used as a receiver
                self.type_name(self.doc.text(expr), ctx)
            }
            "invocation_expression" => {
                let (id, receiver) = self.bind_invocation(expr, ctx, depth + 1)?;
                self.return_ty(id, receiver.as_ref())
            }
            "generic_name" | "qualified_name" | "predefined_type" => self.type_name(self.doc.text(expr), ctx),
            "element_access_expression" => {
                let target = expr.child_by_field_name("expression").or_else(|| expr.named_child(0))?;
                self.infer(target, ctx, depth + 1)?.element()
            }
            _ => None,
        }
    }

    fn type_name(&self, text: &str, ctx: &CallContext) -> Option<Ty> {
        let written = TypeRef::parse(text);
        let key = self.model.resolver().resolve(ctx.scope(), &written)?;
        Some(Ty::Decl { key, args: Vec::new() })
    }

    fn base_class_ty(&self, key: &str) -> Option<Ty> {
        let decl = self.model.type_decl(key)?;
        decl.bases.iter().find_map(|base| {
            let resolved = base.resolved.as_ref()?;
            let kind = self.model.type_decl(resolved)?.kind;
            if kind == TypeKind::Interface {
                return None;
            }
            self.model.resolve_ty(base.scope, &base.written, &decl.type_params)
        })
    }

    /// Declared type of field or property `name` on a receiver
    fn member_ty(&self, receiver: &Ty, name: &str) -> Option<Ty> {
        let key = receiver.decl_key()?;
        let (member, owner) = self.model.member(key, name)?;
        let ty = self.model.resolve_ty(member.scope, &member.type_ref, &owner.type_params)?;
        Some(ty.substitute(&self.model.type_args_for(receiver, &owner.key)))
    }

    fn infer_identifier(&self, node: Node<'a>, ctx: &CallContext<'a>, depth: usize) -> Option<Ty> {
        let name = self.doc.text(node).trim_start_matches('@');

        if let Some(local) = self.local_ty(node, name, ctx, depth) {
            return local;
        }

        if let Some(param) = ctx.method.params.iter().find(|p| p.name == name) {
            return self
                .model
                .resolve_ty(ctx.scope(), param.type_ref.as_ref()?, &ctx.method.type_params);
        }

        for owner in self.model.scopes().enclosing_types(ctx.scope()) {
            if let Some(ty) = self.member_ty(&self.this_ty(owner), name) {
                return Some(ty);
            }
        }

        // A type name: static member access
        let key = self.model.resolver().resolve(ctx.scope(), &TypeRef::simple(name))?;
        Some(Ty::Decl { key, args: Vec::new() })
    }

    /// Type of a local variable visible at `node`. The outer `Option` says
    /// whether a declaration was found at all (an implicitly typed lambda
    /// parameter shadows everything outside it while having no type).
    fn local_ty(&self, node: Node<'a>, name: &str, ctx: &CallContext<'a>, depth: usize) -> Option<Option<Ty>> {
        let mut child = node;
        while let Some(parent) = child.parent() {
            match parent.kind() {
                "block" | "switch_section" => {
                    let mut cursor = parent.walk();
                    let preceding: Vec<Node<'a>> = parent
                        .named_children(&mut cursor)
                        .take_while(|s| s.end_byte() <= child.start_byte())
                        .collect();
                    for statement in preceding.into_iter().rev() {
                        if statement.kind() != "local_declaration_statement" {
                            continue;
                        }
                        if let Some(found) = self.declared_in(statement, name, ctx, depth) {
                            return Some(found);
                        }
                    }
                }
                "using_statement" | "for_statement" | "fixed_statement" => {
                    if let Some(found) = self.declared_in(parent, name, ctx, depth) {
                        return Some(found);
                    }
                }
                "foreach_statement" => {
                    let left = parent.child_by_field_name("left");
                    if left.is_some_and(|l| self.doc.text(l) == name) {
                        let written = parent.child_by_field_name("type").map(|t| TypeRef::parse(self.doc.text(t)));
                        return Some(match written {
                            Some(ty) if !ty.is_var() => {
                                self.model.resolve_ty(ctx.scope(), &ty, &ctx.method.type_params)
                            }
                            _ => parent
                                .child_by_field_name("right")
                                .and_then(|r| self.infer(r, ctx, depth + 1))
                                .and_then(|t| t.element()),
                        });
                    }
                }
                "catch_clause" => {
                    let mut cursor = parent.walk();
                    let declaration = parent
                        .named_children(&mut cursor)
                        .find(|c| c.kind() == "catch_declaration");
                    if let Some(declaration) = declaration {
                        let named = declaration.child_by_field_name("name");
                        if named.is_some_and(|n| self.doc.text(n) == name) {
                            let ty = declaration.child_by_field_name("type")?;
                            return Some(self.resolve_written(self.doc.text(ty), ctx));
                        }
                    }
                }
                "lambda_expression" | "anonymous_method_expression" | "local_function_statement" => {
                    if let Some(found) = self.lambda_param(parent, name, ctx) {
                        return Some(found);
                    }
                }
                "method_declaration" => break,
                _ => {}
            }
            child = parent;
        }

        self.pattern_variable(ctx.declaration, name, ctx)
    }

    /// `name` declared by a `variable_declaration` under `node`
    fn declared_in(&self, node: Node<'a>, name: &str, ctx: &CallContext<'a>, depth: usize) -> Option<Option<Ty>> {
        let declaration = variable_declaration(node)?;
        let (_, initializer) = variable_declarators(self.doc, declaration)
            .into_iter()
            .find(|(declared, _)| declared == name)?;
        let written = declaration.child_by_field_name("type").map(|t| TypeRef::parse(self.doc.text(t)));
        Some(match written {
            Some(ty) if !ty.is_var() => self.model.resolve_ty(ctx.scope(), &ty, &ctx.method.type_params),
            _ => initializer.and_then(|init| self.infer(init, ctx, depth + 1)),
        })
    }

    fn lambda_param(&self, node: Node<'a>, name: &str, ctx: &CallContext<'a>) -> Option<Option<Ty>> {
        let list = parameter_list(node)?;
        if list.kind() != "parameter_list" {
            // `x => ...` has a single implicitly typed parameter
            return (self.doc.text(list) == name).then_some(None);
        }
        let param = parameters(self.doc, list).into_iter().find(|p| p.name == name)?;
        Some(param.type_text.and_then(|text| self.resolve_written(&text, ctx)))
    }

    /// `out var x`, `is Order o` and friends anywhere in the method
    fn pattern_variable(&self, root: Node<'a>, name: &str, ctx: &CallContext<'a>) -> Option<Option<Ty>> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if matches!(node.kind(), "declaration_expression" | "declaration_pattern") {
                let declared = node
                    .child_by_field_name("name")
                    .or_else(|| node.child_by_field_name("designation"))
                    .map(|n| self.doc.text(n));
                if declared == Some(name) {
                    let ty = node.child_by_field_name("type").map(|t| TypeRef::parse(self.doc.text(t)));
                    return Some(match ty {
                        Some(ty) if !ty.is_var() => {
                            self.model.resolve_ty(ctx.scope(), &ty, &ctx.method.type_params)
                        }
                        _ => None,
                    });
                }
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        None
    }
}

/// `InheritsFrom` / `Implements` relationships of a class or interface
pub fn inheritance_relationships(model: &SemanticModel, key: &str) -> Vec<SymbolRelationship> {
    let Some(decl) = model.type_decl(key) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut relationships = Vec::new();
    let mut has_base_class = false;

    for base in &decl.bases {
        let target = base.resolved.as_ref().and_then(|k| model.type_decl(k));
        let (name, kind) = match (decl.kind, target) {
            (TypeKind::Interface, Some(target)) => (target.full_name.clone(), RelationshipKind::InheritsFrom),
            (TypeKind::Interface, None) => (base.written.to_string(), RelationshipKind::InheritsFrom),
            (_, Some(target)) => match target.kind {
                TypeKind::Interface => (target.full_name.clone(), RelationshipKind::Implements),
                TypeKind::Class | TypeKind::Record => {
                    has_base_class = true;
                    (target.full_name.clone(), RelationshipKind::InheritsFrom)
                }
                TypeKind::Struct | TypeKind::Enum => continue,
            },
            (_, None) => {
                let written = base.written.to_string();
                if looks_like_interface(&written) || has_base_class {
                    (written, RelationshipKind::Implements)
                } else {
                    has_base_class = true;
                    (written, RelationshipKind::InheritsFrom)
                }
            }
        };
        if seen.insert(name.clone()) {
            relationships.push(SymbolRelationship::new(name, kind));
        }
    }
    relationships
}

/// `IThing`, `Shop.IThing<T>`: `I` followed by an uppercase letter
fn looks_like_interface(name: &str) -> bool {
    let last = name.split('<').next().unwrap_or(name);
    let last = last.rsplit('.').next().unwrap_or(last);
    let mut chars = last.chars();
    chars.next() == Some('I') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "bool" | "byte" | "sbyte" | "char" | "decimal" | "double" | "float" | "int" | "uint" | "long" | "ulong"
            | "short" | "ushort" | "string" | "nint" | "nuint"
    )
}

fn is_numeric(name: &str) -> bool {
    is_builtin(name) && !matches!(name, "bool" | "string")
}

fn last_named_child(node: Node) -> Option<Node> {
    let count = node.named_child_count();
    if count == 0 {
        None
    } else {
        node.named_child(count - 1)
    }
}

/// Condition of the `?.` access a member binding belongs to
fn conditional_receiver(binding: Node) -> Option<Node> {
    let mut current = binding.parent();
    while let Some(node) = current {
        if node.kind() == "conditional_access_expression" {
            return node.child_by_field_name("condition").or_else(|| node.named_child(0));
        }
        current = node.parent();
    }
    None
}
