//! C# language adapter
//!
//! Grammar handle plus the syntax helpers the model and binder use to read
//! declarations, parameters, `using` directives and invocations out of
//! tree-sitter-c-sharp trees.

use std::sync::OnceLock;

use regex::Regex;
use tree_sitter::{Language, Node};

use super::framework::{LanguageAdapter, SourceDocument};
use crate::scope::UsingDirective;

/// C# language adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpAdapter;

impl LanguageAdapter for CSharpAdapter {
    fn language_name(&self) -> &str {
        "C#"
    }

    fn file_extensions(&self) -> &[&str] {
        &["cs"]
    }

    fn language(&self) -> Language {
        tree_sitter_c_sharp::LANGUAGE.into()
    }
}

/// Node kinds that declare a named type
pub const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "record_declaration",
    "record_struct_declaration",
    "enum_declaration",
];

pub fn is_type_declaration(kind: &str) -> bool {
    TYPE_DECLARATIONS.contains(&kind)
}

/// The `name` of a declaration, falling back to its first identifier
pub fn name_node<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(name);
    }
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == "identifier");
    found
}

/// Names of the type parameters declared on a type or method
pub fn type_parameters(doc: &SourceDocument, node: Node) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(list) = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "type_parameter_list")
    else {
        return Vec::new();
    };

    let mut list_cursor = list.walk();
    list.named_children(&mut list_cursor)
        .filter(|c| c.kind() == "type_parameter")
        .filter_map(|param| {
            let name = param.child_by_field_name("name").or_else(|| {
                let mut c = param.walk();
                let last = param
                    .named_children(&mut c)
                    .filter(|n| n.kind() == "identifier")
                    .last();
                last
            })?;
            Some(doc.text(name).to_string())
        })
        .collect()
}

/// Type nodes listed in a declaration's base list
pub fn base_types<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let Some(list) = node.named_children(&mut cursor).find(|c| c.kind() == "base_list") else {
        return Vec::new();
    };

    let mut list_cursor = list.walk();
    list.named_children(&mut list_cursor)
        .filter_map(|entry| match entry.kind() {
            "argument_list" | "comment" => None,
            // Record primary constructor base: `: Base(args)`
            "primary_constructor_base_type" => entry.child_by_field_name("type").or_else(|| entry.named_child(0)),
            _ => Some(entry),
        })
        .collect()
}

/// Whether a declaration carries a modifier keyword such as `static`
pub fn has_modifier(doc: &SourceDocument, node: Node, word: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| (c.kind() == "modifier" || c.kind() == word) && doc.text(c) == word);
    found
}

fn using_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(global\s+)?using\s+(static\s+)?(?:([@\w]+)\s*=\s*)?([^;]+?)\s*;")
            .expect("static regex")
    })
}

/// Parse the text of a `using` directive; the flag is true for
/// `global using`
pub fn parse_using(text: &str) -> Option<(bool, UsingDirective)> {
    let caps = using_regex().captures(text)?;
    let global = caps.get(1).is_some();
    let target = strip_global(caps.get(4)?.as_str());
    let directive = if let Some(alias) = caps.get(3) {
        UsingDirective::Alias {
            alias: alias.as_str().trim_start_matches('@').to_string(),
            target,
        }
    } else if caps.get(2).is_some() {
        UsingDirective::Static(target)
    } else {
        UsingDirective::Namespace(target)
    };
    Some((global, directive))
}

fn strip_global(target: &str) -> String {
    let compact: String = target.split_whitespace().collect::<Vec<_>>().join(" ");
    compact.strip_prefix("global::").unwrap_or(&compact).to_string()
}

/// Name of a namespace declaration, without whitespace
pub fn namespace_name(doc: &SourceDocument, node: Node) -> Option<String> {
    let name = node.child_by_field_name("name").or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| matches!(c.kind(), "identifier" | "qualified_name"));
        found
    })?;
    Some(doc.text(name).split_whitespace().collect())
}

/// A method parameter as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSyntax {
    pub name: String,
    /// Declared type text; `None` for implicitly typed lambda parameters
    pub type_text: Option<String>,
    /// `ref`, `out`, `in` or `params`
    pub modifier: Option<String>,
    /// First parameter of an extension method
    pub is_this: bool,
    pub has_default: bool,
}

impl ParamSyntax {
    pub fn is_params(&self) -> bool {
        self.modifier.as_deref() == Some("params")
    }
}

/// Parameters of a `parameter_list` node
pub fn parameters(doc: &SourceDocument, list: Node) -> Vec<ParamSyntax> {
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter(|c| matches!(c.kind(), "parameter" | "parameter_array"))
        .filter_map(|param| parameter(doc, param))
        .collect()
}

fn parameter(doc: &SourceDocument, node: Node) -> Option<ParamSyntax> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();

    let name = node.child_by_field_name("name").or_else(|| {
        children
            .iter()
            .rev()
            .find(|c| c.kind() == "identifier")
            .copied()
    })?;

    let type_node = node.child_by_field_name("type").or_else(|| {
        children
            .iter()
            .filter(|c| c.is_named() && c.id() != name.id())
            .find(|c| !matches!(c.kind(), "attribute_list" | "modifier" | "equals_value_clause"))
            .copied()
    });

    // Keywords written before the type
    let type_start = type_node.map(|t| t.start_byte()).unwrap_or_else(|| name.start_byte());
    let words: Vec<&str> = children
        .iter()
        .filter(|c| c.end_byte() <= type_start && c.kind() != "attribute_list")
        .flat_map(|c| doc.text(*c).split_whitespace())
        .collect();

    let is_this = words.contains(&"this");
    let modifier = words
        .iter()
        .find(|w| matches!(**w, "ref" | "out" | "in" | "params"))
        .map(|w| w.to_string())
        .or_else(|| (node.kind() == "parameter_array").then(|| "params".to_string()));

    let has_default = children
        .iter()
        .any(|c| c.kind() == "=" || c.kind() == "equals_value_clause");

    Some(ParamSyntax {
        name: doc.text(name).trim_start_matches('@').to_string(),
        type_text: type_node.map(|t| doc.text(t).to_string()),
        modifier,
        is_this,
        has_default,
    })
}

/// The declared return type of a method
pub fn return_type<'t>(node: Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("returns")
        .or_else(|| node.child_by_field_name("type"))
}

/// The parameter list of a method, constructor, lambda or local function
pub fn parameter_list<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if let Some(list) = node.child_by_field_name("parameters") {
        return Some(list);
    }
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == "parameter_list");
    found
}

/// Names and initializers of the declarators in a `variable_declaration`
pub fn variable_declarators<'t>(doc: &SourceDocument, declaration: Node<'t>) -> Vec<(String, Option<Node<'t>>)> {
    let mut cursor = declaration.walk();
    declaration
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "variable_declarator")
        .filter_map(|declarator| {
            let name = name_node(declarator)?;
            Some((doc.text(name).to_string(), initializer(declarator)))
        })
        .collect()
}

/// Expression after `=` in a declarator
pub fn initializer(declarator: Node) -> Option<Node> {
    let mut cursor = declarator.walk();
    let children: Vec<Node> = declarator.children(&mut cursor).collect();
    if let Some(clause) = children.iter().find(|c| c.kind() == "equals_value_clause") {
        return clause.named_child(0);
    }
    let eq = children.iter().position(|c| c.kind() == "=")?;
    children[eq + 1..].iter().find(|c| c.is_named()).copied()
}

/// The `variable_declaration` child of a field, local or `using` statement
pub fn variable_declaration(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "variable_declaration");
    found
}

/// Expressions passed to an invocation, in order
pub fn invocation_arguments<'t>(invocation: Node<'t>) -> Vec<Node<'t>> {
    let list = invocation.child_by_field_name("arguments").or_else(|| {
        let mut cursor = invocation.walk();
        let found = invocation
            .named_children(&mut cursor)
            .find(|c| c.kind() == "argument_list");
        found
    });
    let Some(list) = list else {
        return Vec::new();
    };

    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter(|c| c.kind() == "argument")
        .filter_map(|arg| {
            let mut c = arg.walk();
            let last = arg.named_children(&mut c).last();
            last
        })
        .collect()
}

/// The invoked expression of an invocation
pub fn invocation_function(invocation: Node) -> Option<Node> {
    invocation
        .child_by_field_name("function")
        .or_else(|| invocation.named_child(0))
}

/// Built-in type of a literal expression
pub fn literal_type(kind: &str) -> Option<&'static str> {
    match kind {
        "integer_literal" => Some("int"),
        "real_literal" => Some("double"),
        "boolean_literal" => Some("bool"),
        "character_literal" => Some("char"),
        "string_literal" | "verbatim_string_literal" | "raw_string_literal"
        | "interpolated_string_expression" => Some("string"),
        _ => None,
    }
}
