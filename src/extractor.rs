//! Extractor - turns a workspace into a [`CodeGraph`]
//!
//! Pipeline:
//! 1. Load the projects named by a manifest into one workspace
//! 2. Parse every document (parallel, order preserved)
//! 3. Build the semantic model over all documents
//! 4. Pass 1: declare Class, Interface and Method symbols
//! 5. Pass 2: attach Calls (and inheritance) relationships
//!
//! Pass 2 starts only after pass 1 has finished for every document of every
//! project, so callers are always in the table when their calls are bound.

use std::path::Path;

use crossbeam::channel::{self, Sender};
use tree_sitter::Node;

use crate::adapter::csharp::name_node;
use crate::adapter::{line_of, parse_documents, CSharpAdapter, SourceDocument};
use crate::binder::{inheritance_relationships, BindStats, Binder, CallSite};
use crate::config::default_jobs;
use crate::edge::SymbolRelationship;
use crate::graph::{CodeGraph, GraphStats};
use crate::model::{Declared, SemanticModel, TypeKind};
use crate::symbol::{CodeSymbol, SymbolKind};
use crate::ui::{ProgressMessage, ProgressPhase};
use crate::workspace::{Workspace, WorkspaceDiagnostic};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Worker threads for parsing and binding
    pub jobs: usize,
    /// Record `InheritsFrom` / `Implements` relationships
    pub inheritance_edges: bool,
    /// Extra ignore patterns for document discovery
    pub excludes: Vec<String>,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            inheritance_edges: true,
            excludes: Vec::new(),
        }
    }
}

/// What an extraction run did, besides producing the graph
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub projects: usize,
    pub documents: usize,
    /// Symbols dropped because their full name was already recorded
    pub duplicates: usize,
    /// Calls dropped because the calling method is not a graph symbol
    pub orphan_calls: usize,
    pub binding: BindStats,
    pub stats: GraphStats,
    pub diagnostics: Vec<WorkspaceDiagnostic>,
}

pub struct Extractor {
    options: ExtractorOptions,
    progress: Option<Sender<ProgressMessage>>,
}

impl Extractor {
    pub fn new(options: ExtractorOptions) -> Self {
        Self {
            options,
            progress: None,
        }
    }

    /// Report phase progress over `tx`
    pub fn with_progress(mut self, tx: Sender<ProgressMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Load the projects listed in `manifest` and extract their graph.
    ///
    /// Failing to read the manifest is fatal; missing or broken projects
    /// are logged and reported as diagnostics.
    pub fn run(&self, manifest: &Path) -> Result<(CodeGraph, ExtractionReport)> {
        let workspace = Workspace::from_manifest(manifest, self.options.excludes.clone())?;
        self.extract(&workspace)
    }

    /// Extract the graph of an already loaded workspace
    pub fn extract(&self, workspace: &Workspace) -> Result<(CodeGraph, ExtractionReport)> {
        let references = workspace.documents();
        tracing::info!(
            "Extracting {} document(s) from {} project(s)",
            references.len(),
            workspace.projects().len()
        );

        let parsed = parse_documents(&CSharpAdapter, &references, self.options.jobs, self.progress.as_ref())?;
        let mut report = ExtractionReport {
            projects: workspace.projects().len(),
            documents: parsed.documents.len(),
            diagnostics: workspace.diagnostics().to_vec(),
            ..ExtractionReport::default()
        };
        report.diagnostics.extend(parsed.diagnostics);

        let model = SemanticModel::build(&parsed.documents);
        let mut graph = CodeGraph::new();

        report.duplicates = self.declare(&model, &parsed.documents, &mut graph);
        let (binding, orphans) = self.link(&model, &parsed.documents, &mut graph)?;
        report.binding = binding;
        report.orphan_calls = orphans;
        report.stats = graph.stats();

        tracing::info!(
            "Extracted {} symbol(s) and {} relationship(s) ({} of {} invocation(s) bound)",
            report.stats.symbols,
            report.stats.relationships(),
            binding.bound,
            binding.total
        );
        Ok((graph, report))
    }

    fn send(&self, message: ProgressMessage) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(message);
        }
    }

    /// Pass 1. Returns how many duplicate symbols were dropped.
    fn declare(&self, model: &SemanticModel, documents: &[SourceDocument], graph: &mut CodeGraph) -> usize {
        self.send(ProgressMessage::Started {
            phase: ProgressPhase::Declaring,
            total: documents.len(),
        });

        let mut duplicates = 0;
        for (index, doc) in documents.iter().enumerate() {
            let mut symbols = Vec::new();
            collect_declarations(model, doc, index, doc.tree.root_node(), &mut symbols);
            for symbol in symbols {
                let name = symbol.full_name.clone();
                if !graph.insert(symbol) {
                    tracing::debug!("Duplicate symbol {} in {} ignored", name, doc.path);
                    duplicates += 1;
                }
            }
            self.send(ProgressMessage::Progress {
                phase: ProgressPhase::Declaring,
                current: index + 1,
                file: None,
            });
        }

        self.send(ProgressMessage::Finished {
            phase: ProgressPhase::Declaring,
        });
        duplicates
    }

    /// Pass 2. Documents are bound in parallel; edges are appended in
    /// document order.
    fn link(
        &self,
        model: &SemanticModel,
        documents: &[SourceDocument],
        graph: &mut CodeGraph,
    ) -> Result<(BindStats, usize)> {
        self.send(ProgressMessage::Started {
            phase: ProgressPhase::Linking,
            total: documents.len(),
        });

        if self.options.inheritance_edges {
            for decl in model.types() {
                if !matches!(decl.kind, TypeKind::Class | TypeKind::Interface) || !graph.contains(&decl.full_name) {
                    continue;
                }
                for relationship in inheritance_relationships(model, &decl.key) {
                    graph.add_relationship(&decl.full_name, relationship);
                }
            }
        }

        let per_document = self.bind_all(model, documents)?;

        let mut stats = BindStats::default();
        let mut orphans = 0;
        for (doc, (calls, doc_stats)) in documents.iter().zip(per_document) {
            stats.merge(doc_stats);
            for call in calls {
                let caller = &model.method(call.caller).full_name;
                let callee = &model.method(call.callee).full_name;
                if !graph.add_relationship(caller, SymbolRelationship::calls(callee.clone())) {
                    tracing::trace!("Caller {} is not a graph symbol ({}:{})", caller, doc.path, call.line);
                    orphans += 1;
                }
            }
        }

        self.send(ProgressMessage::Finished {
            phase: ProgressPhase::Linking,
        });
        tracing::debug!("Binding results:\n{}", stats);
        Ok((stats, orphans))
    }

    fn bind_all(&self, model: &SemanticModel, documents: &[SourceDocument]) -> Result<Vec<(Vec<CallSite>, BindStats)>> {
        let jobs = self.options.jobs.clamp(1, documents.len().max(1));
        let (work_tx, work_rx) = channel::unbounded::<usize>();
        for index in 0..documents.len() {
            let _ = work_tx.send(index);
        }
        drop(work_tx);

        let (result_tx, result_rx) = channel::unbounded::<(usize, (Vec<CallSite>, BindStats))>();

        let slots = crossbeam::thread::scope(|s| {
            for _ in 0..jobs {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move |_| {
                    for index in work_rx.iter() {
                        let bound = Binder::new(model, &documents[index], index).calls();
                        if result_tx.send((index, bound)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            let mut slots: Vec<(Vec<CallSite>, BindStats)> = (0..documents.len()).map(|_| Default::default()).collect();
            for (count, (index, bound)) in result_rx.iter().enumerate() {
                self.send(ProgressMessage::Progress {
                    phase: ProgressPhase::Linking,
                    current: count + 1,
                    file: Path::new(&documents[index].path)
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string()),
                });
                slots[index] = bound;
            }
            slots
        })
        .map_err(|_| Error::Worker("binder worker panicked".to_string()))?;

        Ok(slots)
    }
}

/// Class symbols with the methods declared directly in their body, and
/// interface symbols, in source order
fn collect_declarations(
    model: &SemanticModel,
    doc: &SourceDocument,
    doc_index: usize,
    root: Node,
    symbols: &mut Vec<CodeSymbol>,
) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let kind = match node.kind() {
            "class_declaration" => Some(SymbolKind::Class),
            "interface_declaration" => Some(SymbolKind::Interface),
            _ => None,
        };

        if let Some(kind) = kind {
            match declared_type(model, doc_index, node) {
                Some(full_name) => {
                    let line = name_node(node).map(line_of).unwrap_or_else(|| line_of(node));
                    symbols.push(CodeSymbol::new(full_name, kind, Some(&doc.path), line));
                    if kind == SymbolKind::Class {
                        collect_methods(model, doc, doc_index, node, symbols);
                    }
                }
                None => tracing::debug!("Unbound {} at {}:{}", node.kind(), doc.path, line_of(node)),
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

fn collect_methods(
    model: &SemanticModel,
    doc: &SourceDocument,
    doc_index: usize,
    class: Node,
    symbols: &mut Vec<CodeSymbol>,
) {
    let Some(body) = class
        .child_by_field_name("body")
        .or_else(|| {
            let mut cursor = class.walk();
            let found = class.named_children(&mut cursor).find(|c| c.kind() == "declaration_list");
            found
        })
    else {
        return;
    };

    let mut cursor = body.walk();
    let members: Vec<Node> = body.named_children(&mut cursor).collect();
    for member in members.into_iter().filter(|m| m.kind() == "method_declaration") {
        if let Some(Declared::Method(id)) = model.declared_at(doc_index, member) {
            let method = model.method(*id);
            symbols.push(CodeSymbol::new(
                method.full_name.clone(),
                SymbolKind::Method,
                Some(&doc.path),
                method.line,
            ));
        }
    }
}

fn declared_type(model: &SemanticModel, doc_index: usize, node: Node) -> Option<String> {
    match model.declared_at(doc_index, node)? {
        Declared::Type(key) => model.type_decl(key).map(|d| d.full_name.clone()),
        Declared::Method(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::RelationshipKind;
    use std::fs;

    fn project(dir: &Path, files: &[(&str, &str)]) -> std::path::PathBuf {
        let csproj = dir.join("App.csproj");
        fs::write(&csproj, "<Project Sdk=\"Microsoft.NET.Sdk\"></Project>").unwrap();
        for (name, source) in files {
            fs::write(dir.join(name), source).unwrap();
        }
        let manifest = dir.join("projects.txt");
        fs::write(&manifest, "App.csproj\n").unwrap();
        manifest
    }

    fn options() -> ExtractorOptions {
        ExtractorOptions {
            jobs: 2,
            ..ExtractorOptions::default()
        }
    }

    #[test]
    fn test_declarations_and_calls() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = project(
            dir.path(),
            &[
                ("A.cs", "class A { void Foo() { new B().Bar(); } }"),
                ("B.cs", "class B { void Bar() {} }"),
            ],
        );

        let (graph, report) = Extractor::new(options()).run(&manifest).unwrap();
        let names: Vec<&str> = graph.symbols().iter().map(|s| s.full_name.as_str()).collect();
        assert_eq!(names, vec!["A", "A.Foo()", "B", "B.Bar()"]);

        let foo = graph.get("A.Foo()").unwrap();
        assert_eq!(foo.kind, SymbolKind::Method);
        assert_eq!(foo.relationships, vec![SymbolRelationship::calls("B.Bar()")]);
        assert!(foo.file_path.ends_with("A.cs"));
        assert_eq!(report.projects, 1);
        assert_eq!(report.documents, 2);
        assert_eq!(report.binding.bound, 1);
    }

    #[test]
    fn test_only_class_methods_are_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = project(
            dir.path(),
            &[(
                "Shapes.cs",
                r#"
namespace Geo {
    interface IShape { double Area(); }
    struct Point { public void Move() {} }
    record Tag(string Name) { public void Print() {} }
    class Circle : IShape {
        public double Area() => 3.14;
        class Cache { void Reset() {} }
        Circle() { Area(); }
    }
}"#,
            )],
        );

        let (graph, _) = Extractor::new(options()).run(&manifest).unwrap();
        let names: Vec<&str> = graph.symbols().iter().map(|s| s.full_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Geo.IShape", "Geo.Circle", "Geo.Circle.Area()", "Geo.Circle.Cache", "Geo.Circle.Cache.Reset()"]
        );
        assert_eq!(graph.get("Geo.IShape").unwrap().kind, SymbolKind::Interface);
        assert_eq!(
            graph.get("Geo.Circle").unwrap().relationships,
            vec![SymbolRelationship::new("Geo.IShape", RelationshipKind::Implements)]
        );
        // The constructor call has no method symbol to hang off
        assert!(graph.get("Geo.Circle.Area()").unwrap().relationships.is_empty());
    }

    #[test]
    fn test_inheritance_edges_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = project(dir.path(), &[("X.cs", "class Base {} class Derived : Base, IFoo {}")]);

        let (graph, _) = Extractor::new(ExtractorOptions {
            inheritance_edges: false,
            ..options()
        })
        .run(&manifest)
        .unwrap();
        assert!(graph.get("Derived").unwrap().relationships.is_empty());

        let (graph, _) = Extractor::new(options()).run(&manifest).unwrap();
        assert_eq!(graph.get("Derived").unwrap().relationships.len(), 2);
    }

    #[test]
    fn test_partial_class_declared_once() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = project(
            dir.path(),
            &[
                ("P1.cs", "partial class P { void One() { Two(); } }"),
                ("P2.cs", "partial class P { void Two() {} }"),
            ],
        );

        let (graph, report) = Extractor::new(options()).run(&manifest).unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(report.duplicates, 1);
        assert!(graph.get("P").unwrap().file_path.ends_with("P1.cs"));
        assert_eq!(graph.get("P.One()").unwrap().relationships, vec![SymbolRelationship::calls("P.Two()")]);
    }

    #[test]
    fn test_deeply_nested_expression() {
        let dir = tempfile::tempdir().unwrap();
        let concat = vec!["\"a\""; 20_000].join(" + ");
        let source = format!(
            "class Gen {{ void Build() {{ var s = {concat}; Flush(); }} void Flush() {{}} }}\nclass Tail {{ }}"
        );
        let manifest = project(dir.path(), &[("Gen.cs", source.as_str())]);

        // Declaration collection runs on the calling thread
        let run = std::thread::Builder::new()
            .stack_size(512 * 1024)
            .spawn(move || Extractor::new(options()).run(&manifest).unwrap())
            .unwrap();
        let (graph, report) = run.join().unwrap();

        let names: Vec<&str> = graph.symbols().iter().map(|s| s.full_name.as_str()).collect();
        assert_eq!(names, vec!["Gen", "Gen.Build()", "Gen.Flush()", "Tail"]);
        assert_eq!(
            graph.get("Gen.Build()").unwrap().relationships,
            vec![SymbolRelationship::calls("Gen.Flush()")]
        );
        assert_eq!(report.binding.total, 1);
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = Extractor::new(options()).run(&dir.path().join("nope.txt"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
