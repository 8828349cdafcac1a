//! End-to-end tests: throwaway C# projects on disk, driven through the
//! library and the `codegraph` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use codegraph::workspace::DiagnosticKind;
use codegraph::{
    CodeGraph, Error, Extractor, ExtractorOptions, QueryEngine, RelationshipKind, SymbolKind,
    SymbolRelationship,
};
use tempfile::TempDir;

const EMPTY_PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk"></Project>"#;

/// Temporary directory holding projects and a manifest
struct Fixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    /// Write `<name>/<name>.csproj` with the given project references
    fn project(&self, name: &str, references: &[&str]) -> PathBuf {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let contents = if references.is_empty() {
            EMPTY_PROJECT.to_string()
        } else {
            let items: String = references
                .iter()
                .map(|r| format!("    <ProjectReference Include=\"..\\{r}\\{r}.csproj\" />\n"))
                .collect();
            format!("<Project Sdk=\"Microsoft.NET.Sdk\">\n  <ItemGroup>\n{items}  </ItemGroup>\n</Project>\n")
        };
        let path = dir.join(format!("{name}.csproj"));
        fs::write(&path, contents).unwrap();
        path
    }

    fn source(&self, project: &str, file: &str, code: &str) -> String {
        let path = self.root.join(project).join(file);
        fs::write(&path, code).unwrap();
        path.to_string_lossy().to_string()
    }

    fn manifest(&self, entries: &[&str]) -> PathBuf {
        let path = self.root.join("projects.txt");
        fs::write(&path, entries.join("\n")).unwrap();
        path
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

fn options() -> ExtractorOptions {
    ExtractorOptions {
        jobs: 2,
        ..ExtractorOptions::default()
    }
}

/// The two-file project used by most scenarios; returns (A.cs, B.cs)
fn scenario_project(fixture: &Fixture) -> (String, String) {
    fixture.project("App", &[]);
    let a = fixture.source("App", "A.cs", "class A { void Foo() { new B().Bar(); } }\n");
    let b = fixture.source("App", "B.cs", "class B { void Bar() {} }\n");
    (a, b)
}

fn names(graph: &CodeGraph) -> Vec<&str> {
    graph.symbols().iter().map(|s| s.full_name.as_str()).collect()
}

#[test]
fn test_index_declares_symbols_and_call_edge() {
    let fixture = Fixture::new();
    let (a, b) = scenario_project(&fixture);
    let manifest = fixture.manifest(&["App/App.csproj"]);

    let (graph, report) = Extractor::new(options()).run(&manifest).unwrap();

    assert_eq!(names(&graph), vec!["A", "A.Foo()", "B", "B.Bar()"]);
    assert_eq!(graph.get("A").unwrap().kind, SymbolKind::Class);
    assert_eq!(graph.get("B.Bar()").unwrap().kind, SymbolKind::Method);
    assert_eq!(graph.get("A").unwrap().file_path, a);
    assert_eq!(graph.get("B.Bar()").unwrap().file_path, b);
    assert_eq!(graph.get("A.Foo()").unwrap().line_number, 1);

    let foo = graph.get("A.Foo()").unwrap();
    assert_eq!(foo.relationships, vec![SymbolRelationship::calls("B.Bar()")]);
    assert!(graph.get("B.Bar()").unwrap().relationships.is_empty());

    assert_eq!(report.projects, 1);
    assert_eq!(report.documents, 2);
    assert_eq!(report.binding.bound, 1);
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_query_returns_callers_of_seed() {
    let fixture = Fixture::new();
    let (a, b) = scenario_project(&fixture);
    let manifest = fixture.manifest(&["App/App.csproj"]);
    let (graph, _) = Extractor::new(options()).run(&manifest).unwrap();
    let engine = QueryEngine::new(&graph);

    let related: Vec<String> = engine.related_files(&[b.as_str()]).into_iter().collect();
    let mut expected = vec![a.clone(), b.clone()];
    expected.sort();
    assert_eq!(related, expected);

    let related: Vec<String> = engine.related_files(&[a.as_str()]).into_iter().collect();
    assert_eq!(related, vec![a]);
}

#[test]
fn test_duplicate_manifest_entries_load_once() {
    let fixture = Fixture::new();
    scenario_project(&fixture);

    let once = fixture.manifest(&["App/App.csproj"]);
    let (single, _) = Extractor::new(options()).run(&once).unwrap();

    let twice = fixture.manifest(&["App/App.csproj", "", "# again", "App/App.csproj"]);
    let (double, report) = Extractor::new(options()).run(&twice).unwrap();

    assert_eq!(single.len(), double.len());
    assert_eq!(single, double);
    assert_eq!(report.projects, 1);
    assert_eq!(report.duplicates, 0);
}

#[test]
fn test_transitively_shared_project_loads_once() {
    let fixture = Fixture::new();
    fixture.project("Core", &[]);
    fixture.source("Core", "Clock.cs", "namespace Core { public class Clock { public void Tick() {} } }");
    fixture.project("Api", &["Core"]);
    fixture.project("Jobs", &["Core"]);

    let shared = fixture.manifest(&["Api/Api.csproj", "Jobs/Jobs.csproj", "Core/Core.csproj"]);
    let (graph, report) = Extractor::new(options()).run(&shared).unwrap();
    assert_eq!(report.projects, 3);
    assert_eq!(report.documents, 1);

    let direct = fixture.manifest(&["Core/Core.csproj"]);
    let (alone, _) = Extractor::new(options()).run(&direct).unwrap();
    assert_eq!(graph, alone);
    assert_eq!(names(&graph), vec!["Core.Clock", "Core.Clock.Tick()"]);
}

#[test]
fn test_missing_manifest_entry_is_skipped() {
    let fixture = Fixture::new();
    scenario_project(&fixture);
    let manifest = fixture.manifest(&["Missing/Missing.csproj", "App/App.csproj"]);

    let (graph, report) = Extractor::new(options()).run(&manifest).unwrap();
    assert_eq!(graph.len(), 4);
    assert_eq!(report.projects, 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::MissingProject);

    let output = fixture.path("out/codegraph.json");
    graph.write_to(&output).unwrap();
    assert!(output.is_file());
}

#[test]
fn test_missing_or_empty_graph_is_an_error() {
    let fixture = Fixture::new();

    let missing = fixture.path("nothing.json");
    assert!(matches!(CodeGraph::load(&missing), Err(Error::GraphNotFound(_))));

    let empty_file = fixture.path("blank.json");
    fs::write(&empty_file, "").unwrap();
    assert!(matches!(CodeGraph::load(&empty_file), Err(Error::EmptyGraph(_))));

    let empty_array = fixture.path("empty.json");
    fs::write(&empty_array, "[]").unwrap();
    assert!(matches!(CodeGraph::load(&empty_array), Err(Error::EmptyGraph(_))));
}

#[test]
fn test_calls_resolve_across_project_references() {
    let fixture = Fixture::new();
    fixture.project("Lib", &[]);
    let util = fixture.source(
        "Lib",
        "Util.cs",
        "namespace Lib\n{\n    public class Util\n    {\n        public static int Twice(int x) => x * 2;\n    }\n}\n",
    );
    fixture.project("App", &["Lib"]);
    let program = fixture.source(
        "App",
        "Program.cs",
        "using Lib;\n\nnamespace App\n{\n    class Program\n    {\n        static void Main(string[] args)\n        {\n            var n = Util.Twice(2);\n        }\n    }\n}\n",
    );

    let manifest = fixture.manifest(&["App/App.csproj"]);
    let (graph, report) = Extractor::new(options()).run(&manifest).unwrap();
    assert_eq!(report.projects, 2);

    let main = graph.get("App.Program.Main(string[])").unwrap();
    assert_eq!(main.relationships, vec![SymbolRelationship::calls("Lib.Util.Twice(int)")]);

    let engine = QueryEngine::new(&graph);
    let related: Vec<String> = engine.related_files(&[util.as_str()]).into_iter().collect();
    let mut expected = vec![program, util];
    expected.sort();
    assert_eq!(related, expected);
}

#[test]
fn test_inheritance_edges_and_toggle() {
    let fixture = Fixture::new();
    fixture.project("Zoo", &[]);
    fixture.source(
        "Zoo",
        "Animals.cs",
        "namespace Zoo\n{\n    public interface IFeed { }\n    public interface ICare : IFeed { }\n    public class Animal { }\n    public class Cat : Animal, ICare { }\n}\n",
    );
    let manifest = fixture.manifest(&["Zoo/Zoo.csproj"]);

    let (graph, _) = Extractor::new(options()).run(&manifest).unwrap();
    assert_eq!(
        graph.get("Zoo.Cat").unwrap().relationships,
        vec![
            SymbolRelationship::new("Zoo.Animal", RelationshipKind::InheritsFrom),
            SymbolRelationship::new("Zoo.ICare", RelationshipKind::Implements),
        ]
    );
    assert_eq!(
        graph.get("Zoo.ICare").unwrap().relationships,
        vec![SymbolRelationship::new("Zoo.IFeed", RelationshipKind::InheritsFrom)]
    );
    assert_eq!(graph.get("Zoo.ICare").unwrap().kind, SymbolKind::Interface);

    let disabled = ExtractorOptions {
        inheritance_edges: false,
        ..options()
    };
    let (graph, _) = Extractor::new(disabled).run(&manifest).unwrap();
    assert!(graph.symbols().iter().all(|s| s.relationships.is_empty()));
}

#[test]
fn test_graph_round_trips_through_file() {
    let fixture = Fixture::new();
    scenario_project(&fixture);
    let manifest = fixture.manifest(&["App/App.csproj"]);
    let (graph, _) = Extractor::new(options()).run(&manifest).unwrap();

    let output = fixture.path("codegraph.json");
    graph.write_to(&output).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.trim_start().starts_with('['));
    assert!(text.contains("\"target_symbol_full_name\": \"B.Bar()\""));
    assert!(text.contains("\"kind\": \"Calls\""));

    let loaded = CodeGraph::load(&output).unwrap();
    assert_eq!(loaded, graph);
    assert_eq!(names(&loaded), names(&graph));
}

fn codegraph(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_codegraph"));
    command.current_dir(dir).env("CODEGRAPH_QUIET", "1").env_remove("RUST_LOG");
    command
}

#[test]
fn test_cli_index_then_query() {
    let fixture = Fixture::new();
    let (a, b) = scenario_project(&fixture);
    fixture.manifest(&["App/App.csproj"]);

    let status = codegraph(&fixture.root)
        .args(["index", "projects.txt", "-o", "graph.json"])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(fixture.path("graph.json").is_file());

    let output = codegraph(&fixture.root)
        .args(["query", "--graph-file", "graph.json", "--seed-files"])
        .arg(&b)
        .output()
        .unwrap();
    assert!(output.status.success());
    let files: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(files, expected);
}

#[test]
fn test_cli_index_reports_unwritable_output() {
    let fixture = Fixture::new();
    scenario_project(&fixture);
    fixture.manifest(&["App/App.csproj"]);
    fs::create_dir_all(fixture.path("taken")).unwrap();

    let output = codegraph(&fixture.root)
        .args(["index", "projects.txt", "-o", "taken"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot write"));
    assert!(fixture.path("taken").is_dir());
}

#[test]
fn test_cli_query_without_graph_prints_nothing() {
    let fixture = Fixture::new();

    let output = codegraph(&fixture.root)
        .args(["query", "-g", "missing.json", "-s", "A.cs"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());

    fs::write(fixture.path("empty.json"), "[]").unwrap();
    let output = codegraph(&fixture.root)
        .args(["query", "-g", "empty.json", "-s", "A.cs"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
