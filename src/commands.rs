use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use codegraph::config::{default_config_path, default_jobs, load_config, write_config, CodegraphConfig};
use codegraph::ui::{self, Icons, ProgressManager, Spinner};
use codegraph::workspace::DiagnosticKind;
use codegraph::{CodeGraph, Extractor, ExtractorOptions, QueryEngine, Workspace};

pub fn run_index(
    config_path: Option<&Path>,
    manifest: &Path,
    output: Option<PathBuf>,
    jobs: Option<usize>,
    no_inheritance: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?.unwrap_or_default();
    let output = output.unwrap_or_else(|| config.output_path());
    let options = ExtractorOptions {
        jobs: jobs.or(config.jobs).unwrap_or_else(default_jobs),
        inheritance_edges: !no_inheritance && config.inheritance_edges.unwrap_or(true),
        excludes: config.exclude.clone(),
    };

    ui::header(&format!("Indexing projects from {}", manifest.display()));
    ui::status(Icons::FILE, "Output", &output.display().to_string());

    let started = Instant::now();
    let workspace = Workspace::from_manifest(manifest, options.excludes.clone())
        .with_context(|| format!("cannot read manifest {}", manifest.display()))?;
    let documents = workspace.documents().len();

    let (mut progress, tx) = ProgressManager::new(documents);
    let extractor = Extractor::new(options).with_progress(tx);
    let extracted = extractor.extract(&workspace);
    drop(extractor);

    let (graph, report) = match extracted {
        Ok(extracted) => extracted,
        Err(e) => {
            progress.join();
            return Err(e).context("extraction failed, no graph written");
        }
    };

    if let Err(e) = graph.write_to(&output) {
        progress.join();
        return Err(e).with_context(|| format!("cannot write {}", output.display()));
    }
    progress.finish_with_summary(started.elapsed(), report.documents, report.stats.symbols, report.stats.relationships());

    if !report.diagnostics.is_empty() {
        ui::warn(&format!("{} recoverable problem(s), see log", report.diagnostics.len()));
        ui::section("Diagnostics");
        for kind in [
            DiagnosticKind::MissingProject,
            DiagnosticKind::LoadFailed,
            DiagnosticKind::MissingReference,
            DiagnosticKind::UnreadableDocument,
            DiagnosticKind::SyntaxError,
        ] {
            let count = report.diagnostics.iter().filter(|d| d.kind == kind).count();
            if count > 0 {
                ui::summary_row(kind.as_str(), &count.to_string());
            }
        }
    }

    ui::section("Summary");
    ui::summary_row("Projects", &report.projects.to_string());
    ui::summary_row("Documents", &report.documents.to_string());
    ui::summary_row("Symbols", &report.stats.symbols.to_string());
    ui::summary_row(
        "Invocations bound",
        &format!("{} / {}", report.binding.bound, report.binding.total),
    );
    ui::success(&format!("Graph written to {}", output.display()));
    tracing::info!(
        "Wrote {} symbol(s) to {}",
        report.stats.symbols,
        output.display()
    );
    Ok(())
}

fn load_graph(path: &Path) -> anyhow::Result<CodeGraph> {
    let spinner = Spinner::new("Loading graph");
    let graph = CodeGraph::load(path);
    spinner.finish_and_clear();
    Ok(graph?)
}

pub fn run_query(graph_file: &Path, seeds: &[String]) -> anyhow::Result<()> {
    let graph = load_graph(graph_file)?;
    let engine = QueryEngine::new(&graph);
    let files: Vec<String> = engine.related_files(seeds).into_iter().collect();
    tracing::debug!("{} related file(s) for {} seed(s)", files.len(), seeds.len());
    println!("{}", serde_json::to_string_pretty(&files)?);
    Ok(())
}

pub fn run_impact(graph_file: &Path, seeds: &[String]) -> anyhow::Result<()> {
    let graph = load_graph(graph_file)?;
    let engine = QueryEngine::new(&graph);
    let impact = engine.impact(seeds);

    ui::status(Icons::DIRECT, "Seeds", &impact.direct.len().to_string());
    ui::status(Icons::UP, "Dependents", &impact.dependents.len().to_string());
    ui::status(Icons::DOWN, "Dependencies", &impact.dependencies.len().to_string());
    println!("{}", serde_json::to_string_pretty(&impact)?);
    Ok(())
}

pub fn run_stats(graph_file: &Path) -> anyhow::Result<()> {
    let graph = load_graph(graph_file)?;
    let stats = graph.stats();

    ui::header(&format!("{} {}", Icons::STATS, graph_file.display()));
    let table = ui::stats_table(&[
        ("Files", stats.files.to_string()),
        ("Symbols", stats.symbols.to_string()),
        ("Classes", stats.classes.to_string()),
        ("Interfaces", stats.interfaces.to_string()),
        ("Methods", stats.methods.to_string()),
        ("Calls", stats.calls.to_string()),
        ("InheritsFrom", stats.inherits.to_string()),
        ("Implements", stats.implements.to_string()),
        ("Dangling", stats.dangling.to_string()),
    ]);
    println!("{}", table);
    Ok(())
}

pub fn run_init(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    write_config(&path, &CodegraphConfig::starter(), force)?;
    ui::success(&format!("Wrote {}", path.display()));
    Ok(())
}
