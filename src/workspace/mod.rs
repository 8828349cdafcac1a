//! Workspace - the shared compilation context for one extraction run
//!
//! All projects named by a manifest, plus everything they reference, are
//! loaded into one workspace so that symbols declared in one project can be
//! resolved from another. Loading is idempotent: a project reached several
//! times (listed twice, or referenced by many projects) is loaded once.
//!
//! The workspace is an explicit value rather than global state, so several
//! runs can coexist in one process.

pub mod manifest;
pub mod project;

pub use manifest::{parse_manifest, read_manifest};
pub use project::{Project, ProjectKind};

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::Result;

/// Category of a recoverable problem found while loading or parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A manifest entry that does not exist
    MissingProject,
    /// A project file that exists but could not be loaded
    LoadFailed,
    /// A project reference pointing at a file that does not exist
    MissingReference,
    /// A source document that could not be read
    UnreadableDocument,
    /// A source document with syntax errors
    SyntaxError,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MissingProject => "missing-project",
            DiagnosticKind::LoadFailed => "load-failed",
            DiagnosticKind::MissingReference => "missing-reference",
            DiagnosticKind::UnreadableDocument => "unreadable-document",
            DiagnosticKind::SyntaxError => "syntax-error",
        }
    }
}

/// A recoverable problem, logged and kept for the run summary.
#[derive(Debug, Clone)]
pub struct WorkspaceDiagnostic {
    pub kind: DiagnosticKind,
    /// Project or document the problem was found in
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for WorkspaceDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.path.display(), self.message)
    }
}

/// A source document and the project that first claimed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub project: usize,
}

/// The set of loaded projects.
#[derive(Debug, Default)]
pub struct Workspace {
    projects: Vec<Project>,
    by_path: HashMap<PathBuf, usize>,
    diagnostics: Vec<WorkspaceDiagnostic>,
    excludes: Vec<String>,
}

impl Workspace {
    /// Create an empty workspace; `excludes` are extra ignore patterns for
    /// document discovery.
    pub fn new(excludes: Vec<String>) -> Self {
        Self {
            excludes,
            ..Self::default()
        }
    }

    /// Read a manifest and load every project it lists.
    ///
    /// Only a failure to read the manifest is an error; problems with
    /// individual projects become diagnostics.
    pub fn from_manifest(manifest: &Path, excludes: Vec<String>) -> Result<Self> {
        let entries = read_manifest(manifest)?;
        tracing::info!("Manifest {} lists {} project(s)", manifest.display(), entries.len());
        let mut workspace = Self::new(excludes);
        workspace.load_all(entries);
        Ok(workspace)
    }

    /// Drain `entries` as a work queue, loading each project not yet known.
    pub fn load_all(&mut self, entries: impl IntoIterator<Item = PathBuf>) {
        let mut queue: VecDeque<PathBuf> = entries.into_iter().collect();
        let mut loaded = self.loaded_paths();

        while let Some(entry) = queue.pop_front() {
            if !entry.exists() {
                tracing::error!("Project not found, skipping: {}", entry.display());
                self.report(DiagnosticKind::MissingProject, &entry, "project file does not exist");
                continue;
            }

            let key = normalize(&entry);
            if loaded.contains(&key) {
                tracing::debug!("Already loaded: {}", entry.display());
                continue;
            }

            tracing::info!("Loading project {}", entry.display());
            if let Err(e) = self.open_project(&key) {
                tracing::error!("Failed to load {}: {}", entry.display(), e);
                self.report(DiagnosticKind::LoadFailed, &entry, e.to_string());
            }

            // Loading may have pulled in referenced projects as well
            loaded = self.loaded_paths();
        }
    }

    /// Load one project and, transitively, the projects it references.
    fn open_project(&mut self, path: &Path) -> Result<()> {
        if self.by_path.contains_key(path) {
            return Ok(());
        }

        let project = Project::load(path, &self.excludes)?;
        tracing::debug!(
            "Loaded {} ({} document(s), {} reference(s))",
            project.name,
            project.documents.len(),
            project.references.len()
        );
        let references = project.references.clone();
        self.by_path.insert(path.to_path_buf(), self.projects.len());
        self.projects.push(project);

        for reference in references {
            if !reference.exists() {
                tracing::warn!(
                    "{} references missing project {}",
                    path.display(),
                    reference.display()
                );
                self.report(
                    DiagnosticKind::MissingReference,
                    path,
                    format!("referenced project {} does not exist", reference.display()),
                );
                continue;
            }
            let reference = normalize(&reference);
            if let Err(e) = self.open_project(&reference) {
                tracing::warn!("Failed to load referenced project {}: {}", reference.display(), e);
                self.report(DiagnosticKind::LoadFailed, &reference, e.to_string());
            }
        }

        Ok(())
    }

    fn loaded_paths(&self) -> HashSet<PathBuf> {
        self.projects.iter().map(|p| p.path.clone()).collect()
    }

    /// Record a recoverable problem
    pub fn report(&mut self, kind: DiagnosticKind, path: &Path, message: impl Into<String>) {
        self.diagnostics.push(WorkspaceDiagnostic {
            kind,
            path: path.to_path_buf(),
            message: message.into(),
        });
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, index: usize) -> Option<&Project> {
        self.projects.get(index)
    }

    pub fn diagnostics(&self) -> &[WorkspaceDiagnostic] {
        &self.diagnostics
    }

    /// All source documents, each listed once, in project load order
    pub fn documents(&self) -> Vec<DocumentRef> {
        let mut seen = HashSet::new();
        let mut documents = Vec::new();
        for (index, project) in self.projects.iter().enumerate() {
            for path in &project.documents {
                if seen.insert(path.clone()) {
                    documents.push(DocumentRef {
                        path: path.clone(),
                        project: index,
                    });
                }
            }
        }
        documents
    }
}

/// Canonical form used as the identity of a project file
fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
