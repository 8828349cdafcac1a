//! Query engine implementation
//!
//! Provides the read-only queries over a loaded graph:
//! - Related files: seeds plus files that reference a seed symbol
//! - Impact analysis: dependents and dependencies of the seed files
//!
//! Both are a single hop. A file whose symbols only reference a dependent
//! of a seed is not related to the seed.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::graph::CodeGraph;
use crate::symbol::CodeSymbol;

/// Files around a set of seed files
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImpactResult {
    /// The seed files, as given
    pub direct: Vec<String>,
    /// Files with symbols that reference a seed-file symbol
    pub dependents: Vec<String>,
    /// Files declaring symbols that seed-file symbols reference
    pub dependencies: Vec<String>,
}

/// Query engine over one code graph
pub struct QueryEngine<'a> {
    graph: &'a CodeGraph,
    by_file: HashMap<&'a str, Vec<&'a CodeSymbol>>,
}

impl<'a> QueryEngine<'a> {
    /// Index a graph by declaring file
    pub fn new(graph: &'a CodeGraph) -> Self {
        let mut by_file: HashMap<&'a str, Vec<&'a CodeSymbol>> = HashMap::new();
        for symbol in graph.symbols() {
            by_file.entry(symbol.file_path.as_str()).or_default().push(symbol);
        }
        Self { graph, by_file }
    }

    /// Symbols declared in a file (exact path match)
    pub fn symbols_in_file(&self, path: &str) -> &[&'a CodeSymbol] {
        self.by_file.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Graph file path a seed refers to: the seed itself, or its canonical
    /// absolute form when only that is recorded
    fn seed_file(&self, seed: &str) -> Option<&'a str> {
        if let Some((path, _)) = self.by_file.get_key_value(seed) {
            return Some(*path);
        }
        let canonical = Path::new(seed).canonicalize().ok()?;
        let canonical = canonical.to_string_lossy();
        self.by_file.get_key_value(canonical.as_ref()).map(|(path, _)| *path)
    }

    /// Graph paths of the seeds, and the full names declared in them
    fn seed_symbols<S: AsRef<str>>(&self, seeds: &[S]) -> (HashSet<&'a str>, HashSet<&'a str>) {
        let mut files = HashSet::new();
        let mut names = HashSet::new();
        for seed in seeds {
            match self.seed_file(seed.as_ref()) {
                Some(file) => {
                    files.insert(file);
                    names.extend(self.symbols_in_file(file).iter().map(|s| s.full_name.as_str()));
                }
                None => tracing::debug!("Seed {} declares no symbols", seed.as_ref()),
            }
        }
        (files, names)
    }

    /// The seed files plus every file holding a symbol with a relationship
    /// into a symbol declared in a seed file.
    ///
    /// Always contains the seeds as given.
    pub fn related_files<S: AsRef<str>>(&self, seeds: &[S]) -> BTreeSet<String> {
        let mut result: BTreeSet<String> = seeds.iter().map(|s| s.as_ref().to_string()).collect();
        let (seed_files, seed_names) = self.seed_symbols(seeds);
        result.extend(self.dependents(&seed_files, &seed_names));
        result
    }

    /// Dependents and dependencies of the seed files, one hop each way
    pub fn impact<S: AsRef<str>>(&self, seeds: &[S]) -> ImpactResult {
        let direct: BTreeSet<String> = seeds.iter().map(|s| s.as_ref().to_string()).collect();
        let (seed_files, seed_names) = self.seed_symbols(seeds);

        let dependents: BTreeSet<String> = self
            .dependents(&seed_files, &seed_names)
            .into_iter()
            .filter(|f| !direct.contains(f))
            .collect();

        let mut dependencies = BTreeSet::new();
        for file in &seed_files {
            for symbol in self.symbols_in_file(file) {
                for relationship in &symbol.relationships {
                    let Some(target) = self.graph.get(&relationship.target_full_name) else {
                        continue;
                    };
                    let path = target.file_path.as_str();
                    if !seed_files.contains(path) && !direct.contains(path) {
                        dependencies.insert(path.to_string());
                    }
                }
            }
        }

        ImpactResult {
            direct: direct.into_iter().collect(),
            dependents: dependents.into_iter().collect(),
            dependencies: dependencies.into_iter().collect(),
        }
    }

    /// Files outside the seeds whose symbols reference a seed symbol.
    /// Linear in the number of relationships.
    fn dependents(&self, seed_files: &HashSet<&'a str>, seed_names: &HashSet<&'a str>) -> BTreeSet<String> {
        if seed_names.is_empty() {
            return BTreeSet::new();
        }
        self.graph
            .symbols()
            .iter()
            .filter(|symbol| !seed_files.contains(symbol.file_path.as_str()))
            .filter(|symbol| symbol.references_any(seed_names))
            .map(|symbol| symbol.file_path.clone())
            .collect()
    }
}
