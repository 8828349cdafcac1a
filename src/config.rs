//! Optional `codegraph.toml` settings. CLI flags override these, and these
//! override the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Index output used when neither the CLI nor the config names one
pub const DEFAULT_OUTPUT: &str = "codegraph.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct CodegraphConfig {
    /// Index output path
    pub output: Option<String>,
    /// Parser worker count
    pub jobs: Option<usize>,
    /// Extra gitignore-style patterns excluded from document discovery
    pub exclude: Vec<String>,
    /// Record `InheritsFrom` / `Implements` relationships
    pub inheritance_edges: Option<bool>,
}

impl CodegraphConfig {
    /// The config `codegraph init` writes
    pub fn starter() -> Self {
        Self {
            output: Some(DEFAULT_OUTPUT.to_string()),
            jobs: None,
            exclude: vec!["**/Migrations/**".to_string()],
            inheritance_edges: Some(true),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(self.output.as_deref().unwrap_or(DEFAULT_OUTPUT))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("codegraph.toml")
}

/// Load the config at `path`, or `codegraph.toml` in the working directory.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Option<CodegraphConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CodegraphConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CodegraphConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::ConfigExists(path.to_path_buf()));
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Worker count: the configured value, else the machine's parallelism
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
