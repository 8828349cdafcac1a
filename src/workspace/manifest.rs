//! Manifest parsing
//!
//! A manifest is a text file listing one project path per line. Blank lines
//! and `#` comments are skipped, relative entries are taken relative to the
//! manifest's own directory, and entries with glob metacharacters expand to
//! every matching path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Read a manifest file into an ordered list of project paths.
///
/// Failing to read the manifest itself is fatal for an index run.
pub fn read_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let contents = fs::read_to_string(path)?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    parse_manifest(&contents, base)
}

/// Parse manifest contents, resolving entries against `base`.
pub fn parse_manifest(contents: &str, base: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let candidate = PathBuf::from(line);
        let candidate = if candidate.is_absolute() {
            candidate
        } else {
            base.join(candidate)
        };

        if is_glob(line) && !candidate.exists() {
            entries.extend(expand(&candidate));
        } else {
            entries.push(candidate);
        }
    }

    Ok(entries)
}

/// Paths matching a pattern entry. An entry that is not a valid pattern, or
/// matches nothing, is kept as written so loading reports it as missing.
fn expand(candidate: &Path) -> Vec<PathBuf> {
    let pattern = candidate.to_string_lossy().to_string();
    let mut matches: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(|m| m.ok()).collect(),
        Err(e) => {
            tracing::warn!("Manifest entry {} is not a valid pattern: {}", pattern, e);
            Vec::new()
        }
    };
    if matches.is_empty() {
        tracing::warn!("Manifest pattern {} matched no files", pattern);
        return vec![candidate.to_path_buf()];
    }
    matches.sort();
    matches
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let contents = "\n# services\n  src/Api/Api.csproj  \n\n/abs/Lib/Lib.csproj\n";
        let entries = parse_manifest(contents, Path::new("/repo")).unwrap();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/repo/src/Api/Api.csproj"),
                PathBuf::from("/abs/Lib/Lib.csproj"),
            ]
        );
    }

    #[test]
    fn test_duplicates_are_preserved() {
        // De-duplication is the loader's job, not the manifest's
        let contents = "A/A.csproj\nA/A.csproj\n";
        let entries = parse_manifest(contents, Path::new("/r")).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_glob_expansion() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["B", "A"] {
            let project_dir = dir.path().join(name);
            fs::create_dir_all(&project_dir).unwrap();
            fs::write(project_dir.join(format!("{name}.csproj")), "<Project />").unwrap();
        }

        let manifest = dir.path().join("projects.txt");
        fs::write(&manifest, "*/*.csproj\nmissing/*.csproj\n").unwrap();

        let entries = read_manifest(&manifest).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].ends_with("A/A.csproj"));
        assert!(entries[1].ends_with("B/B.csproj"));
        // Kept as written so loading reports it
        assert!(entries[2].ends_with("missing/*.csproj"));
    }

    #[test]
    fn test_bracket_entries_fall_back_to_literal_paths() {
        let dir = tempfile::tempdir().unwrap();
        let versioned = dir.path().join("Proj[v2]");
        fs::create_dir_all(&versioned).unwrap();
        fs::write(versioned.join("App.csproj"), "<Project />").unwrap();

        let manifest = dir.path().join("projects.txt");
        fs::write(&manifest, "Proj[v2]/App.csproj
Broken[.csproj
").unwrap();

        let entries = read_manifest(&manifest).unwrap();
        assert_eq!(
            entries,
            vec![versioned.join("App.csproj"), dir.path().join("Broken[.csproj")]
        );
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        assert!(read_manifest(Path::new("/definitely/not/here.txt")).is_err());
    }
}
