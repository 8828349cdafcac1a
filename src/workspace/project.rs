//! Project files
//!
//! Reads just enough of MSBuild project files and solutions to find the
//! source documents a project compiles and the projects it references.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ignore::WalkBuilder;
use regex::Regex;

use crate::ignore::IgnoreFilter;
use crate::{Error, Result};

/// What kind of project file a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    /// A `.csproj`; compiles the `.cs` files beneath its directory
    CSharp,
    /// A traversal project such as `dirs.proj`; only references others
    Traversal,
    /// A `.sln` file; only references the projects it lists
    Solution,
}

impl ProjectKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csproj" => Some(ProjectKind::CSharp),
            "proj" => Some(ProjectKind::Traversal),
            "sln" => Some(ProjectKind::Solution),
            _ => None,
        }
    }
}

/// A loaded project: its references and the documents it compiles.
#[derive(Debug, Clone)]
pub struct Project {
    /// Normalized path of the project file
    pub path: PathBuf,
    pub name: String,
    pub kind: ProjectKind,
    /// Referenced project files, resolved against this project's directory
    pub references: Vec<PathBuf>,
    /// Source documents in discovery order
    pub documents: Vec<PathBuf>,
}

impl Project {
    /// Load a project file from disk.
    pub fn load(path: &Path, excludes: &[String]) -> Result<Self> {
        let kind = ProjectKind::from_path(path).ok_or_else(|| Error::ProjectLoad {
            path: path.to_path_buf(),
            reason: "not a .csproj, .proj or .sln file".to_string(),
        })?;

        let contents = fs::read_to_string(path).map_err(|e| Error::ProjectLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let references = match kind {
            ProjectKind::Solution => parse_solution_projects(&contents, &dir),
            ProjectKind::CSharp | ProjectKind::Traversal => {
                parse_project_references(&contents, &dir, kind == ProjectKind::Traversal)
            }
        };

        let documents = match kind {
            ProjectKind::CSharp => discover_documents(&dir, excludes),
            ProjectKind::Traversal | ProjectKind::Solution => Vec::new(),
        };

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            kind,
            references,
            documents,
        })
    }
}

fn project_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<ProjectReference\b([^>]*?)/?>").expect("static regex")
    })
}

fn include_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bInclude\s*=\s*"([^"]+)""#).expect("static regex"))
}

fn test_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bTest\s*=\s*"true""#).expect("static regex"))
}

fn solution_project_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^Project\("\{[^}]*\}"\)\s*=\s*"[^"]*"\s*,\s*"([^"]+\.csproj)""#)
            .expect("static regex")
    })
}

/// Extract `<ProjectReference Include="..."/>` targets.
///
/// Traversal projects mark test projects with `Test="true"`; those are left
/// out of the workspace.
fn parse_project_references(contents: &str, dir: &Path, skip_tests: bool) -> Vec<PathBuf> {
    project_reference_regex()
        .captures_iter(contents)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            if skip_tests && test_attr_regex().is_match(attrs) {
                return None;
            }
            let include = include_attr_regex().captures(attrs)?.get(1)?.as_str();
            Some(resolve_msbuild_path(include, dir))
        })
        .collect()
}

fn parse_solution_projects(contents: &str, dir: &Path) -> Vec<PathBuf> {
    solution_project_regex()
        .captures_iter(contents)
        .filter_map(|caps| caps.get(1))
        .map(|m| resolve_msbuild_path(m.as_str(), dir))
        .collect()
}

/// Turn an MSBuild path (backslashes, directory properties) into a path
/// relative to `dir`.
fn resolve_msbuild_path(raw: &str, dir: &Path) -> PathBuf {
    let cleaned = raw
        .trim()
        .replace("$(MSBuildThisFileDirectory)", "")
        .replace("$(MSBuildProjectDirectory)", ".")
        .replace('\\', "/");
    let path = PathBuf::from(cleaned);
    if path.is_absolute() {
        path
    } else {
        dir.join(path)
    }
}

/// Every `.cs` file beneath `dir`, except build output and folders owned by
/// another project.
fn discover_documents(dir: &Path, excludes: &[String]) -> Vec<PathBuf> {
    let filter = Arc::new(IgnoreFilter::new(dir, Some(excludes)));
    let entry_filter = Arc::clone(&filter);

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if entry_filter.is_ignored(entry.path(), is_dir) {
                return false;
            }
            !(is_dir && entry.depth() > 0 && contains_project_file(entry.path()))
        })
        .build();

    let mut documents = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                let is_file = entry.file_type().is_some_and(|t| t.is_file());
                if is_file && path.extension().is_some_and(|e| e == "cs") {
                    documents.push(path.to_path_buf());
                }
            }
            Err(e) => tracing::warn!("Skipping unreadable entry under {}: {}", dir.display(), e),
        }
    }
    documents
}

fn contains_project_file(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csproj"))
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_kind() {
        assert_eq!(ProjectKind::from_path(Path::new("a/App.csproj")), Some(ProjectKind::CSharp));
        assert_eq!(ProjectKind::from_path(Path::new("dirs.proj")), Some(ProjectKind::Traversal));
        assert_eq!(ProjectKind::from_path(Path::new("All.SLN")), Some(ProjectKind::Solution));
        assert_eq!(ProjectKind::from_path(Path::new("App.fsproj")), None);
    }

    #[test]
    fn test_project_references() {
        let contents = r#"
<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <ProjectReference Include="..\Core\Core.csproj" />
    <ProjectReference
        Include="$(MSBuildThisFileDirectory)../Data/Data.csproj">
      <Private>true</Private>
    </ProjectReference>
  </ItemGroup>
</Project>"#;
        let refs = parse_project_references(contents, Path::new("/r/Api"), false);
        assert_eq!(
            refs,
            vec![
                PathBuf::from("/r/Api/../Core/Core.csproj"),
                PathBuf::from("/r/Api/../Data/Data.csproj"),
            ]
        );
    }

    #[test]
    fn test_traversal_skips_test_projects() {
        let contents = r#"
<Project>
  <ItemGroup>
    <ProjectReference Include="src/Api/Api.csproj" />
    <ProjectReference Include="test/Api.Tests/Api.Tests.csproj" Test="true" />
  </ItemGroup>
</Project>"#;
        let refs = parse_project_references(contents, Path::new("/r"), true);
        assert_eq!(refs, vec![PathBuf::from("/r/src/Api/Api.csproj")]);
    }

    #[test]
    fn test_solution_projects() {
        let contents = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Api", "src\Api\Api.csproj", "{1}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "docs", "docs", "{2}"
EndProject
"#;
        let refs = parse_solution_projects(contents, Path::new("/r"));
        assert_eq!(refs, vec![PathBuf::from("/r/src/Api/Api.csproj")]);
    }

    #[test]
    fn test_discovers_documents_outside_nested_projects() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("App.csproj"), "<Project />").unwrap();
        fs::write(root.join("Program.cs"), "class P {}").unwrap();
        fs::create_dir_all(root.join("Services")).unwrap();
        fs::write(root.join("Services/Mailer.cs"), "class M {}").unwrap();
        fs::create_dir_all(root.join("obj/Debug")).unwrap();
        fs::write(root.join("obj/Debug/Gen.cs"), "class G {}").unwrap();
        fs::create_dir_all(root.join("Plugin")).unwrap();
        fs::write(root.join("Plugin/Plugin.csproj"), "<Project />").unwrap();
        fs::write(root.join("Plugin/Plugin.cs"), "class X {}").unwrap();

        let project = Project::load(&root.join("App.csproj"), &[]).unwrap();
        let names: Vec<_> = project
            .documents
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["Program.cs", "Services/Mailer.cs"]);
        assert_eq!(project.name, "App");
    }
}
