use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Decides which paths under a project directory are not source documents.
pub struct IgnoreFilter {
    inner: Gitignore,
}

impl IgnoreFilter {
    pub fn new(root: &Path, extra_excludes: Option<&[String]>) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        // Build output, tooling and VCS directories never hold compiled sources
        let defaults = [
            "bin/", "obj/", "TestResults/", "packages/", "node_modules/", "artifacts/",
            ".git/", ".vs/", ".vscode/", ".idea/",
            // Generated by the build into intermediate folders
            "*.AssemblyInfo.cs", "*.AssemblyAttributes.cs", "*.GlobalUsings.g.cs",
        ];

        for pattern in defaults {
            // Static patterns; a failure here would be a typo above
            builder.add_line(None, pattern).ok();
        }

        if let Some(excludes) = extra_excludes {
            for pattern in excludes {
                if let Err(e) = builder.add_line(None, pattern) {
                    tracing::warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e);
                }
            }
        }

        Self {
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
        }
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched(path, is_dir).is_ignore()
    }
}
