use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;
use tracing::warn;

/// Per-repository path exclusions, written as `.gitignore` lines.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    matcher: Option<Gitignore>,
}

impl IgnoreFilter {
    /// A filter that excludes nothing.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ignore::Error> {
        if patterns.is_empty() {
            return Ok(Self::allow_all());
        }
        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            builder.add_line(None, pattern.as_ref())?;
        }
        Ok(Self {
            matcher: Some(builder.build()?),
        })
    }

    /// Like [`IgnoreFilter::new`], but a pattern that fails to compile
    /// disables every rule instead of failing the analysis.
    pub fn compile_or_allow_all<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self::new(patterns).unwrap_or_else(|err| {
            warn!(error = %err, "disregarding `ignore` configuration");
            Self::allow_all()
        })
    }

    /// Whether `path` (repository-relative) is excluded, either directly or
    /// through one of its parent directories.
    pub fn is_ignored(&self, path: &str) -> bool {
        let Some(matcher) = &self.matcher else {
            return false;
        };
        let path = Path::new(path.trim_start_matches('/'));
        matcher.matched_path_or_any_parents(path, false).is_ignore()
    }
}
