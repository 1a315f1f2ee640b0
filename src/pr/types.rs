/// How a file changed between the base and head of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeMode {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// Whether a diff line was added, removed, or carried as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Added,
    Removed,
    Context,
}

/// A single line inside a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// Line number in the file the line belongs to: the new file for added
    /// and context lines, the old file for removed lines.
    pub number: usize,
    /// Line text without its `+`/`-`/` ` prefix
    pub content: String,
    pub mode: LineMode,
}

/// A contiguous region of changes within a file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)] // Header ranges are kept for completeness; scanning walks the lines
pub struct DiffHunk {
    /// Starting line number in the old file
    pub old_start: usize,
    /// Number of lines in the old file
    pub old_count: usize,
    /// Starting line number in the new file
    pub new_start: usize,
    /// Number of lines in the new file
    pub new_count: usize,
    /// Lines of the old range (removed and context), in order
    pub old_lines: Vec<DiffLine>,
    /// Lines of the new range (added and context), in order
    pub new_lines: Vec<DiffLine>,
}

/// A single file within a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFile {
    /// Path after the change (the old path for deleted files)
    pub path: String,
    /// Path before the change, when it differs (renames)
    pub old_path: Option<String>,
    pub mode: ChangeMode,
    pub hunks: Vec<DiffHunk>,
}

impl DiffFile {
    pub fn additions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.new_lines)
            .filter(|l| l.mode == LineMode::Added)
            .count()
    }

    pub fn deletions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.old_lines)
            .filter(|l| l.mode == LineMode::Removed)
            .count()
    }
}

/// A parsed unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub files: Vec<DiffFile>,
}

/// Owner/name identity of a repository, plus GitHub's numeric id which keys
/// the per-repository config cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub id: u64,
    pub owner: String,
    pub name: String,
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A pull request implicated by an incoming event.
/// Immutable once extracted from the event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    /// PR number (e.g., 42)
    pub number: u64,
    /// Head branch name
    pub head_ref: String,
    /// Head commit SHA
    pub head_sha: String,
    pub repo: RepoRef,
}
