use super::types::{ChangeMode, Diff, DiffFile, DiffHunk, DiffLine, LineMode};
use super::PrError;

/// A hunk being filled, with the cursors needed to number its lines.
struct OpenHunk {
    hunk: DiffHunk,
    old_line: usize,
    new_line: usize,
    old_remaining: usize,
    new_remaining: usize,
}

impl OpenHunk {
    fn new(old_start: usize, old_count: usize, new_start: usize, new_count: usize) -> Self {
        Self {
            hunk: DiffHunk {
                old_start,
                old_count,
                new_start,
                new_count,
                old_lines: Vec::new(),
                new_lines: Vec::new(),
            },
            old_line: old_start,
            new_line: new_start,
            old_remaining: old_count,
            new_remaining: new_count,
        }
    }

    fn expects_more(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    fn push_old(&mut self, content: &str, mode: LineMode) {
        self.hunk.old_lines.push(DiffLine {
            number: self.old_line,
            content: content.to_string(),
            mode,
        });
        self.old_line += 1;
        self.old_remaining = self.old_remaining.saturating_sub(1);
    }

    fn push_new(&mut self, content: &str, mode: LineMode) {
        self.hunk.new_lines.push(DiffLine {
            number: self.new_line,
            content: content.to_string(),
            mode,
        });
        self.new_line += 1;
        self.new_remaining = self.new_remaining.saturating_sub(1);
    }

    /// Consume one body line. Line counts from the hunk header decide where
    /// the body ends, so a removed line reading `-- x` is never mistaken for
    /// a `--- ` file header.
    fn push(&mut self, line: &str) -> Result<(), PrError> {
        match line.as_bytes().first() {
            Some(b'+') => self.push_new(&line[1..], LineMode::Added),
            Some(b'-') => self.push_old(&line[1..], LineMode::Removed),
            Some(b' ') => {
                self.push_old(&line[1..], LineMode::Context);
                self.push_new(&line[1..], LineMode::Context);
            }
            // Some tools strip the single space off empty context lines
            None => {
                self.push_old("", LineMode::Context);
                self.push_new("", LineMode::Context);
            }
            Some(b'\\') => {}
            Some(_) => {
                return Err(PrError::DiffParse(format!(
                    "Unexpected line inside hunk starting at +{}: {:?}",
                    self.hunk.new_start, line
                )))
            }
        }
        Ok(())
    }
}

/// Parse a unified diff string into a [`Diff`].
///
/// The input is the raw text from GitHub's diff endpoint.
///
/// Each file section starts with:
///   diff --git a/{path} b/{path}
///
/// New files have `new file mode` / `--- /dev/null`, deleted files have
/// `deleted file mode` / `+++ /dev/null`, renames carry `rename from` and
/// `rename to` headers.
///
/// Hunks start with: @@ -{old_start},{old_count} +{new_start},{new_count} @@
///
/// Lines are prefixed with:
///   '+' for additions
///   '-' for deletions
///   ' ' for context (unchanged)
pub fn parse_diff(raw_diff: &str) -> Result<Diff, PrError> {
    if raw_diff.trim().is_empty() {
        return Ok(Diff::default());
    }

    let mut files = Vec::new();
    let mut current_file: Option<DiffFile> = None;
    let mut current_hunk: Option<OpenHunk> = None;

    let finish_hunk = |file: &mut Option<DiffFile>, hunk: &mut Option<OpenHunk>| {
        if let (Some(file), Some(open)) = (file.as_mut(), hunk.take()) {
            file.hunks.push(open.hunk);
        }
    };

    let finish_file =
        |files: &mut Vec<DiffFile>, file: &mut Option<DiffFile>, hunk: &mut Option<OpenHunk>| {
            finish_hunk(file, hunk);
            if let Some(file) = file.take() {
                files.push(file);
            }
        };

    for line in raw_diff.lines() {
        if let Some(open) = current_hunk.as_mut() {
            if open.expects_more() {
                open.push(line)?;
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            finish_file(&mut files, &mut current_file, &mut current_hunk);
            current_file = Some(DiffFile {
                path: parse_git_header_path(rest)?,
                old_path: None,
                mode: ChangeMode::Modified,
                hunks: Vec::new(),
            });
            continue;
        }

        if line.starts_with("@@") {
            if current_file.is_none() {
                return Err(PrError::DiffParse(
                    "Hunk header found before any file header".to_string(),
                ));
            }
            finish_hunk(&mut current_file, &mut current_hunk);
            let (old_start, old_count, new_start, new_count) = parse_hunk_header(line)?;
            current_hunk = Some(OpenHunk::new(old_start, old_count, new_start, new_count));
            continue;
        }

        let Some(file) = current_file.as_mut() else {
            continue;
        };

        if line.starts_with("new file mode") {
            file.mode = ChangeMode::Added;
        } else if line.starts_with("deleted file mode") {
            file.mode = ChangeMode::Deleted;
        } else if let Some(from) = line.strip_prefix("rename from ") {
            file.mode = ChangeMode::Renamed;
            file.old_path = Some(from.to_string());
        } else if let Some(to) = line.strip_prefix("rename to ") {
            file.mode = ChangeMode::Renamed;
            file.path = to.to_string();
        } else if let Some(path) = line.strip_prefix("--- ") {
            if header_path(path) == "/dev/null" {
                file.mode = ChangeMode::Added;
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            let path = header_path(path);
            if path == "/dev/null" {
                file.mode = ChangeMode::Deleted;
            } else {
                file.path = path.strip_prefix("b/").unwrap_or(path).to_string();
            }
        }
    }

    if let Some(open) = current_hunk.as_ref() {
        if open.expects_more() {
            return Err(PrError::DiffParse(format!(
                "Truncated hunk starting at +{}",
                open.hunk.new_start
            )));
        }
    }

    finish_file(&mut files, &mut current_file, &mut current_hunk);
    Ok(Diff { files })
}

/// Path from a `diff --git a/x b/x` header, preferring the b/ side.
fn parse_git_header_path(rest: &str) -> Result<String, PrError> {
    let mut parts = rest.split_whitespace();
    let a_path = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing a/ path in diff header".to_string()))?;
    let b_path = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing b/ path in diff header".to_string()))?;
    Ok(b_path
        .strip_prefix("b/")
        .or_else(|| a_path.strip_prefix("a/"))
        .unwrap_or(b_path)
        .to_string())
}

/// `---`/`+++` headers may carry a tab-separated timestamp.
fn header_path(path: &str) -> &str {
    path.split('\t').next().unwrap_or(path).trim_end()
}

fn parse_hunk_header(line: &str) -> Result<(usize, usize, usize, usize), PrError> {
    let header = line
        .trim()
        .strip_prefix("@@")
        .ok_or_else(|| PrError::DiffParse("Invalid hunk header".to_string()))?
        .trim();
    let mut parts = header.split_whitespace();
    let old_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse(format!("Missing old range in {}", line)))?;
    let new_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse(format!("Missing new range in {}", line)))?;

    let (old_start, old_count) = parse_range(old_part, '-')?;
    let (new_start, new_count) = parse_range(new_part, '+')?;

    Ok((old_start, old_count, new_start, new_count))
}

fn parse_range(part: &str, prefix: char) -> Result<(usize, usize), PrError> {
    let range = part
        .strip_prefix(prefix)
        .ok_or_else(|| PrError::DiffParse(format!("Invalid range prefix in {}", part)))?;
    let (start_str, count_str) = match range.split_once(',') {
        Some((start, count)) => (start, count),
        None => (range, "1"),
    };
    let start = start_str
        .parse::<usize>()
        .map_err(|_| PrError::DiffParse(format!("Invalid range start in {}", part)))?;
    let count = count_str
        .parse::<usize>()
        .map_err(|_| PrError::DiffParse(format!("Invalid range count in {}", part)))?;
    Ok((start, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_DIFF: &str = r#"diff --git a/src/main.rs b/src/main.rs
index abc1234..def5678 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,3 +1,4 @@ fn main() {
 fn main() {
-    println!("old");
+    println!("new");
+    // Added a comment
 }
"#;

    #[test]
    fn test_parse_single_file_diff() {
        let diff = parse_diff(SAMPLE_DIFF).unwrap();
        assert_eq!(diff.files.len(), 1);
        let file = &diff.files[0];
        assert_eq!(file.path, "src/main.rs");
        assert_eq!(file.mode, ChangeMode::Modified);
        assert_eq!(file.additions(), 2);
        assert_eq!(file.deletions(), 1);
    }

    #[test]
    fn test_new_range_line_numbers() {
        let diff = parse_diff(SAMPLE_DIFF).unwrap();
        let hunk = &diff.files[0].hunks[0];
        let numbered: Vec<(usize, LineMode)> =
            hunk.new_lines.iter().map(|l| (l.number, l.mode)).collect();
        assert_eq!(
            numbered,
            vec![
                (1, LineMode::Context),
                (2, LineMode::Added),
                (3, LineMode::Added),
                (4, LineMode::Context),
            ]
        );
        assert_eq!(hunk.new_lines[1].content, "    println!(\"new\");");
        assert_eq!(hunk.old_lines[1].number, 2);
        assert_eq!(hunk.old_lines[1].mode, LineMode::Removed);
    }

    #[test]
    fn test_parse_new_file_diff() {
        let diff = r#"diff --git a/new_file.txt b/new_file.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new_file.txt
@@ -0,0 +1,2 @@
+hello
+world
"#;
        let diff = parse_diff(diff).unwrap();
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].mode, ChangeMode::Added);
        assert_eq!(diff.files[0].hunks[0].new_lines[1].number, 2);
    }

    #[test]
    fn test_parse_deleted_file_diff() {
        let diff = r#"diff --git a/old_file.txt b/old_file.txt
deleted file mode 100644
index e69de29..0000000
--- a/old_file.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-hello
-world
"#;
        let diff = parse_diff(diff).unwrap();
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].path, "old_file.txt");
        assert_eq!(diff.files[0].mode, ChangeMode::Deleted);
        assert!(diff.files[0].hunks[0].new_lines.is_empty());
    }

    #[test]
    fn test_parse_renamed_file_diff() {
        let diff = r#"diff --git a/docs/old.md b/docs/new.md
similarity index 90%
rename from docs/old.md
rename to docs/new.md
index 1111111..2222222 100644
--- a/docs/old.md
+++ b/docs/new.md
@@ -1 +1 @@
-title
+new title
"#;
        let diff = parse_diff(diff).unwrap();
        let file = &diff.files[0];
        assert_eq!(file.mode, ChangeMode::Renamed);
        assert_eq!(file.path, "docs/new.md");
        assert_eq!(file.old_path.as_deref(), Some("docs/old.md"));
    }

    #[test]
    fn test_removed_line_resembling_file_header() {
        let diff = r#"diff --git a/q.sql b/q.sql
--- a/q.sql
+++ b/q.sql
@@ -1,2 +1,1 @@
--- a comment
 SELECT 1;
diff --git a/b.txt b/b.txt
--- a/b.txt
+++ b/b.txt
@@ -1 +1 @@
-x
+y
"#;
        let diff = parse_diff(diff).unwrap();
        assert_eq!(diff.files.len(), 2);
        assert_eq!(diff.files[0].deletions(), 1);
        assert_eq!(diff.files[0].old_lines_text(), vec!["-- a comment", "SELECT 1;"]);
        assert_eq!(diff.files[1].path, "b.txt");
    }

    #[test]
    fn test_no_newline_marker_is_skipped() {
        let diff = "diff --git a/a b/a\n--- a/a\n+++ b/a\n@@ -1 +1 @@\n-x\n\\ No newline at end of file\n+y\n\\ No newline at end of file\n";
        let diff = parse_diff(diff).unwrap();
        assert_eq!(diff.files[0].additions(), 1);
        assert_eq!(diff.files[0].deletions(), 1);
    }

    #[test]
    fn test_multiple_hunks_are_numbered_independently() {
        let diff = r#"diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1,1 +1,2 @@
 one
+two
@@ -10,1 +11,2 @@
 ten
+eleven
"#;
        let diff = parse_diff(diff).unwrap();
        let hunks = &diff.files[0].hunks;
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[1].new_lines[1].number, 12);
    }

    #[test]
    fn test_invalid_hunk_header_is_error() {
        let diff = "diff --git a/a b/a\n--- a/a\n+++ b/a\n@@ -x,1 +1,1 @@\n+y\n";
        assert!(matches!(parse_diff(diff), Err(PrError::DiffParse(_))));
    }

    #[test]
    fn test_hunk_before_file_header_is_error() {
        assert!(parse_diff("@@ -1 +1 @@\n+y\n").is_err());
    }

    #[test]
    fn test_truncated_hunk_is_error() {
        let diff = "diff --git a/a b/a\n--- a/a\n+++ b/a\n@@ -1,3 +1,3 @@\n a\n";
        assert!(parse_diff(diff).is_err());
    }

    #[test]
    fn test_parse_empty_diff() {
        let diff = parse_diff("").unwrap();
        assert!(diff.files.is_empty());
    }

    impl DiffFile {
        fn old_lines_text(&self) -> Vec<&str> {
            self.hunks
                .iter()
                .flat_map(|h| &h.old_lines)
                .map(|l| l.content.as_str())
                .collect()
        }
    }
}
