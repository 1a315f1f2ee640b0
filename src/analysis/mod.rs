pub mod cache;
pub mod ignore_filter;
pub mod terms;

pub use cache::{RepoConfig, RepoConfigCache};
pub use ignore_filter::IgnoreFilter;
pub use terms::TermMatcher;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::github::{GitHubApi, GitHubError};
use crate::pr::diff::parse_diff;
use crate::pr::{ChangeMode, Diff, LineMode, PrError, PullRequestRef};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to get diff for {head_sha}: {source}")]
    DiffFetch {
        head_sha: String,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to parse diff for {head_sha}: {source}")]
    DiffParse {
        head_sha: String,
        #[source]
        source: PrError,
    },
}

/// Flagged terms found on one added line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    pub path: String,
    pub line: usize,
    /// Distinct matched terms in order of first occurrence
    pub terms: Vec<String>,
}

/// Scans the added lines of a pull request diff for flagged terms.
#[derive(Debug, Clone)]
pub struct DiffAnalyzer {
    matcher: TermMatcher,
}

impl DiffAnalyzer {
    pub fn new(matcher: TermMatcher) -> Self {
        Self { matcher }
    }

    /// Fetch and parse the diff of `pr`, then scan it with `repo_config`'s
    /// ignore rules applied. An empty result means the PR passes.
    #[instrument(skip_all, fields(repo = %pr.repo, pr = pr.number, head_sha = %pr.head_sha))]
    pub async fn analyze(
        &self,
        api: &dyn GitHubApi,
        pr: &PullRequestRef,
        repo_config: &RepoConfig,
    ) -> Result<Vec<TermMatch>, AnalysisError> {
        let raw = api
            .fetch_diff(pr)
            .await
            .map_err(|source| AnalysisError::DiffFetch {
                head_sha: pr.head_sha.clone(),
                source,
            })?;
        let diff = parse_diff(&raw).map_err(|source| AnalysisError::DiffParse {
            head_sha: pr.head_sha.clone(),
            source,
        })?;
        debug!(files = diff.files.len(), "parsed diff");

        let ignore = IgnoreFilter::compile_or_allow_all(&repo_config.ignore);
        let matches = self.scan(&diff, &ignore);
        debug!(matches = matches.len(), "scan complete");
        Ok(matches)
    }

    /// Term matches on added lines of every file that is neither deleted nor
    /// excluded by `ignore`, in diff order.
    pub fn scan(&self, diff: &Diff, ignore: &IgnoreFilter) -> Vec<TermMatch> {
        let mut matches = Vec::new();
        for file in &diff.files {
            if file.mode == ChangeMode::Deleted {
                continue;
            }
            if ignore.is_ignored(&file.path) {
                debug!(path = %file.path, "skipping ignored file");
                continue;
            }
            for hunk in &file.hunks {
                for line in &hunk.new_lines {
                    if line.mode != LineMode::Added {
                        continue;
                    }
                    let terms = self.matcher.find_unique(&line.content);
                    if !terms.is_empty() {
                        matches.push(TermMatch {
                            path: file.path.clone(),
                            line: line.number,
                            terms,
                        });
                    }
                }
            }
        }
        matches
    }
}
