//! The slice of GitHub's REST API the bot talks to, behind [`GitHubApi`] so
//! the pipeline can run against an in-memory fake in tests.

pub mod client;
#[cfg(test)]
pub mod fake;

pub use client::RestClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::pr::{PullRequestRef, RepoRef};
use crate::report::types::{Annotation, Conclusion};

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GitHub API returned {status} for {url}")]
    Status { status: u16, url: String },
}

/// Body of `POST /repos/{owner}/{repo}/check-runs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateCheckRun {
    pub name: String,
    pub head_branch: String,
    pub head_sha: String,
    pub status: &'static str,
    pub completed_at: DateTime<Utc>,
    pub conclusion: Conclusion,
    pub output: CheckRunOutput,
}

/// The `output` object of a check run; also the body of follow-up
/// `PATCH` requests that append annotation batches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
    pub text: String,
    pub annotations_count: usize,
    pub annotations: Vec<Annotation>,
}

#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Raw unified diff of a pull request.
    async fn fetch_diff(&self, pr: &PullRequestRef) -> Result<String, GitHubError>;

    /// Raw contents of `path` at `git_ref`.
    async fn fetch_file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<String, GitHubError>;

    /// Create a check run, returning its id.
    async fn create_check_run(
        &self,
        repo: &RepoRef,
        request: &CreateCheckRun,
    ) -> Result<u64, GitHubError>;

    /// Replace the output of an existing check run; annotations are appended
    /// by GitHub rather than replaced.
    async fn update_check_run(
        &self,
        repo: &RepoRef,
        check_run_id: u64,
        output: &CheckRunOutput,
    ) -> Result<(), GitHubError>;
}

/// Hands out API clients authorized for a given app installation.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, installation_id: u64) -> Result<Arc<dyn GitHubApi>, GitHubError>;
}

/// Serves every installation with one client built from a pre-issued token.
pub struct TokenClientFactory {
    client: Arc<RestClient>,
}

impl TokenClientFactory {
    pub fn new(client: RestClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl ClientFactory for TokenClientFactory {
    /// Every installation shares the one client and its pre-issued
    /// installation token; `installation_id` is not consulted.
    fn client_for(&self, _installation_id: u64) -> Result<Arc<dyn GitHubApi>, GitHubError> {
        Ok(self.client.clone())
    }
}
