//! In-memory [`GitHubApi`] for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{CheckRunOutput, ClientFactory, CreateCheckRun, GitHubApi, GitHubError};
use crate::pr::{PullRequestRef, RepoRef};

fn not_found(url: String) -> GitHubError {
    GitHubError::Status { status: 404, url }
}

#[derive(Default)]
struct State {
    diffs: HashMap<u64, Result<String, u16>>,
    files: HashMap<String, Result<String, u16>>,
    fail_create_with: Option<u16>,
    file_fetches: usize,
    created: Vec<CreateCheckRun>,
    updates: Vec<(u64, CheckRunOutput)>,
}

#[derive(Default)]
pub struct FakeGitHub {
    state: Mutex<State>,
}

impl FakeGitHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_diff(&self, pr_number: u64, diff: &str) {
        self.state
            .lock()
            .diffs
            .insert(pr_number, Ok(diff.to_string()));
    }

    pub fn with_diff_status(&self, pr_number: u64, status: u16) {
        self.state.lock().diffs.insert(pr_number, Err(status));
    }

    pub fn with_file(&self, path: &str, contents: &str) {
        self.state
            .lock()
            .files
            .insert(path.to_string(), Ok(contents.to_string()));
    }

    pub fn with_file_status(&self, path: &str, status: u16) {
        self.state.lock().files.insert(path.to_string(), Err(status));
    }

    pub fn fail_check_run_creation(&self, status: u16) {
        self.state.lock().fail_create_with = Some(status);
    }

    pub fn file_fetches(&self) -> usize {
        self.state.lock().file_fetches
    }

    pub fn created(&self) -> Vec<CreateCheckRun> {
        self.state.lock().created.clone()
    }

    pub fn updates(&self) -> Vec<(u64, CheckRunOutput)> {
        self.state.lock().updates.clone()
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn fetch_diff(&self, pr: &PullRequestRef) -> Result<String, GitHubError> {
        let url = format!("/repos/{}/pulls/{}", pr.repo, pr.number);
        match self.state.lock().diffs.get(&pr.number) {
            Some(Ok(diff)) => Ok(diff.clone()),
            Some(Err(status)) => Err(GitHubError::Status {
                status: *status,
                url,
            }),
            None => Err(not_found(url)),
        }
    }

    async fn fetch_file(
        &self,
        repo: &RepoRef,
        path: &str,
        _git_ref: &str,
    ) -> Result<String, GitHubError> {
        let url = format!("/repos/{}/contents/{}", repo, path);
        let mut state = self.state.lock();
        state.file_fetches += 1;
        match state.files.get(path) {
            Some(Ok(contents)) => Ok(contents.clone()),
            Some(Err(status)) => Err(GitHubError::Status {
                status: *status,
                url,
            }),
            None => Err(not_found(url)),
        }
    }

    async fn create_check_run(
        &self,
        repo: &RepoRef,
        request: &CreateCheckRun,
    ) -> Result<u64, GitHubError> {
        let mut state = self.state.lock();
        if let Some(status) = state.fail_create_with {
            return Err(GitHubError::Status {
                status,
                url: format!("/repos/{}/check-runs", repo),
            });
        }
        state.created.push(request.clone());
        Ok(state.created.len() as u64)
    }

    async fn update_check_run(
        &self,
        _repo: &RepoRef,
        check_run_id: u64,
        output: &CheckRunOutput,
    ) -> Result<(), GitHubError> {
        self.state
            .lock()
            .updates
            .push((check_run_id, output.clone()));
        Ok(())
    }
}

/// Hands the same fake to every installation.
pub struct FakeClientFactory(pub Arc<FakeGitHub>);

impl ClientFactory for FakeClientFactory {
    fn client_for(&self, _installation_id: u64) -> Result<Arc<dyn GitHubApi>, GitHubError> {
        Ok(self.0.clone())
    }
}
