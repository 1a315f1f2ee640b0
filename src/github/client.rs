use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{CheckRunOutput, CreateCheckRun, GitHubApi, GitHubError};
use crate::pr::{PullRequestRef, RepoRef};

const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.diff";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

/// reqwest-backed [`GitHubApi`] authenticated with a bearer token.
pub struct RestClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

#[derive(Deserialize)]
struct CreatedCheckRun {
    id: u64,
}

impl RestClient {
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("term-check"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn repo_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.api_url, repo.owner, repo.name)
    }
}

fn status_error(response: &reqwest::Response) -> GitHubError {
    GitHubError::Status {
        status: response.status().as_u16(),
        url: response.url().to_string(),
    }
}

#[async_trait]
impl GitHubApi for RestClient {
    #[instrument(skip(self, pr), fields(repo = %pr.repo, pr = pr.number, head_sha = %pr.head_sha))]
    async fn fetch_diff(&self, pr: &PullRequestRef) -> Result<String, GitHubError> {
        let url = format!("{}/pulls/{}", self.repo_url(&pr.repo), pr.number);
        debug!("fetching PR diff from GitHub API");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, DIFF_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(status_error(&response));
        }
        let diff_text = response.text().await?;
        debug!(diff_bytes = diff_text.len(), "received PR diff");
        Ok(diff_text)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn fetch_file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<String, GitHubError> {
        let url = format!("{}/contents/{}", self.repo_url(repo), path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, RAW_MEDIA_TYPE)
            .query(&[("ref", git_ref)])
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(status_error(&response));
        }
        Ok(response.text().await?)
    }

    #[instrument(skip(self, repo, request), fields(repo = %repo, head_sha = %request.head_sha))]
    async fn create_check_run(
        &self,
        repo: &RepoRef,
        request: &CreateCheckRun,
    ) -> Result<u64, GitHubError> {
        let url = format!("{}/check-runs", self.repo_url(repo));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(&response));
        }
        let created = response.json::<CreatedCheckRun>().await?;
        debug!(check_run_id = created.id, "created check run");
        Ok(created.id)
    }

    #[instrument(skip(self, repo, output), fields(repo = %repo))]
    async fn update_check_run(
        &self,
        repo: &RepoRef,
        check_run_id: u64,
        output: &CheckRunOutput,
    ) -> Result<(), GitHubError> {
        #[derive(serde::Serialize)]
        struct UpdateCheckRun<'a> {
            output: &'a CheckRunOutput,
        }

        let url = format!("{}/check-runs/{}", self.repo_url(repo), check_run_id);
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(&UpdateCheckRun { output })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(&response));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::{Annotation, Conclusion};
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo() -> RepoRef {
        RepoRef {
            id: 1,
            owner: "org".to_string(),
            name: "repo".to_string(),
        }
    }

    fn pull_request() -> PullRequestRef {
        PullRequestRef {
            number: 42,
            head_ref: "feature".to_string(),
            head_sha: "abc123".to_string(),
            repo: repo(),
        }
    }

    fn client(server: &MockServer) -> RestClient {
        RestClient::new(&server.uri(), "test-token", Duration::from_secs(5)).unwrap()
    }

    fn output(annotations: Vec<Annotation>) -> CheckRunOutput {
        CheckRunOutput {
            title: "Inclusive Language".to_string(),
            summary: "summary".to_string(),
            text: "details".to_string(),
            annotations_count: annotations.len(),
            annotations,
        }
    }

    #[tokio::test]
    async fn test_fetch_diff_requests_diff_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/pulls/42"))
            .and(header("accept", DIFF_MEDIA_TYPE))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("diff --git a/x b/x\n"))
            .expect(1)
            .mount(&server)
            .await;

        let diff = client(&server).fetch_diff(&pull_request()).await.unwrap();
        assert_eq!(diff, "diff --git a/x b/x\n");
    }

    #[tokio::test]
    async fn test_fetch_diff_non_200_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/pulls/42"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).fetch_diff(&pull_request()).await.unwrap_err();
        assert!(matches!(err, GitHubError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_file_passes_ref() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/contents/.github/inclusive_lang.yaml"))
            .and(query_param("ref", "abc123"))
            .and(header("accept", RAW_MEDIA_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_string("ignore:\n  - docs/\n"))
            .mount(&server)
            .await;

        let body = client(&server)
            .fetch_file(&repo(), ".github/inclusive_lang.yaml", "abc123")
            .await
            .unwrap();
        assert!(body.contains("docs/"));
    }

    #[tokio::test]
    async fn test_create_check_run_posts_payload_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/org/repo/check-runs"))
            .and(body_partial_json(serde_json::json!({
                "name": "Inclusive Language",
                "head_sha": "abc123",
                "status": "completed",
                "conclusion": "neutral",
                "output": {
                    "annotations_count": 1,
                    "annotations": [{
                        "path": "config.py",
                        "start_line": 3,
                        "end_line": 3,
                        "annotation_level": "warning"
                    }]
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 555 })))
            .expect(1)
            .mount(&server)
            .await;

        let request = CreateCheckRun {
            name: "Inclusive Language".to_string(),
            head_branch: "feature".to_string(),
            head_sha: "abc123".to_string(),
            status: "completed",
            completed_at: Utc::now(),
            conclusion: Conclusion::Neutral,
            output: output(vec![Annotation::warning(
                "config.py",
                3,
                "Flagged term",
                "Found: slave",
            )]),
        };
        let id = client(&server)
            .create_check_run(&repo(), &request)
            .await
            .unwrap();
        assert_eq!(id, 555);
    }

    #[tokio::test]
    async fn test_update_check_run_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/org/repo/check-runs/555"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server)
            .update_check_run(&repo(), 555, &output(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Status { status: 500, .. }));
    }
}
