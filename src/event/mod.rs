//! Decoding of raw webhook payloads into [`Event`] values.
//!
//! The event name comes from the `X-GitHub-Event` header. Unknown names
//! decode to [`Event::Unhandled`] rather than an error.

pub mod types;

pub use types::{CheckEvent, Event, EventKind, PullRequestEvent};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::pr::{PullRequestRef, RepoRef};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Malformed {event} payload: {source}")]
    Json {
        event: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    id: u64,
    name: String,
    owner: RawOwner,
}

impl From<RawRepository> for RepoRef {
    fn from(raw: RawRepository) -> Self {
        RepoRef {
            id: raw.id,
            owner: raw.owner.login,
            name: raw.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInstallation {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawApp {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawHead {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    head: RawHead,
}

impl RawPullRequest {
    fn into_ref(self, repo: &RepoRef) -> PullRequestRef {
        PullRequestRef {
            number: self.number,
            head_ref: self.head.git_ref,
            head_sha: self.head.sha,
            repo: repo.clone(),
        }
    }
}

/// The `check_suite` / `check_run` object inside a check payload.
#[derive(Debug, Deserialize)]
struct RawCheck {
    app: RawApp,
    #[serde(default)]
    pull_requests: Vec<RawPullRequest>,
}

#[derive(Debug, Deserialize)]
struct RawCheckSuitePayload {
    action: String,
    check_suite: RawCheck,
    repository: RawRepository,
    installation: RawInstallation,
}

#[derive(Debug, Deserialize)]
struct RawCheckRunPayload {
    action: String,
    check_run: RawCheck,
    repository: RawRepository,
    installation: RawInstallation,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    repository: RawRepository,
    installation: RawInstallation,
}

fn check_event(
    action: String,
    check: RawCheck,
    repository: RawRepository,
    installation: RawInstallation,
) -> CheckEvent {
    let repo = RepoRef::from(repository);
    let pull_requests = check
        .pull_requests
        .into_iter()
        .map(|pr| pr.into_ref(&repo))
        .collect();
    CheckEvent {
        action,
        app_id: check.app.id,
        repo,
        installation_id: installation.id,
        pull_requests,
    }
}

/// Decode a webhook payload given its `X-GitHub-Event` name.
pub fn decode(event_name: &str, payload: &[u8]) -> Result<Event, EventError> {
    let Some(kind) = EventKind::from_header_name(event_name) else {
        debug!(event = %event_name, "unrecognized event name");
        return Ok(Event::Unhandled {
            name: event_name.to_string(),
        });
    };
    let json_err = |source| EventError::Json {
        event: kind,
        source,
    };

    let event = match kind {
        EventKind::CheckSuite => {
            let raw: RawCheckSuitePayload = serde_json::from_slice(payload).map_err(json_err)?;
            Event::CheckSuite(check_event(
                raw.action,
                raw.check_suite,
                raw.repository,
                raw.installation,
            ))
        }
        EventKind::CheckRun => {
            let raw: RawCheckRunPayload = serde_json::from_slice(payload).map_err(json_err)?;
            Event::CheckRun(check_event(
                raw.action,
                raw.check_run,
                raw.repository,
                raw.installation,
            ))
        }
        EventKind::PullRequest => {
            let raw: RawPullRequestPayload = serde_json::from_slice(payload).map_err(json_err)?;
            let repo = RepoRef::from(raw.repository);
            Event::PullRequest(PullRequestEvent {
                action: raw.action,
                pull_request: raw.pull_request.into_ref(&repo),
                repo,
                installation_id: raw.installation.id,
            })
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPOSITORY: &str = r#"{ "id": 77, "name": "repo", "owner": { "login": "org" } }"#;

    fn check_suite_payload(action: &str) -> String {
        format!(
            r#"{{
                "action": "{action}",
                "check_suite": {{
                    "id": 5,
                    "app": {{ "id": 1234, "slug": "term-check" }},
                    "pull_requests": [
                        {{ "number": 1, "head": {{ "ref": "feature-a", "sha": "aaa" }}, "base": {{ "ref": "main", "sha": "000" }} }},
                        {{ "number": 2, "head": {{ "ref": "feature-b", "sha": "bbb" }}, "base": {{ "ref": "main", "sha": "000" }} }}
                    ]
                }},
                "repository": {REPOSITORY},
                "installation": {{ "id": 42 }}
            }}"#
        )
    }

    #[test]
    fn test_decode_check_suite() {
        let event = decode("check_suite", check_suite_payload("requested").as_bytes()).unwrap();
        assert_eq!(event.kind(), Some(EventKind::CheckSuite));
        assert_eq!(event.action(), Some("requested"));
        assert_eq!(event.app_id(), Some(1234));
        assert_eq!(event.installation_id(), Some(42));
        let prs = event.pull_requests();
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[1].number, 2);
        assert_eq!(prs[1].head_ref, "feature-b");
        assert_eq!(prs[1].head_sha, "bbb");
        assert_eq!(prs[1].repo.to_string(), "org/repo");
        assert_eq!(prs[1].repo.id, 77);
    }

    #[test]
    fn test_decode_check_run_without_pull_requests() {
        let payload = format!(
            r#"{{
                "action": "rerequested",
                "check_run": {{ "app": {{ "id": 9 }} }},
                "repository": {REPOSITORY},
                "installation": {{ "id": 1 }}
            }}"#
        );
        let event = decode("check_run", payload.as_bytes()).unwrap();
        assert_eq!(event.kind(), Some(EventKind::CheckRun));
        assert!(event.pull_requests().is_empty());
    }

    #[test]
    fn test_decode_pull_request() {
        let payload = format!(
            r#"{{
                "action": "synchronize",
                "number": 12,
                "pull_request": {{ "number": 12, "head": {{ "ref": "topic", "sha": "cafe" }} }},
                "repository": {REPOSITORY},
                "installation": {{ "id": 3 }}
            }}"#
        );
        let event = decode("pull_request", payload.as_bytes()).unwrap();
        assert_eq!(event.app_id(), None);
        assert_eq!(event.pull_requests().len(), 1);
        assert_eq!(event.pull_requests()[0].head_sha, "cafe");
    }

    #[test]
    fn test_unknown_event_is_unhandled_not_error() {
        let event = decode("push", b"not even json").unwrap();
        assert_eq!(
            event,
            Event::Unhandled {
                name: "push".to_string()
            }
        );
        assert!(event.pull_requests().is_empty());
    }

    #[test]
    fn test_malformed_payload_is_error() {
        let err = decode("check_suite", br#"{"action": "requested"}"#).unwrap_err();
        assert!(err.to_string().contains("check_suite"));
    }
}
