use crate::pr::{PullRequestRef, RepoRef};

/// The webhook event kinds the bot acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CheckSuite,
    CheckRun,
    PullRequest,
}

impl EventKind {
    /// Value of the `X-GitHub-Event` header for this kind.
    pub fn header_name(self) -> &'static str {
        match self {
            EventKind::CheckSuite => "check_suite",
            EventKind::CheckRun => "check_run",
            EventKind::PullRequest => "pull_request",
        }
    }

    pub fn from_header_name(name: &str) -> Option<Self> {
        match name {
            "check_suite" => Some(EventKind::CheckSuite),
            "check_run" => Some(EventKind::CheckRun),
            "pull_request" => Some(EventKind::PullRequest),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header_name())
    }
}

/// A `check_suite` or `check_run` delivery. Both carry the originating app
/// and zero or more pull requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckEvent {
    pub action: String,
    pub app_id: u64,
    pub repo: RepoRef,
    pub installation_id: u64,
    pub pull_requests: Vec<PullRequestRef>,
}

/// A `pull_request` delivery; always exactly one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: String,
    pub repo: RepoRef,
    pub installation_id: u64,
    pub pull_request: PullRequestRef,
}

/// A decoded webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CheckSuite(CheckEvent),
    CheckRun(CheckEvent),
    PullRequest(PullRequestEvent),
    /// Any event name the bot does not act on
    Unhandled { name: String },
}

impl Event {
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Event::CheckSuite(_) => Some(EventKind::CheckSuite),
            Event::CheckRun(_) => Some(EventKind::CheckRun),
            Event::PullRequest(_) => Some(EventKind::PullRequest),
            Event::Unhandled { .. } => None,
        }
    }

    pub fn action(&self) -> Option<&str> {
        match self {
            Event::CheckSuite(e) | Event::CheckRun(e) => Some(&e.action),
            Event::PullRequest(e) => Some(&e.action),
            Event::Unhandled { .. } => None,
        }
    }

    /// App that triggered the event. Pull request deliveries don't carry one.
    pub fn app_id(&self) -> Option<u64> {
        match self {
            Event::CheckSuite(e) | Event::CheckRun(e) => Some(e.app_id),
            Event::PullRequest(_) | Event::Unhandled { .. } => None,
        }
    }

    pub fn installation_id(&self) -> Option<u64> {
        match self {
            Event::CheckSuite(e) | Event::CheckRun(e) => Some(e.installation_id),
            Event::PullRequest(e) => Some(e.installation_id),
            Event::Unhandled { .. } => None,
        }
    }

    pub fn pull_requests(&self) -> &[PullRequestRef] {
        match self {
            Event::CheckSuite(e) | Event::CheckRun(e) => &e.pull_requests,
            Event::PullRequest(e) => std::slice::from_ref(&e.pull_request),
            Event::Unhandled { .. } => &[],
        }
    }
}
