use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::analysis::terms::{PatternError, TermMatcher};
use crate::event::EventKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("bot.term_list must contain at least one item")]
    EmptyTermList,

    #[error("bot.term_list does not form a valid pattern: {0}")]
    InvalidTerms(PatternError),

    #[error("bot.term_list entry {0:?} matches empty text and would hide every other term")]
    TermMatchesEmpty(String),

    #[error("GitHub token not found in config or GITHUB_TOKEN environment variable")]
    MissingToken,
}

/// Top-level configuration loaded from term-check.toml.
///
/// Only `bot.app_id` and `bot.term_list` are required; everything else has a
/// default.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bot: BotConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Which webhook actions trigger a check, per event kind
    #[serde(default)]
    pub actions: ActionPolicy,
}

/// Identity of the app plus the user-facing text of every check run.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// GitHub App id; events triggered by other apps are discarded
    pub app_id: u64,

    /// Regex fragments joined into a single alternation
    pub term_list: Vec<String>,

    #[serde(default = "default_check_name")]
    pub check_name: String,

    #[serde(default = "default_check_success_summary")]
    pub check_success_summary: String,

    #[serde(default = "default_check_failure_summary")]
    pub check_failure_summary: String,

    #[serde(default)]
    pub check_details: String,

    #[serde(default = "default_annotation_title")]
    pub annotation_title: String,

    /// Message template; `%s` is replaced by the comma-joined matched terms
    #[serde(default = "default_annotation_body")]
    pub annotation_body: String,
}

fn default_check_name() -> String {
    "Inclusive Language".to_string()
}

fn default_check_success_summary() -> String {
    "No flagged terms found.".to_string()
}

fn default_check_failure_summary() -> String {
    "Flagged terms found, see annotations for details.".to_string()
}

fn default_annotation_title() -> String {
    "Flagged term".to_string()
}

fn default_annotation_body() -> String {
    "Consider replacing: %s".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// REST API root, overridable for GitHub Enterprise
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl GitHubConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Expiry policy of the per-repository config cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    10 * 60
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Accepted action strings per event kind.
///
/// `check_run` defaults to `rerequested` only: a `created` check run is the
/// bot's own output echoing back and must not retrigger analysis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionPolicy {
    #[serde(default = "default_check_suite_actions")]
    pub check_suite: BTreeSet<String>,

    #[serde(default = "default_check_run_actions")]
    pub check_run: BTreeSet<String>,

    #[serde(default = "default_pull_request_actions")]
    pub pull_request: BTreeSet<String>,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            check_suite: default_check_suite_actions(),
            check_run: default_check_run_actions(),
            pull_request: default_pull_request_actions(),
        }
    }
}

fn action_set(actions: &[&str]) -> BTreeSet<String> {
    actions.iter().map(|a| a.to_string()).collect()
}

fn default_check_suite_actions() -> BTreeSet<String> {
    action_set(&["requested", "rerequested"])
}

fn default_check_run_actions() -> BTreeSet<String> {
    action_set(&["rerequested"])
}

fn default_pull_request_actions() -> BTreeSet<String> {
    action_set(&["opened", "reopened", "synchronize"])
}

impl ActionPolicy {
    /// Whether `action` on an event of `kind` should trigger a check.
    pub fn accepts(&self, kind: EventKind, action: &str) -> bool {
        let accepted = match kind {
            EventKind::CheckSuite => &self.check_suite,
            EventKind::CheckRun => &self.check_run,
            EventKind::PullRequest => &self.pull_request,
        };
        accepted.contains(action)
    }
}

impl Config {
    /// Load and validate configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the bot cannot run with, returning the compiled
    /// term matcher.
    pub fn validate(&self) -> Result<TermMatcher, ConfigError> {
        if self.bot.term_list.is_empty() {
            return Err(ConfigError::EmptyTermList);
        }
        TermMatcher::new(&self.bot.term_list).map_err(|err| match err {
            PatternError::MatchesEmpty { term } => ConfigError::TermMatchesEmpty(term),
            err => ConfigError::InvalidTerms(err),
        })
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Result<String, ConfigError> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .ok_or(ConfigError::MissingToken)
    }
}
