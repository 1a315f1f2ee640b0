//! Event routing: decides whether a delivery warrants a check, then runs
//! analysis and reporting once per implicated pull request.

use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, Instrument};

use crate::analysis::{AnalysisError, DiffAnalyzer, RepoConfigCache};
use crate::config::{ActionPolicy, Config, ConfigError};
use crate::event::{Event, EventKind};
use crate::github::{ClientFactory, GitHubApi};
use crate::pr::PullRequestRef;
use crate::report::{self, AnnotationBuilder, CheckRunReporter, CheckRunResult, ReportError};

/// Where finished check runs go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Post to GitHub
    Submit,
    /// Print to the terminal only
    Print,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Why a delivery was dropped without processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    /// Triggered by a different GitHub App
    ForeignApp { app_id: u64 },
    /// Action not in the policy for this event kind
    Action { kind: EventKind, action: String },
    /// Event name the bot does not handle
    Unhandled { name: String },
}

/// What [`Bot::handle_event`] did with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Discarded(Discard),
    Processed { succeeded: usize, failed: usize },
}

/// Per-PR work shared by every spawned task.
struct Pipeline {
    cache: Arc<RepoConfigCache>,
    analyzer: DiffAnalyzer,
    annotations: AnnotationBuilder,
    reporter: CheckRunReporter,
    mode: ReportMode,
}

impl Pipeline {
    async fn run(
        &self,
        api: &dyn GitHubApi,
        pr: &PullRequestRef,
    ) -> Result<CheckRunResult, PipelineError> {
        debug!("creating check run");
        let repo_config = self.cache.get(api, &pr.repo, &pr.head_sha).await;
        let matches = self.analyzer.analyze(api, pr, &repo_config).await?;
        let annotations = matches.iter().map(|m| self.annotations.build(m)).collect();
        let result = self.reporter.result(pr, annotations);

        match self.mode {
            ReportMode::Submit => {
                self.reporter.submit(api, &pr.repo, &result).await?;
                debug!("successfully created check run");
            }
            ReportMode::Print => report::print_check_run(&result),
        }
        Ok(result)
    }
}

/// The GitHub App's event handler.
pub struct Bot {
    app_id: u64,
    policy: ActionPolicy,
    clients: Arc<dyn ClientFactory>,
    pipeline: Arc<Pipeline>,
}

impl Bot {
    /// Build a bot from validated configuration. `cache` is shared with the
    /// caller so it can own the sweeper task.
    pub fn new(
        config: &Config,
        clients: Arc<dyn ClientFactory>,
        cache: Arc<RepoConfigCache>,
        mode: ReportMode,
    ) -> Result<Self, ConfigError> {
        let matcher = config.validate()?;
        Ok(Self {
            app_id: config.bot.app_id,
            policy: config.actions.clone(),
            clients,
            pipeline: Arc::new(Pipeline {
                cache,
                analyzer: DiffAnalyzer::new(matcher),
                annotations: AnnotationBuilder::new(&config.bot),
                reporter: CheckRunReporter::new(&config.bot),
                mode,
            }),
        })
    }

    /// Validate `event` against the app identity and action policy, then
    /// process each implicated pull request concurrently. A failure on one
    /// pull request never affects the others.
    pub async fn handle_event(&self, event: &Event) -> Dispatch {
        let Some(kind) = event.kind() else {
            let name = match event {
                Event::Unhandled { name } => name.clone(),
                _ => String::new(),
            };
            debug!(event = %name, "unhandled event received, discarding");
            return Dispatch::Discarded(Discard::Unhandled { name });
        };
        info!(event = %kind, "event received");

        if let Some(app_id) = event.app_id() {
            if app_id != self.app_id {
                error!(
                    event_app_id = app_id,
                    bot_app_id = self.app_id,
                    "event app id does not match bot app id"
                );
                return Dispatch::Discarded(Discard::ForeignApp { app_id });
            }
        }

        let action = event.action().unwrap_or_default();
        if !self.policy.accepts(kind, action) {
            debug!(event = %kind, action = %action, "unhandled action received, discarding");
            return Dispatch::Discarded(Discard::Action {
                kind,
                action: action.to_string(),
            });
        }

        let pull_requests = event.pull_requests();
        let installation_id = event.installation_id().unwrap_or_default();
        let api = match self.clients.client_for(installation_id) {
            Ok(api) => api,
            Err(err) => {
                error!(installation = installation_id, error = %err, "failed to create installation client");
                return Dispatch::Processed {
                    succeeded: 0,
                    failed: pull_requests.len(),
                };
            }
        };

        let mut tasks = JoinSet::new();
        for pr in pull_requests.iter().cloned() {
            let pipeline = self.pipeline.clone();
            let api = api.clone();
            let span = info_span!(
                "pull_request",
                repo = %pr.repo,
                pr = pr.number,
                head_sha = %pr.head_sha
            );
            tasks.spawn(
                async move {
                    let outcome = pipeline.run(api.as_ref(), &pr).await;
                    if let Err(err) = &outcome {
                        error!(head_sha = %pr.head_sha, error = %err, "failed to process pull request");
                    }
                    outcome.is_ok()
                }
                .instrument(span),
            );
        }

        let (mut succeeded, mut failed) = (0, 0);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(err) => {
                    error!(error = %err, "pull request task panicked");
                    failed += 1;
                }
            }
        }
        info!(succeeded, failed, "event processed");
        Dispatch::Processed { succeeded, failed }
    }
}
