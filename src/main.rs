mod analysis;
mod bot;
mod config;
mod event;
mod github;
mod pr;
mod report;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use crate::analysis::{DiffAnalyzer, IgnoreFilter, RepoConfigCache};
use crate::bot::{Bot, Dispatch, ReportMode};
use crate::github::{RestClient, TokenClientFactory};
use crate::pr::PullRequestRef;
use crate::report::{AnnotationBuilder, CheckRunReporter};

/// term-check: GitHub App that scans pull request diffs for disallowed
/// terms and reports them as check run annotations.
#[derive(Parser, Debug)]
#[command(name = "term-check", version, about)]
struct Cli {
    /// Path to the bot configuration file
    #[arg(short, long, default_value = "term-check.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one webhook delivery read from a file
    Deliver {
        /// Value of the X-GitHub-Event header (e.g., check_suite)
        #[arg(short, long)]
        event: String,

        /// File containing the JSON payload
        #[arg(short, long)]
        payload: PathBuf,

        /// Print check runs instead of posting them to GitHub
        #[arg(long)]
        dry_run: bool,
    },

    /// Scan a local unified diff without contacting GitHub
    Scan {
        /// Diff file, as produced by `git diff`
        diff: PathBuf,

        /// Additional .gitignore-style patterns of paths to skip
        #[arg(short, long)]
        ignore: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!(path = %cli.config.display(), "loading configuration");
    let config = config::Config::load_from(&cli.config)?;

    match cli.command {
        Command::Deliver {
            event,
            payload,
            dry_run,
        } => deliver(&config, &event, &payload, dry_run).await,
        Command::Scan { diff, ignore } => scan(&config, &diff, &ignore),
    }
}

async fn deliver(
    config: &config::Config,
    event_name: &str,
    payload_path: &Path,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = std::fs::read(payload_path)?;
    let event = event::decode(event_name, &payload)?;
    debug!(?event, "decoded event");

    let client = RestClient::new(
        &config.github.api_url,
        &config.github_token()?,
        config.github.request_timeout(),
    )?;
    let cache = Arc::new(RepoConfigCache::new(config.cache.ttl()));
    let sweeper = cache.spawn_sweeper(config.cache.sweep_interval());
    let mode = if dry_run {
        ReportMode::Print
    } else {
        ReportMode::Submit
    };
    let bot = Bot::new(
        config,
        Arc::new(TokenClientFactory::new(client)),
        cache,
        mode,
    )?;

    let span = info_span!("deliver", event = %event_name);
    match bot.handle_event(&event).instrument(span).await {
        Dispatch::Discarded(reason) => info!(?reason, "delivery discarded"),
        Dispatch::Processed { succeeded, failed } => {
            info!(succeeded, failed, "delivery processed")
        }
    }
    sweeper.abort();
    Ok(())
}

fn scan(
    config: &config::Config,
    diff_path: &Path,
    ignore: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(diff_path)?;
    let diff = pr::diff::parse_diff(&raw)?;
    info!(files = diff.files.len(), "parsed diff");
    for file in &diff.files {
        debug!(
            path = %file.path,
            old_path = ?file.old_path,
            mode = ?file.mode,
            additions = file.additions(),
            deletions = file.deletions(),
            "diff file"
        );
    }

    let analyzer = DiffAnalyzer::new(config.validate()?);
    let matches = analyzer.scan(&diff, &IgnoreFilter::new(ignore)?);

    let builder = AnnotationBuilder::new(&config.bot);
    let annotations = matches.iter().map(|m| builder.build(m)).collect();
    let local = PullRequestRef {
        number: 0,
        head_ref: diff_path.display().to_string(),
        head_sha: "local".to_string(),
        repo: pr::RepoRef {
            id: 0,
            owner: "local".to_string(),
            name: "local".to_string(),
        },
    };
    let result = CheckRunReporter::new(&config.bot).result(&local, annotations);
    report::print_check_run(&result);
    info!(conclusion = %result.conclusion, "done");
    Ok(())
}
