pub mod types;

pub use types::{Annotation, CheckRunResult, Conclusion};

use chrono::Utc;
use colored::Colorize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::analysis::TermMatch;
use crate::config::BotConfig;
use crate::github::{CheckRunOutput, CreateCheckRun, GitHubApi, GitHubError};
use crate::pr::{PullRequestRef, RepoRef};

/// GitHub rejects check run requests carrying more annotations than this.
pub const MAX_ANNOTATIONS_PER_REQUEST: usize = 50;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to POST check run for {head_sha}: {source}")]
    Submit {
        head_sha: String,
        #[source]
        source: GitHubError,
    },
}

/// Fill the single slot of `template` with the comma-joined terms.
///
/// The slot is `%s` or `%v`, optionally with a width (`%10s` pads on the
/// left, `%-10s` on the right). `%%` renders a literal `%`. Output stops at
/// the first directive that cannot be filled (a second slot, any other verb,
/// a trailing `%`), so a template without a slot renders as itself and a
/// malformed one renders as its well-formed prefix.
pub fn render_message(template: &str, terms: &[String]) -> String {
    let joined = terms.join(", ");
    let mut out = String::with_capacity(template.len() + joined.len());
    let mut slot_filled = false;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let left_align = chars.next_if_eq(&'-').is_some();
        let mut width = 0usize;
        while let Some(digit) = chars.peek().and_then(|d| d.to_digit(10)) {
            width = width.saturating_mul(10).saturating_add(digit as usize);
            chars.next();
        }
        match chars.next() {
            Some('s' | 'v') if !slot_filled => {
                if left_align {
                    out.push_str(&format!("{:<width$}", joined));
                } else {
                    out.push_str(&format!("{:>width$}", joined));
                }
                slot_filled = true;
            }
            _ => break,
        }
    }
    out
}

/// Turns term matches into warning annotations.
#[derive(Debug, Clone)]
pub struct AnnotationBuilder {
    title: String,
    body_template: String,
}

impl AnnotationBuilder {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            title: config.annotation_title.clone(),
            body_template: config.annotation_body.clone(),
        }
    }

    pub fn build(&self, term_match: &TermMatch) -> Annotation {
        let message = render_message(&self.body_template, &term_match.terms);
        Annotation::warning(&term_match.path, term_match.line, &self.title, &message)
    }
}

/// Assembles and submits check runs.
#[derive(Debug, Clone)]
pub struct CheckRunReporter {
    check_name: String,
    success_summary: String,
    failure_summary: String,
    details: String,
}

impl CheckRunReporter {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            check_name: config.check_name.clone(),
            success_summary: config.check_success_summary.clone(),
            failure_summary: config.check_failure_summary.clone(),
            details: config.check_details.clone(),
        }
    }

    /// Any annotation turns the conclusion neutral; none means success.
    pub fn result(&self, pr: &PullRequestRef, annotations: Vec<Annotation>) -> CheckRunResult {
        let (conclusion, summary) = if annotations.is_empty() {
            (Conclusion::Success, &self.success_summary)
        } else {
            (Conclusion::Neutral, &self.failure_summary)
        };
        CheckRunResult {
            name: self.check_name.clone(),
            head_branch: pr.head_ref.clone(),
            head_sha: pr.head_sha.clone(),
            conclusion,
            title: self.check_name.clone(),
            text: self.details.clone(),
            summary: summary.clone(),
            annotations,
        }
    }

    /// Create the check run on GitHub, returning its id.
    ///
    /// The first annotation batch rides on the create request; later batches
    /// are appended with updates. `annotations_count` is always the total.
    #[instrument(skip_all, fields(repo = %repo, head_sha = %result.head_sha, conclusion = %result.conclusion))]
    pub async fn submit(
        &self,
        api: &dyn GitHubApi,
        repo: &RepoRef,
        result: &CheckRunResult,
    ) -> Result<u64, ReportError> {
        let submit_err = |source| ReportError::Submit {
            head_sha: result.head_sha.clone(),
            source,
        };
        let output = |batch: &[Annotation]| CheckRunOutput {
            title: result.title.clone(),
            summary: result.summary.clone(),
            text: result.text.clone(),
            annotations_count: result.annotations.len(),
            annotations: batch.to_vec(),
        };

        let mut batches = result.annotations.chunks(MAX_ANNOTATIONS_PER_REQUEST);
        let request = CreateCheckRun {
            name: result.name.clone(),
            head_branch: result.head_branch.clone(),
            head_sha: result.head_sha.clone(),
            status: "completed",
            completed_at: Utc::now(),
            conclusion: result.conclusion,
            output: output(batches.next().unwrap_or(&[])),
        };
        let check_run_id = api
            .create_check_run(repo, &request)
            .await
            .map_err(submit_err)?;

        for batch in batches {
            api.update_check_run(repo, check_run_id, &output(batch))
                .await
                .map_err(submit_err)?;
        }
        debug!(check_run_id, annotations = result.annotations.len(), "check run submitted");
        Ok(check_run_id)
    }
}

/// Format and print a check run to the terminal with colors.
///
/// refs/heads/feature @ abc123
/// ═══ Inclusive Language: NEUTRAL ═══
/// Flagged terms found, see annotations for details.
///   • config.py:2 Flagged term: Consider replacing: slave
pub fn print_check_run(result: &CheckRunResult) {
    println!();
    println!("{} @ {}", result.head_branch, result.head_sha);
    println!(
        "═══ {}: {} ═══",
        result.name,
        colorize_conclusion(result.conclusion)
    );
    println!("{}", result.summary);
    if !result.text.is_empty() {
        println!("{}", result.text.dimmed());
    }
    for annotation in &result.annotations {
        println!(
            "  • {}:{} {}: {}",
            annotation.path, annotation.start_line, annotation.title, annotation.message
        );
    }
    println!("{} annotation(s)", result.annotations.len());
    println!();
}

fn colorize_conclusion(conclusion: Conclusion) -> colored::ColoredString {
    match conclusion {
        Conclusion::Success => conclusion.to_string().green().bold(),
        Conclusion::Neutral => conclusion.to_string().yellow().bold(),
    }
}
