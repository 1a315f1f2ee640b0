pub mod diff;
pub mod types;

pub use types::{ChangeMode, Diff, LineMode, PullRequestRef, RepoRef};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("Failed to parse diff: {0}")]
    DiffParse(String),
}
