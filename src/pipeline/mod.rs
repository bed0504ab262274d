//! Update pipeline - orchestrates a single dependency bump.
//!
//! The pipeline coordinates:
//! - Reading the head commit of the main branch
//! - Reading and interpreting the manifest at that commit
//! - Detecting and patching the requested dependency
//! - Publishing the patch on a new branch and opening a pull request

mod orchestrator;
mod state;

use std::fmt;

use thiserror::Error;

use crate::hosting::{CommitInfo, FileCommit, PullRequest};

pub use orchestrator::UpdatePipeline;
pub use state::{PipelineState, PublishStep};

/// The package to bump and the version to bump it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub package: String,
    pub version: String,
}

/// Everything needed to publish the patched manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUnit {
    pub branch: String,
    pub base_commit: String,
    pub path: String,
    pub content: String,
    pub message: String,
    pub author: String,
}

impl UpdateUnit {
    pub fn file_commit(&self) -> FileCommit {
        FileCommit {
            branch: self.branch.clone(),
            path: self.path.clone(),
            content: self.content.clone(),
            message: self.message.clone(),
            author: self.author.clone(),
        }
    }
}

/// How a run ended when nothing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The manifest does not declare the package. Nothing was written.
    NotDeclared,
    /// The package is already at the requested version. Nothing was written.
    UpToDate { version: String },
    /// The patch was published and a pull request opened.
    Opened {
        previous_version: String,
        commit: CommitInfo,
        pull_request: PullRequest,
    },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NotDeclared => write!(f, "Nothing to update"),
            RunOutcome::UpToDate { version } => write!(f, "Already up to date ({})", version),
            RunOutcome::Opened { pull_request, .. } => match &pull_request.url {
                Some(url) => write!(f, "Done: pull request #{} {}", pull_request.id, url),
                None => write!(f, "Done: pull request #{}", pull_request.id),
            },
        }
    }
}

/// A fatal failure of one pipeline step.
///
/// Writes made by earlier steps are not rolled back; `created_branch` names
/// the branch left behind, if any, so it can be cleaned up by hand.
#[derive(Debug, Error)]
#[error("{step} failed{}", leftover_hint(.created_branch, .committed))]
pub struct PublishError {
    pub step: PublishStep,
    pub created_branch: Option<String>,
    pub committed: bool,
    #[source]
    pub source: anyhow::Error,
}

fn leftover_hint(created_branch: &Option<String>, committed: &bool) -> String {
    match (created_branch, committed) {
        (Some(branch), true) => format!(
            " (branch '{}' was created and the change committed; remove it manually)",
            branch
        ),
        (Some(branch), false) => {
            format!(" (branch '{}' was created; remove it manually)", branch)
        }
        (None, _) => String::new(),
    }
}
