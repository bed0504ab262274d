//! Hosting service abstraction.
//!
//! The update pipeline consumes exactly five remote operations. They are
//! expressed as the [`HostingService`] trait so the pipeline can run against
//! Bitbucket Cloud in production and against a mock in tests.

mod bitbucket;
mod factory;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

pub use bitbucket::BitbucketClient;
pub use factory::{build_hosting_service, build_http_client};

/// Bitbucket Cloud REST API root.
pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0";

/// Repository identifier (workspace/slug format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub workspace: String,
    pub slug: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace, self.slug)
    }
}

/// A single-file commit pushed onto an existing branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
    pub branch: String,
    pub path: String,
    pub content: String,
    pub message: String,
    /// `Name <email>`
    pub author: String,
}

/// What the hosting service reports back about a new commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitInfo {
    pub hash: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub title: String,
    pub source_branch: String,
    pub destination_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub id: u64,
    /// Browser link, when the service provides one.
    pub url: Option<String>,
}

/// Remote operations of a code-hosting service.
///
/// Every call is made once; implementations must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostingService: Send + Sync {
    /// Hash of the latest commit on the repository's main branch.
    async fn main_branch_head(&self, repo: &RepoId) -> Result<String>;

    /// Raw content of `path` at `commit`.
    ///
    /// A missing file surfaces as [`crate::http::HttpError::NotFound`].
    async fn read_file(&self, repo: &RepoId, commit: &str, path: &str) -> Result<String>;

    /// Create branch `name` pointing at `commit`.
    async fn create_branch(&self, repo: &RepoId, name: &str, commit: &str) -> Result<()>;

    /// Commit one file onto an existing branch.
    async fn commit_file(&self, repo: &RepoId, commit: &FileCommit) -> Result<CommitInfo>;

    /// Open a pull request.
    async fn create_pull_request(
        &self,
        repo: &RepoId,
        draft: &PullRequestDraft,
    ) -> Result<PullRequest>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_display() {
        let repo = RepoId {
            workspace: "acme".into(),
            slug: "portal".into(),
        };
        assert_eq!(repo.to_string(), "acme/portal");
    }
}
