//! Bitbucket Cloud implementation of [`HostingService`].

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::Url;

use crate::http::HttpClient;

use super::{CommitInfo, FileCommit, HostingService, PullRequest, PullRequestDraft, RepoId};

/// Bitbucket API request and response types (internal).
mod api {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct SrcMeta {
        pub commit: CommitRef,
    }

    #[derive(Serialize, Deserialize, Debug)]
    pub struct CommitRef {
        pub hash: String,
    }

    #[derive(Serialize, Debug)]
    pub struct NewBranch<'a> {
        pub name: &'a str,
        pub target: CommitRef,
    }

    #[derive(Deserialize, Debug)]
    pub struct Branch {
        pub name: String,
    }

    #[derive(Serialize, Debug)]
    pub struct NewPullRequest<'a> {
        pub title: &'a str,
        pub source: BranchSpec<'a>,
        pub destination: BranchSpec<'a>,
    }

    #[derive(Serialize, Debug)]
    pub struct BranchSpec<'a> {
        pub branch: BranchName<'a>,
    }

    #[derive(Serialize, Debug)]
    pub struct BranchName<'a> {
        pub name: &'a str,
    }

    #[derive(Deserialize, Debug)]
    pub struct PullRequest {
        pub id: u64,
        #[serde(default)]
        pub links: Option<Links>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Links {
        pub html: Option<Link>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Link {
        pub href: String,
    }
}

/// Bitbucket Cloud REST 2.0 client.
pub struct BitbucketClient {
    http_client: HttpClient,
    api_url: String,
}

impl BitbucketClient {
    /// Create from an existing HttpClient.
    pub fn from_http_client(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn repo_url(&self, repo: &RepoId) -> String {
        format!(
            "{}/repositories/{}/{}",
            self.api_url(),
            repo.workspace,
            repo.slug
        )
    }

    /// `.../src/<commit>/<path>` with every path segment percent-encoded, so
    /// `#` or `?` in a directory name stay part of the path.
    fn file_url(&self, repo: &RepoId, commit: &str, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.repo_url(repo))
            .with_context(|| format!("Invalid API URL {}", self.api_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("API URL {} cannot carry a path", self.api_url))?
            .push("src")
            .push(commit)
            .extend(path.split('/'));
        Ok(url)
    }
}

/// Extracts the commit hash from a `.../commit/<hash>` location.
fn hash_from_location(location: &str) -> Option<String> {
    let (_, rest) = location.rsplit_once("/commit/")?;
    let hash = rest.trim_end_matches('/');
    if hash.is_empty() || hash.contains('/') {
        None
    } else {
        Some(hash.to_string())
    }
}

#[async_trait]
impl HostingService for BitbucketClient {
    #[tracing::instrument(skip(self))]
    async fn main_branch_head(&self, repo: &RepoId) -> Result<String> {
        let url = format!("{}/src", self.repo_url(repo));
        debug!("Fetching main branch head from {}...", url);

        let meta: api::SrcMeta = self
            .http_client
            .get_json(&url, &[("format", "meta")])
            .await
            .with_context(|| format!("Failed to read main branch head of {}", repo))?;

        Ok(meta.commit.hash)
    }

    #[tracing::instrument(skip(self))]
    async fn read_file(&self, repo: &RepoId, commit: &str, path: &str) -> Result<String> {
        let url = self.file_url(repo, commit, path)?;
        debug!("Fetching file content from {}...", url);

        self.http_client
            .get_text(url.as_str(), &[])
            .await
            .with_context(|| format!("Failed to read {} at {}", path, commit))
    }

    #[tracing::instrument(skip(self))]
    async fn create_branch(&self, repo: &RepoId, name: &str, commit: &str) -> Result<()> {
        let url = format!("{}/refs/branches", self.repo_url(repo));
        let body = api::NewBranch {
            name,
            target: api::CommitRef {
                hash: commit.to_string(),
            },
        };
        debug!("Creating branch {} at {} via {}...", name, commit, url);

        let branch: api::Branch = self
            .http_client
            .post_json(&url, &body)
            .await
            .with_context(|| format!("Failed to create branch '{}'", name))?;

        debug!("Created branch {}", branch.name);
        Ok(())
    }

    #[tracing::instrument(skip(self, commit), fields(branch = %commit.branch, path = %commit.path))]
    async fn commit_file(&self, repo: &RepoId, commit: &FileCommit) -> Result<CommitInfo> {
        let url = format!("{}/src", self.repo_url(repo));
        let fields = [
            (commit.path.as_str(), commit.content.as_str()),
            ("message", commit.message.as_str()),
            ("author", commit.author.as_str()),
            ("branch", commit.branch.as_str()),
        ];
        debug!("Committing {} to {} via {}...", commit.path, commit.branch, url);

        let location = self
            .http_client
            .post_form(&url, &fields)
            .await
            .with_context(|| {
                format!(
                    "Failed to commit {} to branch '{}'",
                    commit.path, commit.branch
                )
            })?;

        Ok(CommitInfo {
            hash: location.as_deref().and_then(hash_from_location),
            location,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn create_pull_request(
        &self,
        repo: &RepoId,
        draft: &PullRequestDraft,
    ) -> Result<PullRequest> {
        let url = format!("{}/pullrequests", self.repo_url(repo));
        let body = api::NewPullRequest {
            title: &draft.title,
            source: api::BranchSpec {
                branch: api::BranchName {
                    name: &draft.source_branch,
                },
            },
            destination: api::BranchSpec {
                branch: api::BranchName {
                    name: &draft.destination_branch,
                },
            },
        };
        debug!(
            "Opening pull request {} -> {} via {}...",
            draft.source_branch, draft.destination_branch, url
        );

        let pr: api::PullRequest = self
            .http_client
            .post_json(&url, &body)
            .await
            .with_context(|| {
                format!(
                    "Failed to open pull request from '{}' to '{}'",
                    draft.source_branch, draft.destination_branch
                )
            })?;

        Ok(pr.into())
    }
}

impl From<api::PullRequest> for PullRequest {
    fn from(pr: api::PullRequest) -> Self {
        PullRequest {
            id: pr.id,
            url: pr.links.and_then(|l| l.html).map(|h| h.href),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;
    use mockito::Matcher;
    use reqwest::Client;

    fn repo() -> RepoId {
        RepoId {
            workspace: "acme".to_string(),
            slug: "portal".to_string(),
        }
    }

    fn client_for(url: &str) -> BitbucketClient {
        BitbucketClient::from_http_client(HttpClient::new(Client::new()), url)
    }

    #[test]
    fn test_api_url_trailing_slash() {
        let client = client_for("https://custom.api/2.0/");
        assert_eq!(client.api_url(), "https://custom.api/2.0");
    }

    #[test]
    fn test_hash_from_location() {
        assert_eq!(
            hash_from_location("https://api.bitbucket.org/2.0/repositories/acme/portal/commit/abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(hash_from_location("https://example.com/elsewhere"), None);
        assert_eq!(hash_from_location("https://example.com/commit/"), None);
    }

    #[tokio::test]
    async fn test_main_branch_head() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/repositories/acme/portal/src?format=meta")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"path": "", "type": "commit_directory", "commit": {"hash": "deadbeef", "type": "commit"}}"#)
            .create_async()
            .await;

        let hash = client_for(&server.url())
            .main_branch_head(&repo())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(hash, "deadbeef");
    }

    #[tokio::test]
    async fn test_main_branch_head_unauthorized() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/repositories/acme/portal/src?format=meta")
            .with_status(401)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .main_branch_head(&repo())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(
            err.downcast_ref::<HttpError>(),
            Some(HttpError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_read_file_nested_path() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/repositories/acme/portal/src/deadbeef/web/package.json")
            .with_status(200)
            .with_body(r#"{"dependencies": {"redoc": "1.0.0"}}"#)
            .create_async()
            .await;

        let content = client_for(&server.url())
            .read_file(&repo(), "deadbeef", "web/package.json")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(content, r#"{"dependencies": {"redoc": "1.0.0"}}"#);
    }

    #[tokio::test]
    async fn test_read_file_encodes_path_segments() {
        let mut server = mockito::Server::new_async().await;

        let directory = server
            .mock("GET", "/repositories/acme/portal/src/abc/apps/web")
            .with_status(200)
            .with_body(r#"{"values": []}"#)
            .expect(0)
            .create_async()
            .await;
        let file = server
            .mock("GET", "/repositories/acme/portal/src/abc/apps/web%232/package.json")
            .with_status(200)
            .with_body(r#"{"dependencies": {}}"#)
            .create_async()
            .await;

        let content = client_for(&server.url())
            .read_file(&repo(), "abc", "apps/web#2/package.json")
            .await
            .unwrap();

        directory.assert_async().await;
        file.assert_async().await;
        assert_eq!(content, r#"{"dependencies": {}}"#);
    }

    #[tokio::test]
    async fn test_read_file_not_found() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/repositories/acme/portal/src/deadbeef/package.json")
            .with_status(404)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .read_file(&repo(), "deadbeef", "package.json")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(
            err.downcast_ref::<HttpError>()
                .is_some_and(HttpError::is_not_found)
        );
    }

    #[tokio::test]
    async fn test_create_branch() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/repositories/acme/portal/refs/branches")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "dependency-update",
                "target": {"hash": "deadbeef"}
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "dependency-update", "target": {"hash": "deadbeef"}}"#)
            .create_async()
            .await;

        client_for(&server.url())
            .create_branch(&repo(), "dependency-update", "deadbeef")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_branch_already_exists() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/repositories/acme/portal/refs/branches")
            .with_status(400)
            .with_body(r#"{"type": "error", "error": {"message": "BRANCH_ALREADY_EXISTS"}}"#)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .create_branch(&repo(), "dependency-update", "deadbeef")
            .await
            .unwrap_err();

        mock.assert_async().await;
        let chain = format!("{:#}", err);
        assert!(chain.contains("dependency-update"));
        assert!(chain.contains("BRANCH_ALREADY_EXISTS"));
    }

    #[tokio::test]
    async fn test_commit_file() {
        let mut server = mockito::Server::new_async().await;
        let location = format!("{}/repositories/acme/portal/commit/cafe01", server.url());

        let mock = server
            .mock("POST", "/repositories/acme/portal/src")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("package.json".into(), "{}\n".into()),
                Matcher::UrlEncoded("message".into(), "Updated dependency".into()),
                Matcher::UrlEncoded("author".into(), "Bot <bot@example.com>".into()),
                Matcher::UrlEncoded("branch".into(), "dependency-update".into()),
            ]))
            .with_status(201)
            .with_header("location", &location)
            .create_async()
            .await;

        let commit = FileCommit {
            branch: "dependency-update".to_string(),
            path: "package.json".to_string(),
            content: "{}\n".to_string(),
            message: "Updated dependency".to_string(),
            author: "Bot <bot@example.com>".to_string(),
        };
        let info = client_for(&server.url())
            .commit_file(&repo(), &commit)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(info.hash.as_deref(), Some("cafe01"));
        assert_eq!(info.location, Some(location));
    }

    #[tokio::test]
    async fn test_commit_file_without_location() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/repositories/acme/portal/src")
            .match_body(Matcher::UrlEncoded(
                "apps/web#2/package.json".into(),
                "{}\n".into(),
            ))
            .with_status(201)
            .create_async()
            .await;

        let commit = FileCommit {
            branch: "dependency-update".to_string(),
            path: "apps/web#2/package.json".to_string(),
            content: "{}\n".to_string(),
            message: "Updated dependency".to_string(),
            author: "Bot <bot@example.com>".to_string(),
        };
        let info = client_for(&server.url())
            .commit_file(&repo(), &commit)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(info, CommitInfo::default());
    }

    #[tokio::test]
    async fn test_create_pull_request() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/repositories/acme/portal/pullrequests")
            .match_body(Matcher::Json(serde_json::json!({
                "title": "Dependency update",
                "source": {"branch": {"name": "dependency-update"}},
                "destination": {"branch": {"name": "develop"}}
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": 42,
                    "state": "OPEN",
                    "links": {"html": {"href": "https://bitbucket.org/acme/portal/pull-requests/42"}}
                }"#,
            )
            .create_async()
            .await;

        let draft = PullRequestDraft {
            title: "Dependency update".to_string(),
            source_branch: "dependency-update".to_string(),
            destination_branch: "develop".to_string(),
        };
        let pr = client_for(&server.url())
            .create_pull_request(&repo(), &draft)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(pr.id, 42);
        assert_eq!(
            pr.url.as_deref(),
            Some("https://bitbucket.org/acme/portal/pull-requests/42")
        );
    }

    #[test]
    fn test_pull_request_conversion_without_links() {
        let api_pr = api::PullRequest {
            id: 3,
            links: None,
        };
        let pr: PullRequest = api_pr.into();
        assert_eq!(pr.id, 3);
        assert_eq!(pr.url, None);
    }
}
