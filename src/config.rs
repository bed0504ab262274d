//! Process configuration, read once at startup.
//!
//! Every value comes from the environment through [`Runtime::env_var`]. The
//! resulting [`Config`] is immutable and handed by reference to the services
//! and the pipeline.

use std::fmt;

use log::debug;
use thiserror::Error;

use crate::hosting::{DEFAULT_API_URL, RepoId};
use crate::manifest::ManifestFormat;
use crate::pipeline::UpdateRequest;
use crate::runtime::Runtime;

pub const HOST_TOKEN: &str = "HOST_TOKEN";
pub const WORKSPACE_NAME: &str = "WORKSPACE_NAME";
pub const REPOSITORY_NAME: &str = "REPOSITORY_NAME";
pub const TARGET_BRANCH: &str = "TARGET_BRANCH";
pub const PACKAGE_NAME: &str = "PACKAGE_NAME";
pub const PACKAGE_VERSION: &str = "PACKAGE_VERSION";

pub const PACKAGE_JSON_PATH: &str = "PACKAGE_JSON_PATH";
pub const UPDATE_BRANCH: &str = "UPDATE_BRANCH";
pub const COMMIT_AUTHOR: &str = "COMMIT_AUTHOR";
pub const COMMIT_MESSAGE: &str = "COMMIT_MESSAGE";
pub const PR_TITLE: &str = "PR_TITLE";
pub const MANIFEST_FORMAT: &str = "MANIFEST_FORMAT";

/// Required variables, in the order they are reported when missing.
pub const REQUIRED_VARIABLES: [&str; 6] = [
    HOST_TOKEN,
    WORKSPACE_NAME,
    REPOSITORY_NAME,
    TARGET_BRANCH,
    PACKAGE_NAME,
    PACKAGE_VERSION,
];

pub const DEFAULT_MANIFEST_PATH: &str = "package.json";
pub const DEFAULT_UPDATE_BRANCH: &str = "dependency-update";
pub const DEFAULT_COMMIT_AUTHOR: &str = "Dependency Bot <bot@example.com>";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Updated dependency";
pub const DEFAULT_PR_TITLE: &str = "Dependency update";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub repo: RepoId,
    /// Destination branch of the pull request.
    pub target_branch: String,
    pub request: UpdateRequest,
    pub manifest_path: String,
    pub manifest_format: ManifestFormat,
    pub update_branch: String,
    pub commit_author: String,
    pub commit_message: String,
    pub pr_title: String,
}

impl Config {
    /// Build the configuration from the environment.
    ///
    /// `api_url` is the command-line override; without it the Bitbucket Cloud
    /// endpoint is used. All missing required variables are reported together.
    #[tracing::instrument(skip(runtime))]
    pub fn from_runtime<R: Runtime + ?Sized>(
        runtime: &R,
        api_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| -> Option<String> {
            runtime
                .env_var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<String> = REQUIRED_VARIABLES
            .into_iter()
            .filter(|key| lookup(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let required = |key: &str| lookup(key).unwrap_or_default();
        let optional =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let manifest_format = match lookup(MANIFEST_FORMAT) {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                name: MANIFEST_FORMAT.to_string(),
                value,
                reason,
            })?,
            None => ManifestFormat::Auto,
        };

        let manifest_path = match lookup(PACKAGE_JSON_PATH) {
            Some(value) => {
                normalize_manifest_path(&value).map_err(|reason| ConfigError::Invalid {
                    name: PACKAGE_JSON_PATH.to_string(),
                    value,
                    reason: reason.to_string(),
                })?
            }
            None => DEFAULT_MANIFEST_PATH.to_string(),
        };

        let api_url = api_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let config = Config {
            token: required(HOST_TOKEN),
            api_url,
            repo: RepoId {
                workspace: required(WORKSPACE_NAME),
                slug: required(REPOSITORY_NAME),
            },
            target_branch: required(TARGET_BRANCH),
            request: UpdateRequest {
                package: required(PACKAGE_NAME),
                version: required(PACKAGE_VERSION),
            },
            manifest_path,
            manifest_format,
            update_branch: optional(UPDATE_BRANCH, DEFAULT_UPDATE_BRANCH),
            commit_author: optional(COMMIT_AUTHOR, DEFAULT_COMMIT_AUTHOR),
            commit_message: optional(COMMIT_MESSAGE, DEFAULT_COMMIT_MESSAGE),
            pr_title: optional(PR_TITLE, DEFAULT_PR_TITLE),
        };

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }
}

/// Repository-relative form of a manifest path: no leading or trailing `/`,
/// no empty, `.` or `..` segments. The same value is read and committed.
fn normalize_manifest_path(raw: &str) -> Result<String, &'static str> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        return Err("path names no file");
    }
    if trimmed
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err("path must not contain empty, '.' or '..' segments");
    }
    Ok(trimmed.to_string())
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"*********")
            .field("api_url", &self.api_url)
            .field("repo", &self.repo)
            .field("target_branch", &self.target_branch)
            .field("request", &self.request)
            .field("manifest_path", &self.manifest_path)
            .field("manifest_format", &self.manifest_format)
            .field("update_branch", &self.update_branch)
            .field("commit_author", &self.commit_author)
            .field("commit_message", &self.commit_message)
            .field("pr_title", &self.pr_title)
            .finish()
    }
}
