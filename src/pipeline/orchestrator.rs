//! Sequential execution of the update pipeline.

use log::{debug, info};

use crate::config::Config;
use crate::hosting::{HostingService, PullRequestDraft};
use crate::manifest::{DependencyPatch, ManifestReader};

use super::{PipelineState, PublishError, PublishStep, RunOutcome, UpdateUnit};

/// Prints a progress line with a right-aligned verb.
fn status(verb: &str, message: impl std::fmt::Display) {
    println!("{:>12} {}", verb, message);
}

/// One run of the pipeline against one repository.
///
/// Every remote call is awaited before the next one starts and none is
/// retried. The first failure ends the run.
pub struct UpdatePipeline<'a, H: HostingService + ?Sized> {
    hosting: &'a H,
    config: &'a Config,
    state: PipelineState,
    created_branch: Option<String>,
}

impl<'a, H: HostingService + ?Sized> UpdatePipeline<'a, H> {
    pub fn new(hosting: &'a H, config: &'a Config) -> Self {
        Self {
            hosting,
            config,
            state: PipelineState::Start,
            created_branch: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        info!("pipeline: {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&self, step: PublishStep, source: impl Into<anyhow::Error>) -> PublishError {
        let err = PublishError {
            step,
            created_branch: self.created_branch.clone(),
            committed: self.state == PipelineState::Committed,
            source: source.into(),
        };
        info!("pipeline: {} failed in state {}", step, self.state);
        err
    }

    /// Run every step in order.
    #[tracing::instrument(skip(self), fields(repo = %self.config.repo))]
    pub async fn run(&mut self) -> Result<RunOutcome, PublishError> {
        let config = self.config;
        let repo = &config.repo;
        let request = &config.request;

        status("reading", format!("main branch head of {}", repo));
        let commit = self
            .hosting
            .main_branch_head(repo)
            .await
            .map_err(|e| self.fail(PublishStep::ReadHead, e))?;
        self.advance(PipelineState::CommitRead);
        status("commit", &commit);

        let reader = ManifestReader::new(self.hosting, repo, config.manifest_format);
        let (raw, manifest) = reader
            .read(&commit, &config.manifest_path)
            .await
            .map_err(|e| self.fail(PublishStep::ReadManifest, e))?;
        self.advance(PipelineState::ManifestRead);
        status("manifest", format!("{} ({})", config.manifest_path, manifest.format()));
        println!("{}", raw);

        let Some(found) = manifest.detect(&request.package) else {
            status(
                "missing",
                format!("{} was not found in {}", request.package, config.manifest_path),
            );
            self.advance(PipelineState::Stopped);
            return Ok(RunOutcome::NotDeclared);
        };

        status(
            "found",
            format!(
                "\"{}\": \"{}\", desired version is {}",
                found.name, found.version, request.version
            ),
        );
        if let Some(kind) = found.kind {
            debug!("{} declared under {}", found.name, kind.field());
        }

        if found.version == request.version {
            self.advance(PipelineState::Stopped);
            return Ok(RunOutcome::UpToDate {
                version: found.version,
            });
        }

        let patched = manifest.update(&request.package, &request.version);
        let unit = UpdateUnit {
            branch: config.update_branch.clone(),
            base_commit: commit,
            path: config.manifest_path.clone(),
            content: patched.render(),
            message: config.commit_message.clone(),
            author: config.commit_author.clone(),
        };
        self.advance(PipelineState::Patched);
        status("patched", &unit.path);
        println!("{}", unit.content);

        status(
            "branching",
            format!("'{}' from {}", unit.branch, unit.base_commit),
        );
        self.hosting
            .create_branch(repo, &unit.branch, &unit.base_commit)
            .await
            .map_err(|e| self.fail(PublishStep::CreateBranch, e))?;
        self.created_branch = Some(unit.branch.clone());
        self.advance(PipelineState::BranchCreated);

        status("committing", format!("{} to '{}'", unit.path, unit.branch));
        let commit_info = self
            .hosting
            .commit_file(repo, &unit.file_commit())
            .await
            .map_err(|e| self.fail(PublishStep::CommitFile, e))?;
        self.advance(PipelineState::Committed);
        if let Some(hash) = &commit_info.hash {
            debug!("Committed {}", hash);
        }

        let draft = PullRequestDraft {
            title: config.pr_title.clone(),
            source_branch: unit.branch.clone(),
            destination_branch: config.target_branch.clone(),
        };
        status(
            "opening",
            format!(
                "pull request '{}' -> '{}'",
                draft.source_branch, draft.destination_branch
            ),
        );
        let pull_request = self
            .hosting
            .create_pull_request(repo, &draft)
            .await
            .map_err(|e| self.fail(PublishStep::OpenRequest, e))?;
        self.advance(PipelineState::RequestOpened);

        Ok(RunOutcome::Opened {
            previous_version: found.version,
            commit: commit_info,
            pull_request,
        })
    }
}
