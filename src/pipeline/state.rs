//! States and steps of the update pipeline.

use std::fmt;

/// Where the pipeline currently is.
///
/// ```text
/// Start -> CommitRead -> ManifestRead -> Stopped
///                                     -> Patched -> BranchCreated -> Committed -> RequestOpened
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Start,
    CommitRead,
    ManifestRead,
    /// Early exit, no writes were made.
    Stopped,
    Patched,
    BranchCreated,
    Committed,
    RequestOpened,
}

impl PipelineState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Start, CommitRead)
                | (CommitRead, ManifestRead)
                | (ManifestRead, Stopped)
                | (ManifestRead, Patched)
                | (Patched, BranchCreated)
                | (BranchCreated, Committed)
                | (Committed, RequestOpened)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Start => "start",
            PipelineState::CommitRead => "commit-read",
            PipelineState::ManifestRead => "manifest-read",
            PipelineState::Stopped => "stopped",
            PipelineState::Patched => "patched",
            PipelineState::BranchCreated => "branch-created",
            PipelineState::Committed => "committed",
            PipelineState::RequestOpened => "request-opened",
        };
        f.write_str(name)
    }
}

/// A remote step that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishStep {
    ReadHead,
    ReadManifest,
    CreateBranch,
    CommitFile,
    OpenRequest,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStep::ReadHead => "reading main branch head",
            PublishStep::ReadManifest => "reading the manifest",
            PublishStep::CreateBranch => "creating the update branch",
            PublishStep::CommitFile => "committing the manifest",
            PublishStep::OpenRequest => "opening the pull request",
        };
        f.write_str(name)
    }
}
