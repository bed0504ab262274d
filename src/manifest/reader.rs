//! Reads a manifest from the hosting service at a fixed commit.

use log::debug;

use crate::hosting::{HostingService, RepoId};
use crate::http::HttpError;

use super::{Manifest, ManifestError, ManifestFormat};

pub struct ManifestReader<'a, H: HostingService + ?Sized> {
    hosting: &'a H,
    repo: &'a RepoId,
    format: ManifestFormat,
}

impl<'a, H: HostingService + ?Sized> ManifestReader<'a, H> {
    pub fn new(hosting: &'a H, repo: &'a RepoId, format: ManifestFormat) -> Self {
        Self {
            hosting,
            repo,
            format,
        }
    }

    /// Fetch `path` at `commit` and interpret it.
    ///
    /// Returns the raw content alongside the interpreted manifest.
    /// Textual manifests accept any content. Structured manifests must parse
    /// as JSON or the read fails with [`ManifestError::Malformed`].
    #[tracing::instrument(skip(self))]
    pub async fn read(
        &self,
        commit: &str,
        path: &str,
    ) -> Result<(String, Manifest), ManifestError> {
        let raw = self
            .hosting
            .read_file(self.repo, commit, path)
            .await
            .map_err(|source| {
                if source
                    .downcast_ref::<HttpError>()
                    .is_some_and(HttpError::is_not_found)
                {
                    ManifestError::NotFound {
                        path: path.to_string(),
                        commit: commit.to_string(),
                    }
                } else {
                    ManifestError::Unreadable {
                        path: path.to_string(),
                        commit: commit.to_string(),
                        source,
                    }
                }
            })?;

        let format = self.format.resolve(path);
        debug!("Interpreting {} ({} bytes) as {}", path, raw.len(), format);

        let manifest =
            Manifest::parse(raw.clone(), format).map_err(|source| ManifestError::Malformed {
                path: path.to_string(),
                source,
            })?;

        Ok((raw, manifest))
    }
}
