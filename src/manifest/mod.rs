//! Manifest parsing, dependency detection and version patching.
//!
//! A manifest is held either as raw text or as a parsed JSON document. Both
//! representations implement [`DependencyPatch`]; [`Manifest`] picks one based
//! on the configured [`ManifestFormat`] and the manifest path.

mod reader;
mod structured;
mod text;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use reader::ManifestReader;
pub use structured::JsonManifest;
pub use text::TextManifest;

/// How manifest content is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ManifestFormat {
    /// Structured for `*.json` paths, textual otherwise.
    #[default]
    Auto,
    Json,
    Text,
}

impl ManifestFormat {
    /// Resolve [`ManifestFormat::Auto`] against a manifest path.
    pub fn resolve(self, path: &str) -> ManifestFormat {
        match self {
            ManifestFormat::Auto if path.to_ascii_lowercase().ends_with(".json") => {
                ManifestFormat::Json
            }
            ManifestFormat::Auto => ManifestFormat::Text,
            other => other,
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestFormat::Auto => write!(f, "auto"),
            ManifestFormat::Json => write!(f, "json"),
            ManifestFormat::Text => write!(f, "text"),
        }
    }
}

impl FromStr for ManifestFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ManifestFormat::Auto),
            "json" => Ok(ManifestFormat::Json),
            "text" => Ok(ManifestFormat::Text),
            _ => Err("expected auto, json, or text".to_string()),
        }
    }
}

/// Dependency categories of a structured manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Runtime,
    Development,
}

impl DependencyKind {
    /// Lookup order. A package declared in several categories resolves to the
    /// first one listed here.
    pub const PRECEDENCE: [DependencyKind; 2] =
        [DependencyKind::Runtime, DependencyKind::Development];

    /// Name of the manifest field holding this category.
    pub fn field(self) -> &'static str {
        match self {
            DependencyKind::Runtime => "dependencies",
            DependencyKind::Development => "devDependencies",
        }
    }
}

/// A declared dependency found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    pub name: String,
    pub version: String,
    /// Category the declaration was found in; unknown for textual manifests.
    pub kind: Option<DependencyKind>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest {path} does not exist at commit {commit}")]
    NotFound { path: String, commit: String },

    #[error("manifest {path} is not valid JSON")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read manifest {path} at commit {commit}")]
    Unreadable {
        path: String,
        commit: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Detection and patching of a single dependency version.
pub trait DependencyPatch: Sized {
    /// The first declaration of `package`, if any.
    fn detect(&self, package: &str) -> Option<DependencyRef>;

    /// A copy with the version of `package` replaced by `version`.
    ///
    /// Returns an unchanged copy when `package` is not declared.
    fn update(&self, package: &str, version: &str) -> Self;

    /// Content to commit back to the repository.
    fn render(&self) -> String;
}

/// Manifest content in one of its two representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    Text(TextManifest),
    Structured(JsonManifest),
}

impl Manifest {
    /// Interpret `content` as `format`. `Auto` is treated as JSON.
    pub fn parse(content: String, format: ManifestFormat) -> Result<Self, serde_json::Error> {
        match format {
            ManifestFormat::Text => Ok(Manifest::Text(TextManifest::new(content))),
            ManifestFormat::Json | ManifestFormat::Auto => {
                JsonManifest::parse(&content).map(Manifest::Structured)
            }
        }
    }

    pub fn format(&self) -> ManifestFormat {
        match self {
            Manifest::Text(_) => ManifestFormat::Text,
            Manifest::Structured(_) => ManifestFormat::Json,
        }
    }
}

impl DependencyPatch for Manifest {
    fn detect(&self, package: &str) -> Option<DependencyRef> {
        match self {
            Manifest::Text(m) => m.detect(package),
            Manifest::Structured(m) => m.detect(package),
        }
    }

    fn update(&self, package: &str, version: &str) -> Self {
        match self {
            Manifest::Text(m) => Manifest::Text(m.update(package, version)),
            Manifest::Structured(m) => Manifest::Structured(m.update(package, version)),
        }
    }

    fn render(&self) -> String {
        match self {
            Manifest::Text(m) => m.render(),
            Manifest::Structured(m) => m.render(),
        }
    }
}
