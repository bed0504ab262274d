//! Pattern-based patching of raw manifest text.
//!
//! Every byte outside the replaced version string is left as it was, which
//! makes this strategy usable for manifests that are not JSON at all.

use log::warn;
use regex::{Captures, Regex};

use super::{DependencyPatch, DependencyRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextManifest {
    content: String,
}

impl TextManifest {
    pub fn new(content: String) -> Self {
        Self { content }
    }
}

/// `"<package>" : "<version>"`, capturing the key with its surrounding
/// whitespace in group 1 and the version in group 2.
fn declaration_pattern(package: &str) -> Option<Regex> {
    let pattern = format!(r#"("{}"\s*:\s*)"(.*?)""#, regex::escape(package));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Cannot build pattern for package {:?}: {}", package, e);
            None
        }
    }
}

impl DependencyPatch for TextManifest {
    fn detect(&self, package: &str) -> Option<DependencyRef> {
        let re = declaration_pattern(package)?;
        let caps = re.captures(&self.content)?;

        Some(DependencyRef {
            name: package.to_string(),
            version: caps[2].to_string(),
            kind: None,
        })
    }

    fn update(&self, package: &str, version: &str) -> Self {
        let Some(re) = declaration_pattern(package) else {
            return self.clone();
        };

        let content = re.replacen(&self.content, 1, |caps: &Captures| {
            format!("{}\"{}\"", &caps[1], version)
        });

        TextManifest::new(content.into_owned())
    }

    fn render(&self) -> String {
        self.content.clone()
    }
}
