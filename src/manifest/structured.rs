//! Field-based patching of a parsed JSON manifest.

use serde_json::Value;

use super::{DependencyKind, DependencyPatch, DependencyRef};

/// A parsed `package.json`-style document.
///
/// Key order is preserved, so rendering changes formatting at most, never the
/// order of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonManifest {
    value: Value,
    trailing_newline: bool,
}

impl JsonManifest {
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            value: serde_json::from_str(content)?,
            trailing_newline: content.ends_with('\n'),
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Version of `package` in one dependency category.
    fn version_in(&self, kind: DependencyKind, package: &str) -> Option<&str> {
        self.value
            .get(kind.field())?
            .as_object()?
            .get(package)?
            .as_str()
    }
}

impl DependencyPatch for JsonManifest {
    fn detect(&self, package: &str) -> Option<DependencyRef> {
        DependencyKind::PRECEDENCE.iter().find_map(|&kind| {
            self.version_in(kind, package).map(|version| DependencyRef {
                name: package.to_string(),
                version: version.to_string(),
                kind: Some(kind),
            })
        })
    }

    fn update(&self, package: &str, version: &str) -> Self {
        let mut updated = self.clone();

        let Some(kind) = self.detect(package).and_then(|found| found.kind) else {
            return updated;
        };

        if let Some(slot) = updated
            .value
            .get_mut(kind.field())
            .and_then(Value::as_object_mut)
            .and_then(|deps| deps.get_mut(package))
        {
            *slot = Value::String(version.to_string());
        }

        updated
    }

    fn render(&self) -> String {
        let mut rendered = format!("{:#}", self.value);
        if self.trailing_newline {
            rendered.push('\n');
        }
        rendered
    }
}
