//! Source field projection.

use serde_json::{Value, json};

/// Fields included in or excluded from returned documents.
///
/// Both lists only ever grow. When both are empty the whole document is
/// returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl SourceFilter {
    /// Create an unrestricted projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append fields to the include list.
    pub fn add_includes<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(fields.into_iter().map(Into::into));
    }

    /// Append fields to the exclude list.
    pub fn add_excludes<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(fields.into_iter().map(Into::into));
    }

    /// Included fields in the order they were added.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Excluded fields in the order they were added.
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// Check whether the projection leaves documents unrestricted.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Render this projection as a `_source` document.
    pub fn to_json(&self) -> Value {
        json!({
            "includes": self.includes,
            "excludes": self.excludes,
        })
    }
}
