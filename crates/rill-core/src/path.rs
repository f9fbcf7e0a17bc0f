//! Validated table paths.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Absolute table path, e.g. `/warehouse/sales/orders`.
///
/// Always starts with `/` and contains no empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TablePath(String);

impl TablePath {
    pub fn new(path: impl Into<String>) -> Result<Self, CoreError> {
        let path = path.into();
        if path.is_empty() {
            return Err(CoreError::InvalidPath("path is empty".to_string()));
        }
        if !path.starts_with('/') {
            return Err(CoreError::InvalidPath(format!("not absolute: {path}")));
        }
        if path[1..].split('/').any(|segment| segment.is_empty()) {
            return Err(CoreError::InvalidPath(format!("empty segment in: {path}")));
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, the table's own name.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<TablePath> for String {
    fn from(path: TablePath) -> Self {
        path.0
    }
}

impl TryFrom<String> for TablePath {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TablePath::new(s)
    }
}
