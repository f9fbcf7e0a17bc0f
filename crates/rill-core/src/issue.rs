//! Issue accumulation for batched write replies.
//!
//! Failures on the write path are collected rather than raced: every
//! partition outcome lands in one ordered list delivered with the final
//! reply.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How bad an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Machine-readable classification of a write-path failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// The navigated scheme entry does not support this write.
    PathResolutionFailure,
    /// One or more rows could not be mapped onto the partition layout.
    PartitionRoutingFailure,
    /// A shard could not be reached or refused to take load.
    ShardUnavailable,
    /// A shard durably rejected the rows.
    ShardWriteRejected,
    /// A partition operation exceeded its time budget.
    OperationTimedOut,
    /// Some partitions applied their slice before the write failed.
    PartialApplication,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueCode::PathResolutionFailure => "path_resolution_failure",
            IssueCode::PartitionRoutingFailure => "partition_routing_failure",
            IssueCode::ShardUnavailable => "shard_unavailable",
            IssueCode::ShardWriteRejected => "shard_write_rejected",
            IssueCode::OperationTimedOut => "operation_timed_out",
            IssueCode::PartialApplication => "partial_application",
        };
        f.write_str(s)
    }
}

/// One diagnostic attached to a write reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
}

impl Issue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.code, self.message)
    }
}

/// Append-only ordered list of issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issues(Vec<Issue>);

impl Issues {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, issue: Issue) {
        self.0.push(issue);
    }

    pub fn extend(&mut self, other: Issues) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.0.iter()
    }
}

impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl From<Issue> for Issues {
    fn from(issue: Issue) -> Self {
        Self(vec![issue])
    }
}

impl IntoIterator for Issues {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issues_preserve_insertion_order() {
        let mut issues = Issues::new();
        issues.push(Issue::error(IssueCode::ShardUnavailable, "shard 2 down"));
        issues.push(Issue::error(IssueCode::OperationTimedOut, "shard 5 slow"));
        let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![IssueCode::ShardUnavailable, IssueCode::OperationTimedOut]
        );
    }

    #[test]
    fn test_issues_display_joined() {
        let mut issues = Issues::new();
        issues.push(Issue::error(IssueCode::PathResolutionFailure, "no table"));
        issues.push(Issue::warning(IssueCode::ShardUnavailable, "retrying"));
        assert_eq!(
            issues.to_string(),
            "error [path_resolution_failure]: no table; \
             warning [shard_unavailable]: retrying"
        );
    }

    #[test]
    fn test_extend_appends_after_existing() {
        let mut a = Issues::from(Issue::error(IssueCode::ShardWriteRejected, "first"));
        let b = Issues::from(Issue::error(IssueCode::ShardUnavailable, "second"));
        a.extend(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.iter().next().unwrap().message, "first");
    }
}
