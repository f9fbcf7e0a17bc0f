//! Rill Core - shared domain types
//!
//! This crate provides the domain model shared by the dataflow I/O and
//! long-tx write crates: identifiers, table paths, partition layouts,
//! issue accumulation, and the Arrow IPC payload codec.

pub mod error;
pub mod ids;
pub mod ipc;
pub mod issue;
pub mod partition;
pub mod path;

pub use error::CoreError;
pub use ids::{DedupId, LongTxId, NodeId, ShardId};
pub use issue::{Issue, IssueCode, Issues, Severity};
pub use partition::{
    KeyRange, KeyValue, NavigateResult, Partition, ResolvedEntry, TablePartitioning,
};
pub use path::TablePath;
