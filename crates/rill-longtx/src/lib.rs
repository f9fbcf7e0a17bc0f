//! Rill LongTx - partitioned long-transaction writes
//!
//! This crate coordinates one columnar batch write under a long
//! transaction: route rows to their owning shards, fan the shard writes
//! out with a per-operation timeout and retry policy, aggregate partial
//! failures into issues, and reply exactly once.

pub mod coordinator;
pub mod metrics;
pub mod payload;
pub mod policy;
pub mod router;
pub mod shard;

pub use coordinator::{WriteCoordinator, WriteRequest, WriteResult, WriteStatus};
pub use metrics::LongTxMetrics;
pub use payload::{PayloadFormat, WritePayload};
pub use policy::{CompletionPolicy, RetryPolicy, WriteOptions};
pub use router::{route_batch, RouteError};
pub use shard::{
    MemShardSet, ShardAck, ShardWriteClient, ShardWriteError, ShardWriteRequest,
};
