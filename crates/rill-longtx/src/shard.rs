//! Shard write transport: the per-partition application surface.

use std::collections::HashMap;
use std::fmt;

use arrow::array::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use rill_core::{DedupId, LongTxId, ShardId, TablePath};

/// One partition's slice of a long-tx write.
#[derive(Debug, Clone)]
pub struct ShardWriteRequest {
    pub shard: ShardId,
    pub tx_id: LongTxId,
    pub dedup_id: DedupId,
    pub path: TablePath,
    /// Rows owned by this shard only. Columns are refcounted, so cloning
    /// the request for a retry is cheap.
    pub batch: RecordBatch,
}

/// Positive acknowledgement from a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardAck {
    pub shard: ShardId,
    /// The shard had already applied this `(tx, dedup)` write and changed
    /// nothing.
    pub deduplicated: bool,
}

/// Why a shard write did not land.
#[derive(Debug, Clone)]
pub enum ShardWriteError {
    /// Transient: the shard cannot take the write right now.
    Unavailable { shard: ShardId, message: String },
    /// Permanent: the shard looked at the write and said no.
    Rejected { shard: ShardId, message: String },
}

impl ShardWriteError {
    pub fn shard(&self) -> ShardId {
        match self {
            ShardWriteError::Unavailable { shard, .. }
            | ShardWriteError::Rejected { shard, .. } => *shard,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ShardWriteError::Unavailable { .. })
    }
}

impl fmt::Display for ShardWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardWriteError::Unavailable { shard, message } => {
                write!(f, "shard {} unavailable: {}", shard, message)
            }
            ShardWriteError::Rejected { shard, message } => {
                write!(f, "shard {} rejected write: {}", shard, message)
            }
        }
    }
}

impl std::error::Error for ShardWriteError {}

/// Transport for applying per-partition writes.
///
/// Implementations must apply idempotently per `(tx id, dedup id)`: a
/// replayed request acknowledges with `deduplicated` set and changes
/// nothing.
#[async_trait]
pub trait ShardWriteClient: Send + Sync {
    async fn write(&self, request: ShardWriteRequest) -> Result<ShardAck, ShardWriteError>;
}

/// What a shard remembers about one applied write.
#[derive(Debug, Clone)]
pub struct AppliedWrite {
    pub rows: usize,
    pub applied_at: DateTime<Utc>,
}

/// In-process shard set: one applied-write ledger per shard, deduplicating
/// on `(tx id, dedup id)`. The reference `ShardWriteClient` for tests and
/// single-node runs.
pub struct MemShardSet {
    shards: Mutex<HashMap<ShardId, HashMap<(LongTxId, DedupId), AppliedWrite>>>,
}

impl MemShardSet {
    /// A shard set accepting writes for exactly `shards`.
    pub fn new(shards: &[ShardId]) -> Self {
        let map = shards.iter().map(|s| (*s, HashMap::new())).collect();
        Self {
            shards: Mutex::new(map),
        }
    }

    /// Total rows applied on `shard` across all writes.
    pub async fn rows_in(&self, shard: ShardId) -> usize {
        self.shards
            .lock()
            .await
            .get(&shard)
            .map(|ledger| ledger.values().map(|w| w.rows).sum())
            .unwrap_or(0)
    }

    /// When `(tx, dedup)` was applied on `shard`, if ever.
    pub async fn applied_at(
        &self,
        shard: ShardId,
        tx_id: LongTxId,
        dedup_id: &DedupId,
    ) -> Option<DateTime<Utc>> {
        self.shards
            .lock()
            .await
            .get(&shard)
            .and_then(|ledger| ledger.get(&(tx_id, dedup_id.clone())))
            .map(|w| w.applied_at)
    }
}

#[async_trait]
impl ShardWriteClient for MemShardSet {
    async fn write(&self, request: ShardWriteRequest) -> Result<ShardAck, ShardWriteError> {
        let mut shards = self.shards.lock().await;
        let ledger = shards
            .get_mut(&request.shard)
            .ok_or_else(|| ShardWriteError::Unavailable {
                shard: request.shard,
                message: "no such shard".to_string(),
            })?;
        let key = (request.tx_id, request.dedup_id.clone());
        if ledger.contains_key(&key) {
            return Ok(ShardAck {
                shard: request.shard,
                deduplicated: true,
            });
        }
        ledger.insert(
            key,
            AppliedWrite {
                rows: request.batch.num_rows(),
                applied_at: Utc::now(),
            },
        );
        Ok(ShardAck {
            shard: request.shard,
            deduplicated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    use rill_core::NodeId;

    use super::*;

    fn request(shard: ShardId, tx_id: LongTxId, dedup: &str, rows: &[i64]) -> ShardWriteRequest {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(rows.to_vec()))]).unwrap();
        ShardWriteRequest {
            shard,
            tx_id,
            dedup_id: DedupId::new(dedup),
            path: rill_core::TablePath::new("/db/t").unwrap(),
            batch,
        }
    }

    #[tokio::test]
    async fn test_replay_is_deduplicated_and_changes_nothing() {
        let shards = MemShardSet::new(&[ShardId(1)]);
        let tx = LongTxId::generate(NodeId(1));

        let first = shards
            .write(request(ShardId(1), tx, "w-0", &[1, 2, 3]))
            .await
            .unwrap();
        assert!(!first.deduplicated);
        assert_eq!(shards.rows_in(ShardId(1)).await, 3);
        let stamp = shards
            .applied_at(ShardId(1), tx, &DedupId::new("w-0"))
            .await
            .unwrap();

        let replay = shards
            .write(request(ShardId(1), tx, "w-0", &[1, 2, 3]))
            .await
            .unwrap();
        assert!(replay.deduplicated);
        assert_eq!(shards.rows_in(ShardId(1)).await, 3);
        let stamp_after = shards
            .applied_at(ShardId(1), tx, &DedupId::new("w-0"))
            .await
            .unwrap();
        assert_eq!(stamp_after, stamp);
    }

    #[tokio::test]
    async fn test_distinct_dedup_ids_apply_separately() {
        let shards = MemShardSet::new(&[ShardId(1)]);
        let tx = LongTxId::generate(NodeId(1));

        shards
            .write(request(ShardId(1), tx, "w-0", &[1]))
            .await
            .unwrap();
        shards
            .write(request(ShardId(1), tx, "w-1", &[2, 3]))
            .await
            .unwrap();
        assert_eq!(shards.rows_in(ShardId(1)).await, 3);
    }

    #[tokio::test]
    async fn test_unknown_shard_is_unavailable() {
        let shards = MemShardSet::new(&[ShardId(1)]);
        let tx = LongTxId::generate(NodeId(1));
        let err = shards
            .write(request(ShardId(99), tx, "w-0", &[1]))
            .await
            .err()
            .unwrap();
        assert!(err.is_retryable());
        assert_eq!(err.shard(), ShardId(99));
    }
}
