//! The write coordinator: one long-tx batch in, one aggregated reply out.
//!
//! A write is validated against its navigated scheme snapshot, routed into
//! per-shard slices, fanned out one task per shard under a timeout and
//! retry policy, and fanned back in to a single reply. Partition failures
//! accumulate into issues; nothing replies early except under fail-fast.

use std::sync::Arc;

use arrow::array::RecordBatch;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use rill_core::{
    DedupId, Issue, IssueCode, Issues, LongTxId, NavigateResult, ResolvedEntry, ShardId,
    TablePartitioning, TablePath,
};

use crate::metrics::{LongTxMetrics, OutcomeLabel};
use crate::policy::{CompletionPolicy, WriteOptions};
use crate::router::route_batch;
use crate::shard::{ShardAck, ShardWriteClient, ShardWriteRequest};

/// One long-tx write as submitted by the RPC layer.
#[derive(Clone)]
pub struct WriteRequest {
    pub tx_id: LongTxId,
    /// Caller-chosen idempotency key, echoed back in the result.
    pub dedup_id: DedupId,
    /// Database the table lives in. Logging only.
    pub database: String,
    pub path: TablePath,
    /// Scheme snapshot resolved by the caller before submitting.
    pub navigated: NavigateResult,
    pub batch: RecordBatch,
}

/// Final reply for one write, echoing the request identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    pub tx_id: LongTxId,
    pub path: TablePath,
    pub dedup_id: DedupId,
    pub status: WriteStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteStatus {
    Success,
    Failure(Issues),
}

impl WriteResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, WriteStatus::Success)
    }
}

/// Coordinates batched long-tx writes against a shard set.
pub struct WriteCoordinator {
    shards: Arc<dyn ShardWriteClient>,
    options: WriteOptions,
    metrics: LongTxMetrics,
}

impl WriteCoordinator {
    pub fn new(shards: Arc<dyn ShardWriteClient>, options: WriteOptions) -> Self {
        Self::with_metrics(shards, options, LongTxMetrics::new())
    }

    /// Share a metrics registry with the rest of the process.
    pub fn with_metrics(
        shards: Arc<dyn ShardWriteClient>,
        options: WriteOptions,
        metrics: LongTxMetrics,
    ) -> Self {
        Self {
            shards,
            options,
            metrics,
        }
    }

    pub fn metrics(&self) -> &LongTxMetrics {
        &self.metrics
    }

    /// Coordinate one write to completion.
    pub async fn write_batch(&self, request: WriteRequest) -> WriteResult {
        self.metrics.inflight_writes.inc();
        let result = self.run(request).await;
        self.metrics.inflight_writes.dec();
        let outcome = if result.is_success() {
            "success"
        } else {
            "failure"
        };
        self.metrics
            .writes_total
            .get_or_create(&OutcomeLabel(outcome.to_string()))
            .inc();
        result
    }

    /// Hand coordination to its own task; the result arrives on `reply`.
    ///
    /// Exactly one result is sent. Aborting the returned handle cancels
    /// outstanding shard operations and closes `reply` without a result.
    pub fn submit(
        self: &Arc<Self>,
        request: WriteRequest,
        reply: oneshot::Sender<WriteResult>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.submit_local(request, reply).await;
        })
    }

    /// Same-task variant of [`WriteCoordinator::submit`]: coordination runs
    /// inline on the caller's task and yields an identical result for
    /// identical inputs.
    pub async fn submit_local(&self, request: WriteRequest, reply: oneshot::Sender<WriteResult>) {
        let result = self.write_batch(request).await;
        if reply.send(result).is_err() {
            debug!("Write reply receiver dropped before delivery");
        }
    }

    async fn run(&self, request: WriteRequest) -> WriteResult {
        let WriteRequest {
            tx_id,
            dedup_id,
            database,
            path,
            navigated,
            batch,
        } = request;

        debug!(
            "Write {} dedup '{}' to {} in database '{}' ({} rows)",
            tx_id,
            dedup_id,
            path,
            database,
            batch.num_rows()
        );

        let layout = match validated_layout(&path, &navigated) {
            Ok(layout) => layout,
            Err(issue) => {
                warn!("Write {} to {} rejected: {}", tx_id, path, issue);
                return WriteResult {
                    tx_id,
                    path,
                    dedup_id,
                    status: WriteStatus::Failure(issue.into()),
                };
            }
        };

        if batch.num_rows() == 0 {
            debug!("Empty write to {} acknowledged without fan-out", path);
            return WriteResult {
                tx_id,
                path,
                dedup_id,
                status: WriteStatus::Success,
            };
        }

        let routed = match route_batch(&layout, &batch) {
            Ok(routed) => routed,
            Err(e) => {
                warn!("Write {} to {} could not be routed: {}", tx_id, path, e);
                let issue = Issue::error(IssueCode::PartitionRoutingFailure, e.to_string());
                return WriteResult {
                    tx_id,
                    path,
                    dedup_id,
                    status: WriteStatus::Failure(issue.into()),
                };
            }
        };
        self.metrics.rows_routed.inc_by(batch.num_rows() as u64);

        // One task per shard slice. The set is also the cancellation scope:
        // when a submitted write is aborted, dropping the set aborts these.
        let mut ops = JoinSet::new();
        for (shard, rows) in routed {
            let shard_request = ShardWriteRequest {
                shard,
                tx_id,
                dedup_id: dedup_id.clone(),
                path: path.clone(),
                batch: rows,
            };
            let client = Arc::clone(&self.shards);
            let options = self.options;
            let metrics = self.metrics.clone();
            ops.spawn(write_one_shard(client, shard_request, options, metrics));
        }
        let total_ops = ops.len();

        let mut outcomes: Vec<(ShardId, Result<ShardAck, Issue>)> =
            Vec::with_capacity(total_ops);
        let mut stray_issues = Issues::new();
        while let Some(joined) = ops.join_next().await {
            match joined {
                Ok((shard, outcome)) => {
                    let failed = outcome.is_err();
                    outcomes.push((shard, outcome));
                    if failed && self.options.completion == CompletionPolicy::FailFast {
                        ops.abort_all();
                    }
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    error!("Shard write task failed: {}", e);
                    stray_issues.push(Issue::error(
                        IssueCode::ShardUnavailable,
                        format!("shard write task failed: {e}"),
                    ));
                }
            }
        }

        // Deterministic reply: issues ordered by shard id no matter how the
        // ops interleaved.
        outcomes.sort_by_key(|(shard, _)| *shard);
        let mut issues = Issues::new();
        let mut acked = 0usize;
        let mut deduplicated = 0usize;
        for (_, outcome) in outcomes {
            match outcome {
                Ok(ack) => {
                    acked += 1;
                    if ack.deduplicated {
                        deduplicated += 1;
                    }
                }
                Err(issue) => issues.push(issue),
            }
        }
        issues.extend(stray_issues);

        if issues.is_empty() && acked == total_ops {
            info!(
                "Write {} to {} applied on {} shards ({} deduplicated)",
                tx_id, path, acked, deduplicated
            );
            WriteResult {
                tx_id,
                path,
                dedup_id,
                status: WriteStatus::Success,
            }
        } else {
            if acked > 0 {
                issues.push(Issue::warning(
                    IssueCode::PartialApplication,
                    format!("{acked} of {total_ops} partitions applied"),
                ));
            }
            warn!("Write {} to {} failed: {}", tx_id, path, issues);
            WriteResult {
                tx_id,
                path,
                dedup_id,
                status: WriteStatus::Failure(issues),
            }
        }
    }
}

/// One shard operation: bounded attempts, each under the op timeout.
/// Timeouts and unavailability retry per policy; rejection is final.
async fn write_one_shard(
    client: Arc<dyn ShardWriteClient>,
    request: ShardWriteRequest,
    options: WriteOptions,
    metrics: LongTxMetrics,
) -> (ShardId, Result<ShardAck, Issue>) {
    let shard = request.shard;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        metrics.shard_ops_total.inc();
        let issue = match timeout(options.op_timeout, client.write(request.clone())).await {
            Ok(Ok(ack)) => {
                if ack.deduplicated {
                    metrics.dedup_hits_total.inc();
                    debug!(
                        "Shard {} deduplicated write {} '{}'",
                        shard, request.tx_id, request.dedup_id
                    );
                }
                return (shard, Ok(ack));
            }
            Ok(Err(e)) if !e.is_retryable() => {
                warn!("Shard {} rejected write {}: {}", shard, request.tx_id, e);
                return (
                    shard,
                    Err(Issue::error(IssueCode::ShardWriteRejected, e.to_string())),
                );
            }
            Ok(Err(e)) => Issue::error(IssueCode::ShardUnavailable, e.to_string()),
            Err(_) => Issue::error(
                IssueCode::OperationTimedOut,
                format!(
                    "shard {} did not reply within {:?}",
                    shard, options.op_timeout
                ),
            ),
        };
        match options.retry.delay_before(attempt + 1) {
            Some(delay) => {
                metrics.shard_retries_total.inc();
                debug!(
                    "Retrying shard {} after {:?} (attempt {} failed: {})",
                    shard, delay, attempt, issue
                );
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
            None => return (shard, Err(issue)),
        }
    }
}

/// Check the navigated snapshot matches the request path and names a
/// writable table with a sane layout.
fn validated_layout(
    path: &TablePath,
    navigated: &NavigateResult,
) -> Result<TablePartitioning, Issue> {
    if navigated.path != *path {
        return Err(Issue::error(
            IssueCode::PathResolutionFailure,
            format!("navigation snapshot is for {}, not {}", navigated.path, path),
        ));
    }
    match &navigated.entry {
        ResolvedEntry::Table(layout) => match layout.validate() {
            Ok(()) => Ok(layout.clone()),
            Err(e) => Err(Issue::error(
                IssueCode::PathResolutionFailure,
                format!("layout for {} is malformed: {}", path, e),
            )),
        },
        ResolvedEntry::Missing => Err(Issue::error(
            IssueCode::PathResolutionFailure,
            format!("no table at {}", path),
        )),
        ResolvedEntry::NotWritable { reason } => Err(Issue::error(
            IssueCode::PathResolutionFailure,
            format!("{} does not accept batch writes: {}", path, reason),
        )),
    }
}

#[cfg(test)]
mod tests {
    use rill_core::{KeyRange, KeyValue, Partition};

    use super::*;

    fn table(path: &str) -> TablePath {
        TablePath::new(path).unwrap()
    }

    fn layout() -> TablePartitioning {
        TablePartitioning::ranged_i64("id", 0, 10, &[ShardId(1)])
    }

    #[test]
    fn test_validated_layout_accepts_matching_table() {
        let navigated = NavigateResult {
            path: table("/db/t"),
            entry: ResolvedEntry::Table(layout()),
        };
        let got = validated_layout(&table("/db/t"), &navigated).unwrap();
        assert_eq!(got, layout());
    }

    #[test]
    fn test_validated_layout_rejects_path_mismatch() {
        let navigated = NavigateResult {
            path: table("/db/other"),
            entry: ResolvedEntry::Table(layout()),
        };
        let issue = validated_layout(&table("/db/t"), &navigated).err().unwrap();
        assert_eq!(issue.code, IssueCode::PathResolutionFailure);
        assert!(issue.message.contains("/db/other"));
    }

    #[test]
    fn test_validated_layout_rejects_missing_and_unwritable() {
        let missing = NavigateResult {
            path: table("/db/t"),
            entry: ResolvedEntry::Missing,
        };
        assert!(validated_layout(&table("/db/t"), &missing).is_err());

        let unwritable = NavigateResult {
            path: table("/db/t"),
            entry: ResolvedEntry::NotWritable {
                reason: "view".to_string(),
            },
        };
        let issue = validated_layout(&table("/db/t"), &unwritable)
            .err()
            .unwrap();
        assert!(issue.message.contains("view"));
    }

    #[test]
    fn test_validated_layout_rejects_malformed_layout() {
        let overlapping = TablePartitioning {
            key_column: "id".to_string(),
            partitions: vec![
                Partition {
                    range: KeyRange {
                        lower: Some(KeyValue::Int64(0)),
                        upper: Some(KeyValue::Int64(10)),
                    },
                    shard: ShardId(1),
                },
                Partition {
                    range: KeyRange {
                        lower: Some(KeyValue::Int64(5)),
                        upper: None,
                    },
                    shard: ShardId(2),
                },
            ],
        };
        let navigated = NavigateResult {
            path: table("/db/t"),
            entry: ResolvedEntry::Table(overlapping),
        };
        let issue = validated_layout(&table("/db/t"), &navigated).err().unwrap();
        assert_eq!(issue.code, IssueCode::PathResolutionFailure);
        assert!(issue.message.contains("malformed"));
    }
}
