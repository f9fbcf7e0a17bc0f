//! Driver contracts implemented by connectors.
//!
//! A driver is the logical half of a source or sink: it lives on the
//! dataflow task that owns it and is polled from there. Long-lived work
//! (prefetching, connection upkeep, flushing) belongs in the runtime half
//! the creator spawns alongside it.

use arrow::array::RecordBatch;
use async_trait::async_trait;

/// Task-facing read surface of a source.
#[async_trait]
pub trait SourceDriver: Send {
    /// Registry key this driver was built from.
    fn source_type(&self) -> &str;

    /// Pull the next batch, at most `max_rows` rows. `Ok(None)` = exhausted.
    async fn next_batch(&mut self, max_rows: usize) -> anyhow::Result<Option<RecordBatch>>;
}

/// Task-facing write surface of a sink.
#[async_trait]
pub trait SinkDriver: Send {
    /// Registry key this driver was built from.
    fn sink_type(&self) -> &str;

    /// Hand one batch over to the sink.
    async fn enqueue(&mut self, batch: RecordBatch) -> anyhow::Result<()>;

    /// Flush everything outstanding and seal the output.
    async fn finish(&mut self) -> anyhow::Result<()>;
}
