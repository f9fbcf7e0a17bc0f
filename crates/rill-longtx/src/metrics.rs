//! Prometheus metrics for the long-tx write path.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct OutcomeLabel(pub String);

impl prometheus_client::encoding::EncodeLabelSet for OutcomeLabel {
    fn encode(
        &self,
        mut encoder: prometheus_client::encoding::LabelSetEncoder,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("outcome", self.0.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct LongTxMetrics {
    pub writes_total: Family<OutcomeLabel, Counter>,
    pub rows_routed: Counter,
    pub shard_ops_total: Counter,
    pub shard_retries_total: Counter,
    pub dedup_hits_total: Counter,
    pub inflight_writes: Gauge,
    pub registry: Arc<Registry>,
}

impl LongTxMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let writes_total = Family::<OutcomeLabel, Counter>::default();
        registry.register(
            "rill_longtx_writes",
            "Coordinated writes by outcome",
            writes_total.clone(),
        );

        let rows_routed = Counter::default();
        registry.register(
            "rill_longtx_rows_routed",
            "Rows routed into shard sub-batches",
            rows_routed.clone(),
        );

        let shard_ops_total = Counter::default();
        registry.register(
            "rill_longtx_shard_ops",
            "Shard write attempts",
            shard_ops_total.clone(),
        );

        let shard_retries_total = Counter::default();
        registry.register(
            "rill_longtx_shard_retries",
            "Shard write attempts beyond the first",
            shard_retries_total.clone(),
        );

        let dedup_hits_total = Counter::default();
        registry.register(
            "rill_longtx_dedup_hits",
            "Shard writes acknowledged as already applied",
            dedup_hits_total.clone(),
        );

        let inflight_writes = Gauge::default();
        registry.register(
            "rill_longtx_inflight_writes",
            "Writes currently being coordinated",
            inflight_writes.clone(),
        );

        Self {
            writes_total,
            rows_routed,
            shard_ops_total,
            shard_retries_total,
            dedup_hits_total,
            inflight_writes,
            registry: Arc::new(registry),
        }
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).unwrap();
        buf
    }
}
