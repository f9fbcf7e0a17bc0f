//! Batch routing: split one batch into per-shard sub-batches by key column.

use std::collections::HashMap;
use std::fmt;

use arrow::array::{Array, Int64Array, RecordBatch, StringArray, UInt64Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::DataType;

use rill_core::{KeyValue, ShardId, TablePartitioning};

/// Why a batch could not be mapped onto a partition layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The batch has no column with the layout's key name.
    KeyColumnMissing { column: String },
    /// The key column cannot produce keys of the layout's kind.
    KeyTypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },
    /// Rows fall outside every partition range (null keys included).
    OutOfRange { rows: usize, example: String },
    /// An arrow kernel failed while materializing a sub-batch.
    SplitFailed(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::KeyColumnMissing { column } => {
                write!(f, "key column '{}' missing from batch", column)
            }
            RouteError::KeyTypeMismatch {
                column,
                expected,
                actual,
            } => write!(
                f,
                "key column '{}' has type {}, layout needs {}",
                column, actual, expected
            ),
            RouteError::OutOfRange { rows, example } => {
                write!(f, "{} rows outside the partition layout, e.g. {}", rows, example)
            }
            RouteError::SplitFailed(msg) => write!(f, "splitting batch failed: {}", msg),
        }
    }
}

impl std::error::Error for RouteError {}

enum KeyColumn<'a> {
    Int64(&'a Int64Array),
    Utf8(&'a StringArray),
}

impl KeyColumn<'_> {
    fn kind(&self) -> &'static str {
        match self {
            KeyColumn::Int64(_) => "int64",
            KeyColumn::Utf8(_) => "utf8",
        }
    }

    /// Key at `row`; `None` for a null.
    fn value_at(&self, row: usize) -> Option<KeyValue> {
        match self {
            KeyColumn::Int64(a) => (!a.is_null(row)).then(|| KeyValue::Int64(a.value(row))),
            KeyColumn::Utf8(a) => {
                (!a.is_null(row)).then(|| KeyValue::Utf8(a.value(row).to_string()))
            }
        }
    }
}

/// Split `batch` into per-shard sub-batches according to `layout`.
///
/// All-or-nothing: one unroutable row fails the whole batch before any
/// shard sees data. The input batch is never mutated; sub-batches keep row
/// order and are returned sorted by shard id. Empty slices are dropped.
pub fn route_batch(
    layout: &TablePartitioning,
    batch: &RecordBatch,
) -> Result<Vec<(ShardId, RecordBatch)>, RouteError> {
    let column_index = batch
        .schema()
        .index_of(&layout.key_column)
        .map_err(|_| RouteError::KeyColumnMissing {
            column: layout.key_column.clone(),
        })?;
    let column = batch.column(column_index).clone();

    let keys = match column.data_type() {
        DataType::Int64 => column
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(KeyColumn::Int64),
        DataType::Utf8 => column
            .as_any()
            .downcast_ref::<StringArray>()
            .map(KeyColumn::Utf8),
        _ => None,
    }
    .ok_or_else(|| RouteError::KeyTypeMismatch {
        column: layout.key_column.clone(),
        expected: "int64 or utf8".to_string(),
        actual: column.data_type().to_string(),
    })?;

    // A layout with typed bounds can only route keys of that kind.
    let layout_kind = layout
        .partitions
        .iter()
        .flat_map(|p| [&p.range.lower, &p.range.upper])
        .flatten()
        .map(|v| v.kind())
        .next();
    if let Some(expected) = layout_kind {
        if expected != keys.kind() {
            return Err(RouteError::KeyTypeMismatch {
                column: layout.key_column.clone(),
                expected: expected.to_string(),
                actual: keys.kind().to_string(),
            });
        }
    }

    // Row index lists per shard, in row order.
    let mut by_shard: HashMap<ShardId, Vec<u64>> = HashMap::new();
    let mut unroutable = 0usize;
    let mut example = String::new();
    for row in 0..batch.num_rows() {
        let located = keys.value_at(row).and_then(|key| layout.locate(&key));
        match located {
            Some(shard) => by_shard.entry(shard).or_default().push(row as u64),
            None => {
                unroutable += 1;
                if example.is_empty() {
                    example = match keys.value_at(row) {
                        Some(key) => format!("row {row} key {key:?}"),
                        None => format!("row {row} null key"),
                    };
                }
            }
        }
    }
    if unroutable > 0 {
        return Err(RouteError::OutOfRange {
            rows: unroutable,
            example,
        });
    }

    let mut shards: Vec<ShardId> = by_shard.keys().copied().collect();
    shards.sort_unstable();
    let mut routed = Vec::with_capacity(shards.len());
    for shard in shards {
        let rows = by_shard.remove(&shard).unwrap_or_default();
        let indices = UInt64Array::from(rows);
        let sub = take_record_batch(batch, &indices)
            .map_err(|e| RouteError::SplitFailed(e.to_string()))?;
        routed.push((shard, sub));
    }
    Ok(routed)
}
