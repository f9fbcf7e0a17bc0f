//! Partition layouts: a navigated snapshot of how a table's key space is
//! split into shard-owned key ranges.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::ShardId;
use crate::path::TablePath;

/// A typed partition-key value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum KeyValue {
    Int64(i64),
    Utf8(String),
}

impl KeyValue {
    /// Compare two values of the same kind. `None` when the kinds differ;
    /// there is no ordering across kinds.
    pub fn cmp_same_kind(&self, other: &KeyValue) -> Option<Ordering> {
        match (self, other) {
            (KeyValue::Int64(a), KeyValue::Int64(b)) => Some(a.cmp(b)),
            (KeyValue::Utf8(a), KeyValue::Utf8(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            KeyValue::Int64(_) => "int64",
            KeyValue::Utf8(_) => "utf8",
        }
    }
}

/// A single key-range partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    /// Inclusive lower bound. `None` = unbounded.
    pub lower: Option<KeyValue>,
    /// Exclusive upper bound. `None` = unbounded.
    pub upper: Option<KeyValue>,
}

impl KeyRange {
    /// Whether `key` falls inside the range. `None` when a bound has a
    /// different kind than `key`.
    pub fn contains(&self, key: &KeyValue) -> Option<bool> {
        if let Some(lower) = &self.lower {
            if key.cmp_same_kind(lower)? == Ordering::Less {
                return Some(false);
            }
        }
        if let Some(upper) = &self.upper {
            if key.cmp_same_kind(upper)? != Ordering::Less {
                return Some(false);
            }
        }
        Some(true)
    }
}

/// One partition of a table: a key range and the shard that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub range: KeyRange,
    pub shard: ShardId,
}

/// Point-in-time partitioning of one table.
///
/// Snapshots come from the scheme resolver and stay frozen for the duration
/// of a write; they are never refreshed mid-flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePartitioning {
    /// The column rows are routed by (must exist in every written batch).
    pub key_column: String,
    /// Ordered, non-overlapping partitions.
    pub partitions: Vec<Partition>,
}

impl TablePartitioning {
    /// Build a layout by splitting `[min, max)` into equal-sized integer
    /// ranges, one per shard.
    pub fn ranged_i64(key_column: &str, min: i64, max: i64, shards: &[ShardId]) -> Self {
        assert!(!shards.is_empty());
        let n = shards.len();
        let step = ((max - min) as f64 / n as f64).ceil() as i64;
        let mut partitions = Vec::with_capacity(n);
        let mut lo = min;
        for shard in shards {
            let hi = (lo + step).min(max);
            partitions.push(Partition {
                range: KeyRange {
                    lower: Some(KeyValue::Int64(lo)),
                    upper: if hi >= max {
                        None
                    } else {
                        Some(KeyValue::Int64(hi))
                    },
                },
                shard: *shard,
            });
            lo = hi;
            if lo >= max {
                break;
            }
        }
        Self {
            key_column: key_column.to_string(),
            partitions,
        }
    }

    /// Check the layout is well-formed: non-empty, one key kind throughout,
    /// ranges ordered and non-overlapping, unbounded ends only at the edges.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.key_column.is_empty() {
            return Err(CoreError::InvalidLayout("key column is empty".to_string()));
        }
        if self.partitions.is_empty() {
            return Err(CoreError::InvalidLayout("no partitions".to_string()));
        }
        for (i, p) in self.partitions.iter().enumerate() {
            if let (Some(lo), Some(hi)) = (&p.range.lower, &p.range.upper) {
                match lo.cmp_same_kind(hi) {
                    Some(Ordering::Less) => {}
                    Some(_) => {
                        return Err(CoreError::InvalidLayout(format!(
                            "partition {i} has an empty range"
                        )));
                    }
                    None => {
                        return Err(CoreError::InvalidLayout(format!(
                            "partition {i} mixes key kinds"
                        )));
                    }
                }
            }
        }
        for (i, pair) in self.partitions.windows(2).enumerate() {
            let upper = pair[0].range.upper.as_ref().ok_or_else(|| {
                CoreError::InvalidLayout(format!(
                    "partition {i} is unbounded above but not last"
                ))
            })?;
            let lower = pair[1].range.lower.as_ref().ok_or_else(|| {
                CoreError::InvalidLayout(format!(
                    "partition {} is unbounded below but not first",
                    i + 1
                ))
            })?;
            match upper.cmp_same_kind(lower) {
                Some(Ordering::Greater) => {
                    return Err(CoreError::InvalidLayout(format!(
                        "partitions {} and {} overlap",
                        i,
                        i + 1
                    )));
                }
                Some(_) => {}
                None => {
                    return Err(CoreError::InvalidLayout(format!(
                        "partitions {} and {} mix key kinds",
                        i,
                        i + 1
                    )));
                }
            }
        }
        Ok(())
    }

    /// Find the shard owning `key`. `None` when the key misses every range
    /// or its kind does not match the layout.
    pub fn locate(&self, key: &KeyValue) -> Option<ShardId> {
        self.partitions
            .iter()
            .find(|p| p.range.contains(key).unwrap_or(false))
            .map(|p| p.shard)
    }
}

/// What the scheme resolver knows about a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedEntry {
    /// A writable columnar table with its partition layout.
    Table(TablePartitioning),
    /// Nothing exists at the path.
    Missing,
    /// The entry exists but does not accept batch writes.
    NotWritable { reason: String },
}

/// Scheme navigation result handed to the write path.
///
/// Produced before the write by an external resolver and consumed as-is;
/// it may already be stale by the time shards apply the rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigateResult {
    pub path: TablePath,
    pub entry: ResolvedEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard_ids(ids: &[u64]) -> Vec<ShardId> {
        ids.iter().map(|id| ShardId(*id)).collect()
    }

    #[test]
    fn test_ranged_i64() {
        let layout = TablePartitioning::ranged_i64("id", 0, 100, &shard_ids(&[1, 2, 3, 4]));
        assert_eq!(layout.partitions.len(), 4);
        assert_eq!(
            layout.partitions[0].range.lower,
            Some(KeyValue::Int64(0))
        );
        assert_eq!(
            layout.partitions[0].range.upper,
            Some(KeyValue::Int64(25))
        );
        assert_eq!(
            layout.partitions[3].range.lower,
            Some(KeyValue::Int64(75))
        );
        assert_eq!(layout.partitions[3].range.upper, None);
        layout.validate().unwrap();
    }

    #[test]
    fn test_ranged_i64_single_shard() {
        let layout = TablePartitioning::ranged_i64("id", 0, 10, &shard_ids(&[9]));
        assert_eq!(layout.partitions.len(), 1);
        assert_eq!(layout.partitions[0].range.upper, None);
        assert_eq!(layout.partitions[0].shard, ShardId(9));
    }

    #[test]
    fn test_locate_bounds() {
        let layout = TablePartitioning::ranged_i64("id", 0, 100, &shard_ids(&[1, 2]));
        // [0, 50) -> 1, [50, inf) -> 2
        assert_eq!(layout.locate(&KeyValue::Int64(0)), Some(ShardId(1)));
        assert_eq!(layout.locate(&KeyValue::Int64(49)), Some(ShardId(1)));
        assert_eq!(layout.locate(&KeyValue::Int64(50)), Some(ShardId(2)));
        assert_eq!(layout.locate(&KeyValue::Int64(1_000_000)), Some(ShardId(2)));
        assert_eq!(layout.locate(&KeyValue::Int64(-1)), None);
        assert_eq!(layout.locate(&KeyValue::Utf8("50".to_string())), None);
    }

    #[test]
    fn test_utf8_layout() {
        let layout = TablePartitioning {
            key_column: "region".to_string(),
            partitions: vec![
                Partition {
                    range: KeyRange {
                        lower: None,
                        upper: Some(KeyValue::Utf8("m".to_string())),
                    },
                    shard: ShardId(1),
                },
                Partition {
                    range: KeyRange {
                        lower: Some(KeyValue::Utf8("m".to_string())),
                        upper: None,
                    },
                    shard: ShardId(2),
                },
            ],
        };
        layout.validate().unwrap();
        assert_eq!(
            layout.locate(&KeyValue::Utf8("alpha".to_string())),
            Some(ShardId(1))
        );
        assert_eq!(
            layout.locate(&KeyValue::Utf8("m".to_string())),
            Some(ShardId(2))
        );
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let layout = TablePartitioning {
            key_column: "id".to_string(),
            partitions: vec![
                Partition {
                    range: KeyRange {
                        lower: Some(KeyValue::Int64(0)),
                        upper: Some(KeyValue::Int64(60)),
                    },
                    shard: ShardId(1),
                },
                Partition {
                    range: KeyRange {
                        lower: Some(KeyValue::Int64(50)),
                        upper: None,
                    },
                    shard: ShardId(2),
                },
            ],
        };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mixed_kinds_and_holes_in_bounds() {
        let mixed = TablePartitioning {
            key_column: "id".to_string(),
            partitions: vec![
                Partition {
                    range: KeyRange {
                        lower: Some(KeyValue::Int64(0)),
                        upper: Some(KeyValue::Utf8("z".to_string())),
                    },
                    shard: ShardId(1),
                },
            ],
        };
        assert!(mixed.validate().is_err());

        let unbounded_middle = TablePartitioning {
            key_column: "id".to_string(),
            partitions: vec![
                Partition {
                    range: KeyRange {
                        lower: None,
                        upper: None,
                    },
                    shard: ShardId(1),
                },
                Partition {
                    range: KeyRange {
                        lower: Some(KeyValue::Int64(10)),
                        upper: None,
                    },
                    shard: ShardId(2),
                },
            ],
        };
        assert!(unbounded_middle.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let layout = TablePartitioning {
            key_column: "id".to_string(),
            partitions: vec![],
        };
        assert!(layout.validate().is_err());
    }
}
