//! Identifier newtypes shared across the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Identity of a compute node within the cluster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the shard owning one table partition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ShardId(pub u64);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const LONG_TX_PREFIX: &str = "rill://long-tx/";

/// Identity of a long-running multi-statement transaction.
///
/// Opaque on the write path: the coordinator tags shard writes with it but
/// never interprets or generates one. Carried on the wire in the canonical
/// string form `rill://long-tx/<uuid>?node_id=<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct LongTxId {
    pub unique_id: Uuid,
    pub node: NodeId,
}

impl LongTxId {
    /// Mint a fresh transaction id homed on `node`.
    pub fn generate(node: NodeId) -> Self {
        Self {
            unique_id: Uuid::new_v4(),
            node,
        }
    }
}

impl fmt::Display for LongTxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}?node_id={}", LONG_TX_PREFIX, self.unique_id, self.node)
    }
}

impl FromStr for LongTxId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix(LONG_TX_PREFIX).ok_or_else(|| {
            CoreError::InvalidTxId(format!("missing {LONG_TX_PREFIX} prefix: {s}"))
        })?;
        let (id_part, node_part) = rest
            .split_once("?node_id=")
            .ok_or_else(|| CoreError::InvalidTxId(format!("missing node_id: {s}")))?;
        let unique_id = Uuid::parse_str(id_part)
            .map_err(|e| CoreError::InvalidTxId(format!("bad uuid in {s}: {e}")))?;
        let node = node_part
            .parse::<u32>()
            .map_err(|e| CoreError::InvalidTxId(format!("bad node_id in {s}: {e}")))?;
        Ok(Self {
            unique_id,
            node: NodeId(node),
        })
    }
}

impl From<LongTxId> for String {
    fn from(id: LongTxId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for LongTxId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Caller-chosen idempotency key for one logical write inside a long tx.
///
/// Shards deduplicate on `(tx id, dedup id)`; the write path never
/// generates these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupId(pub String);

impl DedupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DedupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_tx_id_round_trip() {
        let id = LongTxId::generate(NodeId(7));
        let rendered = id.to_string();
        assert!(rendered.starts_with("rill://long-tx/"));
        assert!(rendered.ends_with("?node_id=7"));
        let parsed: LongTxId = rendered.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_long_tx_id_rejects_malformed() {
        assert!("".parse::<LongTxId>().is_err());
        assert!("other://long-tx/abc?node_id=1".parse::<LongTxId>().is_err());
        assert!("rill://long-tx/not-a-uuid?node_id=1"
            .parse::<LongTxId>()
            .is_err());
        let id = LongTxId::generate(NodeId(1));
        let no_node = format!("rill://long-tx/{}", id.unique_id);
        assert!(no_node.parse::<LongTxId>().is_err());
        let bad_node = format!("rill://long-tx/{}?node_id=x", id.unique_id);
        assert!(bad_node.parse::<LongTxId>().is_err());
    }

    #[test]
    fn test_long_tx_id_serializes_as_string() {
        let id = LongTxId::generate(NodeId(3));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: LongTxId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
