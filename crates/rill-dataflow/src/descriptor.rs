//! Plan descriptors and construction arguments for task I/O.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use rill_core::NodeId;

use crate::envelope::SettingsAny;

/// Where a task reads its input from, as written in the physical plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Registry key, e.g. `"csv"` or `"kafka"`.
    pub source_type: String,
    /// Connector-specific settings envelope.
    pub settings: SettingsAny,
}

/// Where a task writes its output to, as written in the physical plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkDescriptor {
    pub sink_type: String,
    pub settings: SettingsAny,
}

/// Notifications a running source or sink sends back to its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoEvent {
    /// New input is available to poll.
    DataReady { task_id: u64 },
    /// The runtime half stopped, normally or with an error.
    Stopped { task_id: u64, error: Option<String> },
}

/// Everything a source creator needs to build a live source.
///
/// Moved into the creator whole; the factory retains nothing.
pub struct SourceArguments {
    pub descriptor: SourceDescriptor,
    /// Id of the dataflow task this source feeds.
    pub task_id: u64,
    /// Node the task runs on.
    pub node: NodeId,
    /// Channel for runtime-half notifications back to the task.
    pub events: mpsc::Sender<IoEvent>,
}

/// Everything a sink creator needs to build a live sink.
pub struct SinkArguments {
    pub descriptor: SinkDescriptor,
    pub task_id: u64,
    pub node: NodeId,
    pub events: mpsc::Sender<IoEvent>,
}
