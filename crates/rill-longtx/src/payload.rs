//! Wire envelope for columnar write payloads.

use arrow::array::RecordBatch;
use serde::{Deserialize, Serialize};

use rill_core::{ipc, CoreError};

/// Encoding of the row payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    ArrowIpc,
}

/// A columnar write payload as an RPC layer would carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePayload {
    pub format: PayloadFormat,
    pub data: Vec<u8>,
}

impl WritePayload {
    pub fn from_batch(batch: &RecordBatch) -> Result<Self, CoreError> {
        Ok(Self {
            format: PayloadFormat::ArrowIpc,
            data: ipc::encode_batch(batch)?,
        })
    }

    pub fn to_batch(&self) -> Result<RecordBatch, CoreError> {
        match self.format {
            PayloadFormat::ArrowIpc => ipc::decode_batch(&self.data),
        }
    }
}
