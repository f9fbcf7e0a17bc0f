//! Typed errors for the core domain types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid table path: {0}")]
    InvalidPath(String),

    #[error("invalid partition layout: {0}")]
    InvalidLayout(String),

    #[error("invalid long tx id: {0}")]
    InvalidTxId(String),

    #[error("payload codec: {0}")]
    PayloadCodec(String),
}

impl From<arrow::error::ArrowError> for CoreError {
    fn from(e: arrow::error::ArrowError) -> Self {
        CoreError::PayloadCodec(e.to_string())
    }
}
