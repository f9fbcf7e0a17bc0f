//! Arrow IPC stream codec for write payloads.

use std::io::Cursor;

use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;

use crate::error::CoreError;

/// Serialize one batch as an Arrow IPC stream.
pub fn encode_batch(batch: &RecordBatch) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    let mut writer = StreamWriter::try_new(&mut buf, batch.schema().as_ref())?;
    writer.write(batch)?;
    writer.finish()?;
    drop(writer);
    Ok(buf)
}

/// Read an Arrow IPC stream back into a single batch.
///
/// Multi-frame streams are concatenated. Streams carrying no batches are
/// rejected; a zero-row batch is fine.
pub fn decode_batch(data: &[u8]) -> Result<RecordBatch, CoreError> {
    let reader = StreamReader::try_new(Cursor::new(data), None)?;
    let schema = reader.schema();
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    if batches.is_empty() {
        return Err(CoreError::PayloadCodec("empty ipc stream".to_string()));
    }
    if batches.len() == 1 {
        return Ok(batches.swap_remove(0));
    }
    Ok(concat_batches(&schema, &batches)?)
}
