//! Message framing
//!
//! Every request and response travels as one frame:
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │      Payload (Len bytes)    │
//! └──────────┴─────────────────────────────┘
//! ```
//! `Len` is a little-endian i32. Short reads surface as transport errors;
//! an impossible length surfaces as a decode error.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{IgniteError, Result};

/// Size of the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload size (16 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Prefix `payload` with its length
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    let len = i32::try_from(payload.len()).map_err(|_| {
        IgniteError::Encode(format!("frame payload too large: {} bytes", payload.len()))
    })?;

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.put_i32_le(len);
    frame.put_slice(payload);
    Ok(frame.freeze())
}

/// Write one frame in a single `write_all`, then flush
///
/// Returns the number of bytes written, prefix included.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> Result<u64> {
    let frame = encode_frame(payload)?;
    writer
        .write_all(&frame)
        .map_err(|e| IgniteError::transport("send request", e))?;
    writer
        .flush()
        .map_err(|e| IgniteError::transport("flush request", e))?;
    Ok(frame.len() as u64)
}

/// Validate a received length prefix
pub fn decode_length(prefix: [u8; LENGTH_PREFIX_SIZE], max_frame_size: usize) -> Result<usize> {
    let len = i32::from_le_bytes(prefix);
    let len = usize::try_from(len)
        .map_err(|_| IgniteError::Decode(format!("negative frame length: {}", len)))?;

    if len > max_frame_size {
        return Err(IgniteError::Decode(format!(
            "Frame too large: {} bytes (max {})",
            len, max_frame_size
        )));
    }
    Ok(len)
}

/// Read exactly one frame and return its payload
///
/// Blocks until the whole payload has arrived or the stream fails.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R, max_frame_size: usize) -> Result<Bytes> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader
        .read_exact(&mut prefix)
        .map_err(|e| IgniteError::transport("read response length", e))?;

    let len = decode_length(prefix, max_frame_size)?;

    let mut payload = vec![0u8; len];
    if len > 0 {
        reader
            .read_exact(&mut payload)
            .map_err(|e| IgniteError::transport("read response payload", e))?;
    }

    Ok(Bytes::from(payload))
}
