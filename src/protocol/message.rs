//! Request and response seams
//!
//! The exchange primitive only needs a request that can serialize itself and a
//! response that can populate itself from a framed byte source.

use std::io::{Read, Write};

use crate::error::Result;
use super::codec::{BinaryReader, BinaryWriter};
use super::frame::{read_frame, write_frame, LENGTH_PREFIX_SIZE};

/// An outbound message
pub trait Request {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Serialize the payload (without the length prefix)
    fn write_payload(&self, out: &mut BinaryWriter) -> Result<()>;

    /// Serialize and write one frame. Returns bytes written.
    fn write_to(&self, sink: &mut dyn Write) -> Result<u64> {
        let mut out = BinaryWriter::new();
        self.write_payload(&mut out)?;
        write_frame(sink, out.as_slice())
    }
}

/// An inbound message
pub trait Response {
    /// Populate self from an unframed payload
    fn read_payload(&mut self, payload: BinaryReader) -> Result<()>;

    /// Read one frame from `source` and populate self. Returns bytes consumed.
    fn read_from(&mut self, source: &mut dyn Read, max_frame_size: usize) -> Result<u64> {
        let payload = read_frame(source, max_frame_size)?;
        let consumed = (LENGTH_PREFIX_SIZE + payload.len()) as u64;
        self.read_payload(BinaryReader::new(payload))?;
        Ok(consumed)
    }
}

/// Response that keeps its payload undecoded
///
/// Callers pull fields out of [`RawResponse::body`] with the codec.
#[derive(Debug, Default)]
pub struct RawResponse {
    body: BinaryReader,
}

impl RawResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&mut self) -> &mut BinaryReader {
        &mut self.body
    }

    pub fn into_body(self) -> BinaryReader {
        self.body
    }
}

impl Response for RawResponse {
    fn read_payload(&mut self, payload: BinaryReader) -> Result<()> {
        self.body = payload;
        Ok(())
    }
}
