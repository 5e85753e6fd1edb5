//! Bounded codec adapters.
//!
//! Both codecs write into a caller-provided slice. The encoded size is
//! measured first with a counting writer, so an oversized document is
//! rejected before a single byte of the buffer is touched.

use std::io::{self, Write};

use serde::Deserialize;

use crate::Document;
use crate::error::{BusError, BusResult};

/// Encode and decode documents against fixed-capacity buffers.
pub trait Codec {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Number of bytes `doc` encodes to.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::EncodeFailed`] if the document cannot be encoded.
    fn encoded_len(&self, doc: &Document) -> BusResult<usize>;

    /// Encode into a buffer already known to be large enough.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::EncodeFailed`] on codec failure.
    fn write_unchecked(&self, doc: &Document, buf: &mut [u8]) -> BusResult<usize>;

    /// Decode a complete encoding.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::DecodeFailed`] for malformed or truncated input.
    fn decode(&self, bytes: &[u8]) -> BusResult<Document>;

    /// Encode `doc` into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::EncodeOverflow`] if the encoding does not fit,
    /// leaving `buf` untouched, and [`BusError::EncodeFailed`] if the codec
    /// fails or produces nothing.
    fn encode(&self, doc: &Document, buf: &mut [u8]) -> BusResult<usize> {
        let needed = self.encoded_len(doc)?;
        if needed == 0 {
            return Err(BusError::EncodeFailed(format!(
                "{} encoder produced no output",
                self.name()
            )));
        }
        if needed > buf.len() {
            return Err(BusError::EncodeOverflow {
                needed,
                capacity: buf.len(),
            });
        }

        let written = self.write_unchecked(doc, buf)?;
        if written != needed {
            return Err(BusError::EncodeFailed(format!(
                "{} encoder wrote {written} bytes, measured {needed}",
                self.name()
            )));
        }
        Ok(written)
    }
}

/// Counts bytes instead of storing them.
#[derive(Debug, Default)]
struct CountingWriter {
    count: usize,
}

impl Write for CountingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.count = self.count.saturating_add(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes into `buf`, returning how much of it was used.
fn write_into(
    buf: &mut [u8],
    f: impl FnOnce(&mut &mut [u8]) -> Result<(), String>,
) -> BusResult<usize> {
    let capacity = buf.len();
    let mut cursor: &mut [u8] = buf;
    f(&mut cursor).map_err(BusError::EncodeFailed)?;
    Ok(capacity.saturating_sub(cursor.len()))
}

/// MessagePack with named struct fields, the compact on-flash format.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn encoded_len(&self, doc: &Document) -> BusResult<usize> {
        let mut counter = CountingWriter::default();
        rmp_serde::encode::write_named(&mut counter, doc)
            .map_err(|e| BusError::EncodeFailed(e.to_string()))?;
        Ok(counter.count)
    }

    fn write_unchecked(&self, doc: &Document, buf: &mut [u8]) -> BusResult<usize> {
        write_into(buf, |cursor| {
            rmp_serde::encode::write_named(cursor, doc).map_err(|e| e.to_string())
        })
    }

    fn decode(&self, bytes: &[u8]) -> BusResult<Document> {
        if bytes.is_empty() {
            return Err(BusError::DecodeFailed("empty msgpack input".to_owned()));
        }

        let mut rest = bytes;
        let doc = {
            let mut de = rmp_serde::Deserializer::new(&mut rest);
            Document::deserialize(&mut de).map_err(|e| BusError::DecodeFailed(e.to_string()))?
        };

        // A JSON blob starts with a byte msgpack reads as a small integer.
        if !rest.is_empty() {
            return Err(BusError::DecodeFailed(format!(
                "{} trailing bytes after msgpack value",
                rest.len()
            )));
        }
        Ok(doc)
    }
}

/// JSON, the text format legacy records were written in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encoded_len(&self, doc: &Document) -> BusResult<usize> {
        let mut counter = CountingWriter::default();
        serde_json::to_writer(&mut counter, doc)
            .map_err(|e| BusError::EncodeFailed(e.to_string()))?;
        Ok(counter.count)
    }

    fn write_unchecked(&self, doc: &Document, buf: &mut [u8]) -> BusResult<usize> {
        write_into(buf, |cursor| {
            serde_json::to_writer(cursor, doc).map_err(|e| e.to_string())
        })
    }

    fn decode(&self, bytes: &[u8]) -> BusResult<Document> {
        serde_json::from_slice(bytes).map_err(|e| BusError::DecodeFailed(e.to_string()))
    }
}
