//! Record framing for the compressed stream.
//!
//! Format (no header, no footer):
//!   Literal:   varint(n > 0), then n raw bytes
//!   Reference: 0x00, then varint(offset), varint(length)
//!
//! A length of zero cannot occur in a literal, so the single byte 0x00
//! doubles as the reference discriminator.

use std::io::{ErrorKind, Read, Write};

use crate::types::{PackError, Record};
use crate::varint;

/// Write a literal record. Returns bytes written to the sink.
///
/// `data` must be non-empty; an empty literal would collide with the
/// reference discriminator.
pub fn write_literal<W: Write>(sink: &mut W, data: &[u8]) -> Result<usize, PackError> {
    debug_assert!(!data.is_empty());
    let len = u32::try_from(data.len())
        .map_err(|_| PackError::InvalidFormat("literal exceeds u32 range".into()))?;
    let mut n = varint::encode(sink, len)?;
    sink.write_all(data)?;
    n += data.len();
    Ok(n)
}

/// Write a reference record. Returns bytes written to the sink.
pub fn write_reference<W: Write>(
    sink: &mut W,
    offset: u32,
    length: u32,
) -> Result<usize, PackError> {
    let mut n = varint::encode(sink, 0)?;
    n += varint::encode(sink, offset)?;
    n += varint::encode(sink, length)?;
    Ok(n)
}

/// Read the next record, or `None` at a clean end of stream.
///
/// End-of-input is only legal between records; anywhere else it surfaces as
/// `UnexpectedEof`.
pub fn read_record<R: Read>(source: &mut R) -> Result<Option<Record>, PackError> {
    let tag = match varint::decode(source)? {
        Some(t) => t,
        None => return Ok(None),
    };
    if tag == 0 {
        let offset = require(varint::decode(source)?)?;
        let length = require(varint::decode(source)?)?;
        return Ok(Some(Record::Reference { offset, length }));
    }
    let mut data = vec![0u8; tag as usize];
    source.read_exact(&mut data).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => PackError::UnexpectedEof,
        _ => PackError::IoError(e),
    })?;
    Ok(Some(Record::Literal { data }))
}

fn require(value: Option<u32>) -> Result<u32, PackError> {
    value.ok_or(PackError::UnexpectedEof)
}

/// Collect every record in the stream. Used by diagnostics and tests; the
/// expander streams records instead.
pub fn read_all<R: Read>(source: &mut R) -> Result<Vec<Record>, PackError> {
    let mut records = Vec::new();
    while let Some(record) = read_record(source)? {
        records.push(record);
    }
    Ok(records)
}
