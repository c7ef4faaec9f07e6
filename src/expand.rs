//! The expander: replay a record stream against the dictionary bytes.
//!
//! Records are consumed until the source runs dry at a record boundary.
//! Anything else — a truncated record, a malformed varint, a reference
//! outside the dictionary — aborts with a decode error and the caller sees
//! no partial output. Reference bounds are length-checked slices, so a
//! hostile stream cannot index out of range.

use std::io::Read;

use crate::types::{PackError, Record};
use crate::wire;

pub struct Expander<'d, R: Read> {
    source: R,
    dict: &'d [u8],
}

impl<'d, R: Read> Expander<'d, R> {
    pub fn new(source: R, dict: &'d [u8]) -> Self {
        Expander { source, dict }
    }

    /// Append the reconstructed bytes to `out` and return it. On any decode
    /// failure the buffer is consumed and only the error escapes.
    pub fn expand_into(mut self, mut out: Vec<u8>) -> Result<Vec<u8>, PackError> {
        while let Some(record) = wire::read_record(&mut self.source)? {
            match record {
                Record::Literal { data } => out.extend_from_slice(&data),
                Record::Reference { offset, length } => {
                    let start = offset as usize;
                    let slice = start
                        .checked_add(length as usize)
                        .and_then(|end| self.dict.get(start..end))
                        .ok_or_else(|| {
                            PackError::InvalidFormat(format!(
                                "reference {}+{} outside dictionary of {} bytes",
                                offset,
                                length,
                                self.dict.len()
                            ))
                        })?;
                    out.extend_from_slice(slice);
                }
            }
        }
        Ok(out)
    }

    /// Reconstruct into a fresh buffer.
    pub fn expand(self) -> Result<Vec<u8>, PackError> {
        self.expand_into(Vec::new())
    }
}
