//! The compressor: buffer the input, locate dictionary matches with the
//! rolling fingerprint, and emit literal and reference records.
//!
//! The scan is greedy and first-match. A candidate window is accepted only
//! after byte-for-byte confirmation, then grown backward (at most one block,
//! never into bytes already emitted) and forward (to the first mismatch or
//! either buffer's end). After a match the scan suppresses further matches
//! for one block plus one byte past the emitted material, but keeps rolling
//! the hash through the suppressed region so the fingerprint never
//! desynchronizes from the window.

use std::io::{self, Write};

use crate::dict::{self, Dictionary};
use crate::hash::RollingHash;
use crate::types::{PackError, BLOCK};
use crate::wire;

pub struct Compressor<W: Write> {
    sink: W,
    dict: Option<Dictionary>,
    buf: Vec<u8>,
    hash: RollingHash,
    in_bytes: u64,
    out_bytes: u64,
}

impl<W: Write> Compressor<W> {
    /// Records are written to `sink` during `finalize`; the sink is flushed
    /// but never closed.
    pub fn new(sink: W) -> Self {
        Compressor {
            sink,
            dict: None,
            buf: Vec::new(),
            hash: RollingHash::new(),
            in_bytes: 0,
            out_bytes: 0,
        }
    }

    /// Attach the reference dictionary, building its index if it has none.
    pub fn attach_dictionary(&mut self, dict: Dictionary) {
        self.dict = Some(dict.into_indexed());
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dict.as_ref()
    }

    /// Serialize the attached dictionary's index (see [`dict::serialize_index`]).
    /// Writes nothing if no indexed dictionary is attached.
    pub fn serialize_index<S: Write>(&self, sink: &mut S) -> Result<usize, PackError> {
        match self.dict.as_ref().and_then(Dictionary::index) {
            Some(index) => dict::serialize_index(index, sink),
            None => Ok(0),
        }
    }

    /// Bytes accepted so far.
    pub fn input_size(&self) -> u64 {
        self.in_bytes
    }

    /// Bytes emitted to the sink so far.
    pub fn output_size(&self) -> u64 {
        self.out_bytes
    }

    /// Output-to-input size in units of 1/10000, or -1 before any input.
    pub fn ratio(&self) -> i64 {
        if self.in_bytes == 0 {
            return -1;
        }
        ((self.out_bytes * 10_000) / self.in_bytes) as i64
    }

    /// Recover the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Run the match-and-extend pass over everything buffered since the last
    /// finalize and flush the records to the sink.
    pub fn finalize(&mut self) -> Result<(), PackError> {
        let data = std::mem::take(&mut self.buf);
        self.hash.reset();

        // last: end of the last-emitted input position.
        // skip: positions below this are barred from matching; they cover
        // the just-emitted reference plus one settling byte.
        let mut last = 0usize;
        let mut skip = 0usize;

        for i in 0..data.len() {
            if i < BLOCK {
                self.hash.seed(data[i]);
                continue;
            }
            // The fingerprint now covers data[i - BLOCK..i].
            if i >= skip {
                if let Some((back, fwd, entry)) = self.probe(&data, i, last) {
                    let lit_end = i - BLOCK - back;
                    if last < lit_end {
                        self.out_bytes +=
                            wire::write_literal(&mut self.sink, &data[last..lit_end])? as u64;
                    }
                    self.out_bytes += wire::write_reference(
                        &mut self.sink,
                        (entry - back) as u32,
                        (BLOCK + back + fwd) as u32,
                    )? as u64;
                    last = i + fwd;
                    skip = i + fwd + BLOCK + 1;
                }
            }
            // Roll on every position, matched or not.
            self.hash.roll(data[i - BLOCK], data[i]);
        }

        if last < data.len() {
            self.out_bytes += wire::write_literal(&mut self.sink, &data[last..])? as u64;
        }
        self.sink.flush()?;
        Ok(())
    }

    /// Try to confirm and extend a match for the window ending just before
    /// `i`. Returns (backward extension, forward extension, entry position).
    fn probe(&self, data: &[u8], i: usize, last: usize) -> Option<(usize, usize, usize)> {
        let dict = self.dict.as_ref()?;
        let entry = dict.lookup(self.hash.value())? as usize;
        let bytes = dict.bytes();
        let start = i - BLOCK;

        // The fingerprint is lossy: confirm byte-for-byte before acting.
        // The checked slice also rejects out-of-range entries from a
        // foreign index.
        let window = entry
            .checked_add(BLOCK)
            .and_then(|end| bytes.get(entry..end))?;
        if window != &data[start..i] {
            return None;
        }

        // Grow backward, at most BLOCK - 1 bytes, never consuming bytes
        // already emitted nor crossing either buffer's start.
        let mut back = 0usize;
        while back < BLOCK - 1 {
            let t = back + 1;
            if i < last + BLOCK + t || entry < t || i < BLOCK + t {
                break;
            }
            if bytes[entry - t] != data[start - t] {
                break;
            }
            back = t;
        }

        // Grow forward to the first mismatch or either buffer's end.
        let mut fwd = 0usize;
        while entry + BLOCK + fwd < bytes.len()
            && i + fwd < data.len()
            && bytes[entry + BLOCK + fwd] == data[i + fwd]
        {
            fwd += 1;
        }

        Some((back, fwd, entry))
    }
}

impl<W: Write> Write for Compressor<W> {
    /// Append to the internal buffer; nothing reaches the sink until
    /// `finalize`. Always accepts the whole slice.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        self.in_bytes += data.len() as u64;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
