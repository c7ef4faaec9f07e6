//! Reference dictionary and its block-granular fingerprint index.
//!
//! The index maps fingerprints to the start of the first block-aligned
//! window observed with that fingerprint. Only non-overlapping windows at
//! multiples of `BLOCK` are indexed; the rolling scan of the input supplies
//! the per-position granularity at match time.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};

use crate::hash::fingerprint;
use crate::types::{PackError, BLOCK};

/// Fingerprint of a window, mapped to the window's byte offset.
pub type FingerprintIndex = HashMap<u32, u32>;

/// Reference bytes, with or without a fingerprint index.
///
/// A `Raw` dictionary is promoted to `Indexed` when attached to a
/// compressor; expansion needs only the bytes. Once indexed the dictionary
/// is immutable and may be shared freely across compressors and expanders.
#[derive(Clone, Debug)]
pub enum Dictionary {
    Raw(Vec<u8>),
    Indexed(Vec<u8>, FingerprintIndex),
}

impl Dictionary {
    /// The reference byte sequence.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Dictionary::Raw(bytes) | Dictionary::Indexed(bytes, _) => bytes,
        }
    }

    pub fn index(&self) -> Option<&FingerprintIndex> {
        match self {
            Dictionary::Raw(_) => None,
            Dictionary::Indexed(_, index) => Some(index),
        }
    }

    /// Promote to `Indexed`, building the index if none was supplied.
    pub fn into_indexed(self) -> Dictionary {
        match self {
            Dictionary::Raw(bytes) => {
                let index = build_index(&bytes);
                Dictionary::Indexed(bytes, index)
            }
            indexed => indexed,
        }
    }

    /// Position of the first indexed window with this fingerprint, if any.
    pub fn lookup(&self, fp: u32) -> Option<u32> {
        self.index().and_then(|index| index.get(&fp).copied())
    }
}

/// Fingerprint every non-overlapping `BLOCK`-length window. The first window
/// observed with a given fingerprint wins; later collisions are discarded.
///
/// Dictionaries shorter than one block produce an empty index.
pub fn build_index(bytes: &[u8]) -> FingerprintIndex {
    let mut index = FingerprintIndex::new();
    let mut pos = 0;
    while pos + BLOCK <= bytes.len() {
        index
            .entry(fingerprint(&bytes[pos..pos + BLOCK]))
            .or_insert(pos as u32);
        pos += BLOCK;
    }
    index
}

/// Serialize the index as `(fingerprint, position)` pairs of little-endian
/// u32s, 8 bytes per entry, in arbitrary order. Returns bytes written.
pub fn serialize_index<W: Write>(
    index: &FingerprintIndex,
    sink: &mut W,
) -> Result<usize, PackError> {
    for (&fp, &pos) in index {
        sink.write_all(&fp.to_le_bytes())?;
        sink.write_all(&pos.to_le_bytes())?;
    }
    Ok(index.len() * 8)
}

/// Read `(fingerprint, position)` pairs until the source is exhausted,
/// inserting each into `into`. Truncation mid-pair is an error.
pub fn deserialize_index<R: Read>(
    source: &mut R,
    into: &mut FingerprintIndex,
) -> Result<(), PackError> {
    loop {
        let mut pair = [0u8; 8];
        match read_full(source, &mut pair)? {
            0 => return Ok(()),
            8 => {
                let fp = u32::from_le_bytes([pair[0], pair[1], pair[2], pair[3]]);
                let pos = u32::from_le_bytes([pair[4], pair[5], pair[6], pair[7]]);
                into.insert(fp, pos);
            }
            _ => return Err(PackError::UnexpectedEof),
        }
    }
}

/// Fill `buf` as far as the source allows; a short count means EOF.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize, PackError> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(PackError::IoError(e)),
        }
    }
    Ok(filled)
}
