pub mod types;
pub mod hash;
pub mod varint;
pub mod wire;
pub mod dict;
pub mod compress;
pub mod expand;

// Re-exports for convenience
pub use types::{
    stream_summary, PackError, Record, StreamSummary, BLOCK, MASK, MODULUS, RADIX,
};
pub use hash::{fingerprint, leading_digits, RollingHash};
pub use wire::{read_all, read_record, write_literal, write_reference};
pub use dict::{build_index, deserialize_index, serialize_index, Dictionary, FingerprintIndex};
pub use compress::Compressor;
pub use expand::Expander;
