//! EUPH container format
//!
//! Binary layout (little-endian):
//!
//! | Offset | Field        | Size | Meaning                                  |
//! |--------|--------------|------|------------------------------------------|
//! | 0      | magic        | 4    | ASCII `EUPH`                             |
//! | 4      | version      | 2    | major, minor                             |
//! | 6      | total_length | 8    | byte length of the file, patched last    |
//! | 14     | integrity    | 4    | CRC32 of the chunk region                |
//! | 18..   | chunks       | var  | 4-byte tag, u64 payload length, payload  |
//!
//! Three chunks are written, in order: `META` (JSON metadata), `AUDI`
//! (FLAC-compressed audio), `AIMD` (JSON model references). Decoders walk
//! chunks sequentially until total_length is consumed and skip unrecognized
//! tags by their declared length.

mod codec;
mod reader;
mod writer;

pub use codec::{decode_flac, encode_flac};
pub use reader::EuphFile;
pub use writer::{write_euph, write_euph_file};

use thiserror::Error;

pub const EUPH_MAGIC: [u8; 4] = *b"EUPH";
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;

/// Fixed header size: magic + version + total_length + integrity
pub const HEADER_LEN: u64 = 18;

pub const CHUNK_META: [u8; 4] = *b"META";
pub const CHUNK_AUDI: [u8; 4] = *b"AUDI";
pub const CHUNK_AIMD: [u8; 4] = *b"AIMD";

/// Container read failures. Every variant rejects the file outright; the
/// decoder never guesses a layout.
#[derive(Debug, Error)]
pub enum EuphError {
    #[error("not a EUPH container (bad magic)")]
    UnknownMagic,

    #[error("unsupported container version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("declared length {declared} does not match actual length {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    #[error("integrity checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("container truncated inside chunk sequence at offset {0}")]
    Truncated(u64),

    #[error("missing required {0} chunk")]
    MissingChunk(&'static str),

    #[error("malformed {0} chunk: {1}")]
    MalformedChunk(&'static str, #[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
