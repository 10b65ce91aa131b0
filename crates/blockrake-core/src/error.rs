//! Error types for blockrake-core.

use std::path::PathBuf;

// ==============================================================================
// Decode Errors
// ==============================================================================

/// Errors raised while deserializing a single block's bytes.
///
/// Each variant captures a specific failure mode rather than collapsing
/// everything into a single `String`, so callers can distinguish a clean
/// end-of-file (a truncated read) from genuinely malformed data.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("header version {0:#x} is not one of 1, 0x20000000, 0x20000001")]
    BadVersion(u32),

    #[error("segwit marker present but flag byte is {0:#04x}, not 0x01")]
    BadSegwitFlag(u8),

    #[error("compact size {value} exceeds the sanity limit {limit}")]
    OversizedCompactSize { value: u64, limit: u64 },

    #[error("block size field says {expected} bytes but {actual} were consumed")]
    SizeMismatch { expected: u32, actual: u64 },
}

impl DecodeError {
    /// A short read anywhere in a block is indistinguishable from the file
    /// simply ending; block files treat it as a clean terminator.
    pub(crate) fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

// ==============================================================================
// Core Errors
// ==============================================================================

/// Top-level error type for the blockrake-core crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("block index: {0}")]
    Index(#[from] rusty_leveldb::Status),

    #[error("corrupt index record for key {key}: {message}")]
    IndexRecord { key: String, message: String },

    #[error("bad framing in {file} at offset {offset}: expected magic fae4aaf1, got {found}")]
    Framing {
        file: PathBuf,
        offset: u64,
        found: String,
    },

    #[error("decoding {file} at offset {offset} (height {height}): {source}")]
    Decode {
        file: PathBuf,
        offset: u64,
        height: u64,
        #[source]
        source: DecodeError,
    },

    #[error("block file {0} is closed")]
    BlockFileClosed(PathBuf),

    #[error("balance snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
