use std::io;

use thiserror::Error;

/// Errors produced while reading or writing signatures and deltas.
///
/// Every error is fatal for the operation that produced it: any output written
/// before the error must be treated as invalid.
#[derive(Debug, Error)]
pub enum Error {
    /// The stream started with the wrong magic, perhaps because it is not really an rdiff file.
    #[error("incorrect {what} magic: 0x{magic:08x}")]
    WrongMagic {
        /// Which kind of stream was being read.
        what: &'static str,
        /// The magic number encountered.
        magic: u32,
    },
    /// The signature declared a block length outside `1..=i32::MAX / 2`.
    #[error("invalid block length {0}")]
    InvalidBlockLength(u32),
    /// The signature declared a strong hash length the hasher cannot produce.
    #[error("invalid strong hash length {length} (max={max})")]
    InvalidStrongLength {
        /// The declared length.
        length: u32,
        /// The digest size of the hasher in use.
        max: usize,
    },
    /// The input ended unexpectedly, perhaps because it was truncated.
    #[error("unexpected end of input when reading {reading} (expected={expected}, available={available})")]
    UnexpectedEof {
        /// The item being read.
        reading: &'static str,
        /// The expected length of that item.
        expected: u64,
        /// How much of it was actually available.
        available: u64,
    },
    /// The delta contained an unrecognized command.
    #[error("unexpected command byte: 0x{command:02x}")]
    UnknownCommand {
        /// The command byte encountered.
        command: u8,
    },
    /// An integer field was not 1, 2, 4 or 8 bytes wide.
    #[error("invalid integer field width {0}")]
    InvalidFieldWidth(usize),
    /// A value does not fit in the signed 64-bit range of the wire format.
    #[error("value {0} exceeds {}", i64::max_value())]
    ValueTooLarge(u64),
    /// Delta generation ended up with a copy and a literal pending at once.
    #[error("internal error: {0}")]
    InternalConsistency(&'static str),
    /// The patched output would have exceeded the limit given to [patch_limited()](crate::patch_limited).
    #[error("exceeded output size limit when writing {what} (wanted={wanted}, available={available})")]
    OutputLimit {
        /// The item being written.
        what: &'static str,
        /// The length of that item.
        wanted: u64,
        /// The remaining output limit.
        available: u64,
    },
    /// The delta referenced bytes past the end of the base data.
    #[error("requested copy is out of bounds (offset={offset}, len={len}, copied={copied})")]
    CopyOutOfBounds {
        /// The copy offset.
        offset: u64,
        /// The copy length.
        len: u64,
        /// How many bytes the base could supply.
        copied: u64,
    },
    /// The base file and the output file are the same file.
    #[error("base and output refer to the same file: {0}")]
    SameFile(std::path::PathBuf),
    /// Delta generation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,
    /// There was an IO error while reading the input or writing the output.
    #[error("io error (source={0})")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
