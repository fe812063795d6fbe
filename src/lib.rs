//! A streaming implementation of the [rdiff](https://github.com/librsync/librsync)
//! signature, delta and patch formats in pure Rust.
//!
//! This crate offers three major operations:
//!
//! 1. [generate_signature()], which reads some base data and writes a
//!    "signature" of that data which is much smaller than the original data.
//! 2. [generate_delta()], which takes a signature for some base data A, and a
//!    stream of data B, and writes a delta between A and B. If A and B are
//!    "similar", then the delta is usually much smaller than B.
//! 3. [patch()], which takes the base data A (seekable) and a delta (as
//!    constructed by [generate_delta()]), and writes B.
//!
//! All three work on streams and hold at most a bounded window of their
//! inputs in memory, apart from the signature index used while computing a
//! delta. Path-based variants live alongside them ([generate_signature_file()],
//! [generate_delta_file()], [patch_file()]).
//!
//! Signatures use MD4 as the strong hash, as the format requires. MD4 offers no
//! protection against deliberately crafted collisions.

#![allow(clippy::unreadable_literal)]
#![deny(missing_docs)]

mod buffer;
mod consts;
mod crc;
mod diff;
mod error;
mod file;
mod generating_reader;
mod hasher;
mod index;
mod md4;
mod patch;
mod signature;
pub mod wire;


use std::io::{Read, Write};

pub use buffer::RollingBuffer;
pub use consts::{DEFAULT_BLOCK_SIZE, DEFAULT_CRYPTO_HASH_SIZE};
pub use crc::Crc;
pub use diff::{diff, diff_with_cancel, DiffStats};
pub use error::{Error, Result};
pub use file::{generate_delta_file, generate_signature_file, patch_file};
pub use generating_reader::SignatureGeneratingReader;
pub use hasher::{Md4, StrongHasher};
pub use index::IndexedSignature;
pub use patch::{patch, patch_limited};
pub use signature::{calculate_signature, generate_signature, SignatureOptions, SignatureWriter};

/// Read a serialized signature from `signature` and write the delta from its
/// base data to the data read from `input`.
///
/// None of the streams are closed.
pub fn generate_delta<S, R, W>(signature: &mut S, input: &mut R, output: &mut W) -> Result<DiffStats>
where
    S: Read + ?Sized,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let index = IndexedSignature::read(signature)?;
    diff(&index, input, output)
}
