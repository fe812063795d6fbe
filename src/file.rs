//! Path-based entry points. Outputs are created or truncated.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::diff::{diff, DiffStats};
use crate::error::{Error, Result};
use crate::index::IndexedSignature;
use crate::patch::patch;
use crate::signature::{generate_signature, SignatureOptions};

/// Write the signature of the file at `input` to `output`.
pub fn generate_signature_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: SignatureOptions,
) -> Result<()> {
    let (input, output) = (input.as_ref(), output.as_ref());
    tracing::debug!(input = %input.display(), output = %output.display(), "generating signature");
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    generate_signature(&mut reader, &mut writer, options)
}

/// Write a delta from the base described by the signature file at `signature`
/// to the file at `input`.
pub fn generate_delta_file(
    signature: impl AsRef<Path>,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<DiffStats> {
    let (signature, input, output) = (signature.as_ref(), input.as_ref(), output.as_ref());
    tracing::debug!(
        signature = %signature.display(),
        input = %input.display(),
        output = %output.display(),
        "generating delta"
    );
    let index = IndexedSignature::read(BufReader::new(File::open(signature)?))?;
    let mut reader = File::open(input)?;
    let mut writer = BufWriter::new(File::create(output)?);
    diff(&index, &mut reader, &mut writer)
}

/// Whether `a` and `b` name the same existing file, through symlinks or hard links.
fn is_same_file(a: &Path, b: &Path) -> bool {
    if let (Ok(a), Ok(b)) = (fs::canonicalize(a), fs::canonicalize(b)) {
        if a == b {
            return true;
        }
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let (Ok(a), Ok(b)) = (fs::metadata(a), fs::metadata(b)) {
            return a.dev() == b.dev() && a.ino() == b.ino();
        }
    }
    false
}

/// Reconstruct a file from the base file at `base` and the delta file at `delta`.
///
/// `base` and `output` must be different files, since the base is read while
/// the output is written.
pub fn patch_file(
    base: impl AsRef<Path>,
    delta: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<()> {
    let (base, delta, output) = (base.as_ref(), delta.as_ref(), output.as_ref());
    if is_same_file(base, output) {
        return Err(Error::SameFile(output.to_path_buf()));
    }
    tracing::debug!(
        base = %base.display(),
        delta = %delta.display(),
        output = %output.display(),
        "patching"
    );
    let mut base = BufReader::new(File::open(base)?);
    let mut delta = File::open(delta)?;
    let mut writer = BufWriter::new(File::create(output)?);
    patch(&mut base, &mut delta, &mut writer)
}
