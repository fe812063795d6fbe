use crate::md4::{md4, MD4_SIZE};

/// The strong hash used to confirm that a weak checksum match is a real match.
///
/// A hasher is a plain value handed to the signature reader and writer, so each
/// operation owns the hasher it uses.
pub trait StrongHasher {
    /// The length in bytes of a full digest. Signatures may keep fewer bytes.
    fn digest_size(&self) -> usize;

    /// Hash `data` and write the first `out.len()` bytes of the digest to `out`.
    ///
    /// `out.len()` is never larger than [StrongHasher::digest_size].
    fn digest_into(&self, data: &[u8], out: &mut [u8]);
}

/// MD4, the hash used by rdiff signatures with magic `rs\x01\x36`.
///
/// MD4 is cryptographically broken; it is only used here because the signature
/// format requires it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Md4;

impl StrongHasher for Md4 {
    #[inline]
    fn digest_size(&self) -> usize {
        MD4_SIZE
    }

    #[inline]
    fn digest_into(&self, data: &[u8], out: &mut [u8]) {
        let digest = md4(data);
        out.copy_from_slice(&digest[..out.len()]);
    }
}

impl<H: StrongHasher + ?Sized> StrongHasher for &H {
    fn digest_size(&self) -> usize {
        (**self).digest_size()
    }

    fn digest_into(&self, data: &[u8], out: &mut [u8]) {
        (**self).digest_into(data, out)
    }
}
