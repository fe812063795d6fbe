use std::io::{Read, Write};

use crate::consts::{
    DEFAULT_BLOCK_SIZE, DEFAULT_CRYPTO_HASH_SIZE, MAX_BLOCK_SIZE, MAX_STRONG_SIZE, MD4_MAGIC,
};
use crate::crc::Crc;
use crate::error::{Error, Result};
use crate::hasher::{Md4, StrongHasher};

/// Size of the signature header: magic, block_size, then crypto_hash_size.
pub(crate) const HEADER_SIZE: usize = 3 * 4;

/// Options for signature generation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SignatureOptions {
    /// The granularity of the signature.
    /// Smaller block sizes yield larger, but more precise, signatures.
    pub block_size: u32,
    /// The number of bytes to use from the MD4 hash. Must be between 1 and 16.
    /// The larger this is, the less likely that a delta will be mis-applied.
    pub crypto_hash_size: u32,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        SignatureOptions {
            block_size: DEFAULT_BLOCK_SIZE,
            crypto_hash_size: DEFAULT_CRYPTO_HASH_SIZE,
        }
    }
}

impl SignatureOptions {
    /// Check the options against the limits of the signature format and of `hasher`.
    pub fn validate(&self, hasher: &impl StrongHasher) -> Result<()> {
        if self.block_size < 1 || self.block_size > MAX_BLOCK_SIZE {
            return Err(Error::InvalidBlockLength(self.block_size));
        }
        let max = hasher.digest_size().min(MAX_STRONG_SIZE);
        if self.crypto_hash_size < 1 || self.crypto_hash_size as usize > max {
            return Err(Error::InvalidStrongLength {
                length: self.crypto_hash_size,
                max,
            });
        }
        Ok(())
    }
}

/// Streams a signature to `W`, one block at a time.
///
/// Each block handed to [SignatureWriter::write_block] is hashed and its
/// `(weak, strong)` record is written immediately.
pub struct SignatureWriter<W, H = Md4> {
    out: W,
    hasher: H,
    options: SignatureOptions,
    strong: Vec<u8>,
    blocks: u64,
}

impl<W: Write> SignatureWriter<W, Md4> {
    /// Validate `options` and write the signature header.
    pub fn new(out: W, options: SignatureOptions) -> Result<Self> {
        Self::with_hasher(out, options, Md4)
    }
}

impl<W: Write, H: StrongHasher> SignatureWriter<W, H> {
    /// Like [SignatureWriter::new], with an explicit strong hasher.
    pub fn with_hasher(mut out: W, options: SignatureOptions, hasher: H) -> Result<Self> {
        options.validate(&hasher)?;
        let mut header = [0; HEADER_SIZE];
        header[..4].copy_from_slice(&MD4_MAGIC.to_be_bytes());
        header[4..8].copy_from_slice(&options.block_size.to_be_bytes());
        header[8..].copy_from_slice(&options.crypto_hash_size.to_be_bytes());
        out.write_all(&header)?;
        Ok(SignatureWriter {
            out,
            hasher,
            options,
            strong: vec![0; options.crypto_hash_size as usize],
            blocks: 0,
        })
    }

    /// The options this signature is written with.
    pub fn options(&self) -> SignatureOptions {
        self.options
    }

    /// The number of blocks written so far.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Append the record for one block. Only the last block may be shorter than `block_size`.
    pub fn write_block(&mut self, block: &[u8]) -> Result<()> {
        debug_assert!(!block.is_empty() && block.len() <= self.options.block_size as usize);
        self.hasher.digest_into(block, &mut self.strong);
        self.out.write_all(&Crc::calculate(block).to_bytes())?;
        self.out.write_all(&self.strong)?;
        self.blocks += 1;
        Ok(())
    }

    /// Flush the output and give it back.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        tracing::debug!(
            blocks = self.blocks,
            block_size = self.options.block_size,
            crypto_hash_size = self.options.crypto_hash_size,
            "wrote signature"
        );
        Ok(self.out)
    }
}

/// Compute the signature of everything readable from `input` and write it to `output`.
///
/// Neither stream is closed; only one block of `input` is held in memory at a time.
pub fn generate_signature<R, W>(input: &mut R, output: &mut W, options: SignatureOptions) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut writer = SignatureWriter::new(output, options)?;
    let block_size = options.block_size as usize;
    let mut block = Vec::new();
    loop {
        block.clear();
        let n = (&mut *input).take(block_size as u64).read_to_end(&mut block)?;
        if n == 0 {
            break;
        }
        writer.write_block(&block)?;
        if n < block_size {
            break;
        }
    }
    writer.finish()?;
    Ok(())
}

/// Compute the signature of an in-memory buffer.
pub fn calculate_signature(buf: &[u8], options: SignatureOptions) -> Result<Vec<u8>> {
    let num_blocks = buf.chunks(options.block_size.max(1) as usize).len();
    let mut signature = Vec::with_capacity(
        HEADER_SIZE + num_blocks * (Crc::SIZE + options.crypto_hash_size as usize),
    );
    let mut writer = SignatureWriter::new(&mut signature, options)?;
    for block in buf.chunks(options.block_size as usize) {
        writer.write_block(block)?;
    }
    writer.finish()?;
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::md4::md4;

    #[test]
    fn header_and_records() {
        let options = SignatureOptions {
            block_size: 4,
            crypto_hash_size: 8,
        };
        let sig = calculate_signature(b"ABCDEFGH", options).unwrap();
        assert_eq!(&sig[..4], b"rs\x01\x36");
        assert_eq!(&sig[4..8], &[0, 0, 0, 4]);
        assert_eq!(&sig[8..12], &[0, 0, 0, 8]);
        assert_eq!(sig.len(), HEADER_SIZE + 2 * 12);
        assert_eq!(&sig[12..16], &Crc::calculate(b"ABCD").to_bytes());
        assert_eq!(&sig[16..24], &md4(b"ABCD")[..8]);
        assert_eq!(&sig[24..28], &Crc::calculate(b"EFGH").to_bytes());
        assert_eq!(&sig[28..36], &md4(b"EFGH")[..8]);
    }

    #[test]
    fn short_last_block() {
        let options = SignatureOptions {
            block_size: 4,
            crypto_hash_size: 2,
        };
        let sig = calculate_signature(b"ABCDEF", options).unwrap();
        assert_eq!(sig.len(), HEADER_SIZE + 2 * 6);
        assert_eq!(&sig[18..22], &Crc::calculate(b"EF").to_bytes());
        assert_eq!(&sig[22..24], &md4(b"EF")[..2]);
    }

    #[test]
    fn streaming_matches_in_memory() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 251) as u8).collect();
        let options = SignatureOptions {
            block_size: 333,
            crypto_hash_size: 16,
        };
        let mut streamed = Vec::new();
        generate_signature(&mut &data[..], &mut streamed, options).unwrap();
        assert_eq!(streamed, calculate_signature(&data, options).unwrap());
    }

    #[test]
    fn huge_block_length_with_short_input() {
        let options = SignatureOptions {
            block_size: 1_000_000_000,
            crypto_hash_size: 8,
        };
        let mut sig = Vec::new();
        generate_signature(&mut &b"abc"[..], &mut sig, options).unwrap();
        assert_eq!(sig, calculate_signature(b"abc", options).unwrap());
        assert_eq!(sig.len(), HEADER_SIZE + 12);

        sig.clear();
        generate_signature(&mut &b""[..], &mut sig, options).unwrap();
        assert_eq!(sig.len(), HEADER_SIZE);
    }

    #[test]
    fn empty_input_is_header_only() {
        let sig = calculate_signature(b"", SignatureOptions::default()).unwrap();
        assert_eq!(sig.len(), HEADER_SIZE);
        assert_eq!(&sig[4..8], &2048u32.to_be_bytes());
    }

    #[test]
    fn rejects_invalid_options() {
        let bad_block = SignatureOptions {
            block_size: 0,
            crypto_hash_size: 8,
        };
        assert!(matches!(
            calculate_signature(b"x", bad_block),
            Err(Error::InvalidBlockLength(0))
        ));
        let bad_strong = SignatureOptions {
            block_size: 16,
            crypto_hash_size: 17,
        };
        assert!(matches!(
            calculate_signature(b"x", bad_strong),
            Err(Error::InvalidStrongLength { length: 17, max: 16 })
        ));
        let no_strong = SignatureOptions {
            block_size: 16,
            crypto_hash_size: 0,
        };
        assert!(calculate_signature(b"x", no_strong).is_err());
    }
}
