use std::io::Read;

use arrayref::array_ref;

use crate::consts::{MAX_BLOCK_SIZE, MAX_STRONG_SIZE, MD4_MAGIC};
use crate::crc::Crc;
use crate::error::{Error, Result};
use crate::hasher::{Md4, StrongHasher};
use crate::signature::HEADER_SIZE;
use crate::wire::{read_exact, read_full};

const WORD_SIZE: usize = 8;
const BUCKETS: usize = 1 << 16;

/// A parsed signature with a block index, suitable for calculating deltas.
///
/// Lookups go through three layers: a bitmap over the top 16 bits of the weak
/// checksum, a table of `(weak, block)` pairs sorted by weak checksum, and the
/// strong hashes packed into `u64` words.
#[derive(Clone, Debug)]
pub struct IndexedSignature<H = Md4> {
    hasher: H,
    block_size: u32,
    crypto_hash_size: u32,
    /// Whether any block has a weak checksum with these top 16 bits.
    buckets: Vec<bool>,
    /// `(weak, block index)`, sorted by weak checksum.
    weak: Vec<(Crc, u32)>,
    /// `words_per_hash` zero-padded words per block, in block order.
    strong: Vec<u64>,
    words_per_hash: usize,
}

const MAX_WORDS: usize = MAX_STRONG_SIZE / WORD_SIZE;

/// Pack `hash` into zero-padded little-endian words, returning them and how many are used.
fn pack_words(hash: &[u8]) -> ([u64; MAX_WORDS], usize) {
    let mut words = [0; MAX_WORDS];
    let mut n = 0;
    for chunk in hash.chunks(WORD_SIZE) {
        let mut b = [0; WORD_SIZE];
        b[..chunk.len()].copy_from_slice(chunk);
        words[n] = u64::from_le_bytes(b);
        n += 1;
    }
    (words, n)
}

impl IndexedSignature<Md4> {
    /// Read and index an MD4 signature.
    pub fn read<R: Read>(input: R) -> Result<Self> {
        Self::read_with_hasher(input, Md4)
    }

    /// Read and index a serialized signature held in memory.
    pub fn from_bytes(signature: &[u8]) -> Result<Self> {
        Self::read(signature)
    }
}

impl<H: StrongHasher> IndexedSignature<H> {
    /// Read and index a signature whose strong hashes were produced by `hasher`.
    pub fn read_with_hasher<R: Read>(mut input: R, hasher: H) -> Result<Self> {
        let mut header = [0; HEADER_SIZE];
        read_exact(&mut input, &mut header[..4], "signature magic")?;
        let magic = u32::from_be_bytes(*array_ref![header, 0, 4]);
        if magic != MD4_MAGIC {
            return Err(Error::WrongMagic {
                what: "signature",
                magic,
            });
        }
        read_exact(&mut input, &mut header[4..8], "block length")?;
        let block_size = u32::from_be_bytes(*array_ref![header, 4, 4]);
        if block_size < 1 || block_size > MAX_BLOCK_SIZE {
            return Err(Error::InvalidBlockLength(block_size));
        }
        read_exact(&mut input, &mut header[8..12], "strong hash length")?;
        let crypto_hash_size = u32::from_be_bytes(*array_ref![header, 8, 4]);
        let max = hasher.digest_size().min(MAX_STRONG_SIZE);
        if crypto_hash_size < 1 || crypto_hash_size as usize > max {
            return Err(Error::InvalidStrongLength {
                length: crypto_hash_size,
                max,
            });
        }

        let words_per_hash = (crypto_hash_size as usize + WORD_SIZE - 1) / WORD_SIZE;
        let mut weak = Vec::new();
        let mut strong = Vec::new();
        let mut crc = [0; Crc::SIZE];
        let mut hash = vec![0; crypto_hash_size as usize];
        loop {
            let n = read_full(&mut input, &mut crc)?;
            if n == 0 {
                break;
            }
            if n != Crc::SIZE {
                return Err(Error::UnexpectedEof {
                    reading: "weak checksum",
                    expected: Crc::SIZE as u64,
                    available: n as u64,
                });
            }
            read_exact(&mut input, &mut hash, "strong hash")?;
            let idx = weak.len() as u32;
            weak.push((Crc::from_bytes(crc), idx));
            let (words, n) = pack_words(&hash);
            strong.extend_from_slice(&words[..n]);
        }

        // stable, so equal weak checksums stay in block order
        weak.sort_by_key(|&(crc, _)| crc);
        let mut buckets = vec![false; BUCKETS];
        for &(crc, _) in &weak {
            buckets[(crc.0 >> 16) as usize] = true;
        }

        tracing::debug!(
            block_size,
            crypto_hash_size,
            blocks = weak.len(),
            "indexed signature"
        );

        Ok(IndexedSignature {
            hasher,
            block_size,
            crypto_hash_size,
            buckets,
            weak,
            strong,
            words_per_hash,
        })
    }

    /// The length of each block in the base data.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// The number of strong hash bytes kept per block.
    pub fn crypto_hash_size(&self) -> u32 {
        self.crypto_hash_size
    }

    /// The number of blocks in the signature.
    pub fn len(&self) -> usize {
        self.weak.len()
    }

    /// Whether the signature describes empty base data.
    pub fn is_empty(&self) -> bool {
        self.weak.is_empty()
    }

    /// `false` if no block can possibly have this weak checksum.
    #[inline]
    pub fn may_contain(&self, crc: Crc) -> bool {
        self.buckets[(crc.0 >> 16) as usize]
    }

    fn strong_of(&self, block: u32) -> &[u64] {
        let start = block as usize * self.words_per_hash;
        &self.strong[start..start + self.words_per_hash]
    }

    /// Find a block whose content equals `data`, given `crc`, the weak checksum of `data`.
    ///
    /// `preferred` is tried first, so that runs of consecutive blocks stay
    /// consecutive. Otherwise the first block in the weak table with equal weak
    /// checksum and equal strong hash is returned.
    pub fn lookup(&self, crc: Crc, data: &[u8], preferred: Option<u32>) -> Option<u32> {
        if !self.may_contain(crc) {
            return None;
        }
        let hit = self.weak.binary_search_by_key(&crc, |&(c, _)| c).ok()?;

        let mut digest = [0; MAX_STRONG_SIZE];
        let digest = &mut digest[..self.crypto_hash_size as usize];
        self.hasher.digest_into(data, digest);
        let (words, n) = pack_words(digest);
        let wanted = &words[..n];

        if let Some(block) = preferred {
            if (block as usize) < self.weak.len() && self.strong_of(block) == wanted {
                return Some(block);
            }
        }
        // the binary search may land anywhere inside a run of equal weak checksums
        let mut first = hit;
        while first > 0 && self.weak[first - 1].0 == crc {
            first -= 1;
        }
        self.weak[first..]
            .iter()
            .take_while(|&&(c, _)| c == crc)
            .map(|&(_, block)| block)
            .find(|&block| self.strong_of(block) == wanted)
    }
}
