use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::signature::{SignatureOptions, SignatureWriter};

/// A reader that computes the signature of the data passing through it.
///
/// This lets a caller produce the signature of a file while the same bytes are
/// consumed elsewhere (uploaded, compressed, ...), without a second pass.
///
/// # Ownership
/// The reader takes ownership of `source`. [SignatureGeneratingReader::finish]
/// reads whatever is left of `source`, writes the final block record, drops
/// `source` and hands the signature output back. Dropping the reader without
/// calling `finish` leaves the signature incomplete.
pub struct SignatureGeneratingReader<R, W: Write> {
    source: R,
    writer: SignatureWriter<W>,
    pending: Vec<u8>,
    block_size: usize,
    total: u64,
}

impl<R: Read, W: Write> SignatureGeneratingReader<R, W> {
    /// Wrap `source`, writing the signature header to `signature` right away.
    pub fn new(source: R, signature: W, options: SignatureOptions) -> Result<Self> {
        let writer = SignatureWriter::new(signature, options)?;
        Ok(SignatureGeneratingReader {
            source,
            writer,
            pending: Vec::new(),
            block_size: options.block_size as usize,
            total: 0,
        })
    }

    /// The number of bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.total
    }

    fn absorb(&mut self, mut data: &[u8]) -> Result<()> {
        self.total += data.len() as u64;
        while !data.is_empty() {
            if self.pending.is_empty() && data.len() >= self.block_size {
                let (block, rest) = data.split_at(self.block_size);
                self.writer.write_block(block)?;
                data = rest;
                continue;
            }
            let take = (self.block_size - self.pending.len()).min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.pending.len() == self.block_size {
                self.writer.write_block(&self.pending)?;
                self.pending.clear();
            }
        }
        Ok(())
    }

    /// Hash the rest of the source, write the last block, release the source and
    /// return the signature output.
    pub fn finish(mut self) -> Result<W> {
        let mut rest = [0; 8 * 1024];
        loop {
            let n = match self.source.read(&mut rest) {
                Ok(0) => break,
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.absorb(&rest[..n])?;
        }
        if !self.pending.is_empty() {
            self.writer.write_block(&self.pending)?;
        }
        drop(self.source);
        tracing::trace!(bytes = self.total, "signature generated while reading");
        self.writer.finish()
    }
}

impl<R: Read, W: Write> Read for SignatureGeneratingReader<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.source.read(buf)?;
        self.absorb(&buf[..n]).map_err(|e| match e {
            Error::Io(e) => e,
            e => io::Error::new(io::ErrorKind::Other, e),
        })?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::calculate_signature;

    fn options() -> SignatureOptions {
        SignatureOptions {
            block_size: 100,
            crypto_hash_size: 8,
        }
    }

    #[test]
    fn signature_of_consumed_data() {
        let data: Vec<u8> = (0..1234u32).map(|i| (i * 31 % 256) as u8).collect();
        let mut reader = SignatureGeneratingReader::new(&data[..], Vec::new(), options()).unwrap();
        let mut copy = Vec::new();
        // odd read sizes, so reads straddle block boundaries
        let mut buf = [0; 37];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            copy.extend_from_slice(&buf[..n]);
        }
        assert_eq!(copy, data);
        assert_eq!(reader.bytes_read(), data.len() as u64);
        let sig = reader.finish().unwrap();
        assert_eq!(sig, calculate_signature(&data, options()).unwrap());
    }

    #[test]
    fn finish_hashes_unread_data() {
        let data = vec![9u8; 450];
        let mut reader = SignatureGeneratingReader::new(&data[..], Vec::new(), options()).unwrap();
        let mut head = [0; 150];
        reader.read_exact(&mut head).unwrap();
        let sig = reader.finish().unwrap();
        assert_eq!(sig, calculate_signature(&data, options()).unwrap());
    }

    /// Reads from `data` and records when it is dropped.
    struct Tracked<'a> {
        data: &'a [u8],
        dropped: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl Read for Tracked<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }
    }

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    #[test]
    fn finish_releases_the_source() {
        let data = vec![3u8; 250];
        let dropped = std::rc::Rc::new(std::cell::Cell::new(false));
        let source = Tracked {
            data: &data,
            dropped: dropped.clone(),
        };
        let mut reader = SignatureGeneratingReader::new(source, Vec::new(), options()).unwrap();
        let mut head = [0; 10];
        reader.read_exact(&mut head).unwrap();
        assert!(!dropped.get());
        let sig = reader.finish().unwrap();
        assert!(dropped.get());
        assert_eq!(sig, calculate_signature(&data, options()).unwrap());
    }
}
