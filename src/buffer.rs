use std::io::{self, Read};

/// A window over a sequential reader that can be addressed like a slice.
///
/// Bytes are appended at the back by [RollingBuffer::fill] and released from the
/// front by [RollingBuffer::consume]. Released space is reclaimed lazily, once
/// it makes up at least half of the allocation, so both operations are
/// amortized O(1) and the live bytes are always one contiguous slice.
pub struct RollingBuffer<R> {
    source: R,
    buf: Vec<u8>,
    start: usize,
    exhausted: bool,
}

impl<R: Read> RollingBuffer<R> {
    /// A buffer that reads from `source`, which it borrows or owns as `R` dictates.
    pub fn new(source: R) -> Self {
        RollingBuffer {
            source,
            buf: Vec::new(),
            start: 0,
            exhausted: false,
        }
    }

    /// The number of buffered bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Whether no bytes are buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the source has reported end of input.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The buffered bytes, oldest first.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    /// Read from the source until at least `target` bytes are buffered or the
    /// source is exhausted. Returns the number of bytes buffered.
    pub fn fill(&mut self, target: usize) -> io::Result<usize> {
        if self.start > 0 && self.start >= self.buf.len() / 2 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        let have = self.len();
        if have >= target || self.exhausted {
            return Ok(have);
        }
        // grow with the bytes that actually arrive, not with `target`
        let wanted = target - have;
        let n = (&mut self.source)
            .take(wanted as u64)
            .read_to_end(&mut self.buf)?;
        if n < wanted {
            self.exhausted = true;
        }
        Ok(self.len())
    }

    /// Release the `n` oldest bytes.
    ///
    /// # Panics
    /// Panics if fewer than `n` bytes are buffered.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len(), "consumed past the end of the buffer");
        self.start += n;
    }

    /// Give back the source. Buffered bytes are discarded.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R> std::ops::Index<usize> for RollingBuffer<R> {
    type Output = u8;

    #[inline]
    fn index(&self, idx: usize) -> &u8 {
        &self.buf[self.start + idx]
    }
}

#[cfg(test)]
mod tests {
    use super::RollingBuffer;
    use std::io::{self, Read};

    /// A reader that returns at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn fill_and_consume() {
        let data: Vec<u8> = (0..100).collect();
        let mut buf = RollingBuffer::new(Trickle {
            data: &data,
            step: 7,
        });
        assert_eq!(buf.fill(10).unwrap(), 10);
        assert_eq!(buf.data(), &data[..10]);
        buf.consume(4);
        assert_eq!(buf[0], 4);
        assert_eq!(buf.fill(30).unwrap(), 30);
        assert_eq!(buf.data(), &data[4..34]);
        assert!(!buf.is_exhausted());

        buf.consume(30);
        assert!(buf.is_empty());
        assert_eq!(buf.fill(1000).unwrap(), 66);
        assert!(buf.is_exhausted());
        assert_eq!(buf.data(), &data[34..]);
        // an exhausted source is not read again
        assert_eq!(buf.fill(1000).unwrap(), 66);
    }

    #[test]
    fn large_target_follows_the_input() {
        let mut buf = RollingBuffer::new(&b"abc"[..]);
        assert_eq!(buf.fill(4_000_000_000).unwrap(), 3);
        assert!(buf.is_exhausted());
        assert_eq!(buf.data(), b"abc");
        assert!(buf.buf.capacity() < 1 << 20);
    }

    #[test]
    #[should_panic]
    fn consume_too_much() {
        let mut buf = RollingBuffer::new(&b"abc"[..]);
        buf.fill(3).unwrap();
        buf.consume(4);
    }
}
