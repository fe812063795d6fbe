const CHAR_OFFSET: u16 = 31;

/// The rsync weak checksum: two 16-bit running sums packed into a `u32`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct Crc(pub u32);

impl Crc {
    /// Size of a serialized checksum.
    pub const SIZE: usize = 4;

    /// Big-endian serialized form.
    #[inline]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_be_bytes()
    }

    /// Parse the big-endian serialized form.
    #[inline]
    pub fn from_bytes(b: [u8; Self::SIZE]) -> Self {
        Crc(u32::from_be_bytes(b))
    }

    #[inline]
    fn split(self) -> (u16, u16) {
        (self.0 as u16, (self.0 >> 16) as u16)
    }

    #[inline]
    fn combine(s1: u16, s2: u16) -> Crc {
        Crc(s1 as u32 | ((s2 as u32) << 16))
    }

    /// The checksum of no bytes.
    #[inline]
    pub fn new() -> Crc {
        Crc(0)
    }

    /// The checksum of `buf`, starting from zero.
    #[inline]
    pub fn calculate(buf: &[u8]) -> Crc {
        Crc::new().update(buf)
    }

    /// Remove `old_byte` from the front of a window of `size` bytes.
    pub fn rollout(self, size: u32, old_byte: u8) -> Crc {
        let size = size as u16;
        let old_byte = old_byte as u16;
        let (mut s1, mut s2) = self.split();
        s1 = s1.wrapping_sub(old_byte.wrapping_add(CHAR_OFFSET));
        s2 = s2.wrapping_sub(size.wrapping_mul(old_byte + CHAR_OFFSET));
        Crc::combine(s1, s2)
    }

    /// Slide a window of `size` bytes right by one: `old_byte` leaves, `new_byte` enters.
    #[inline]
    pub fn rotate(self, size: u32, old_byte: u8, new_byte: u8) -> Crc {
        let size = size as u16;
        let old_byte = old_byte as u16;
        let new_byte = new_byte as u16;
        let (mut s1, mut s2) = self.split();
        s1 = s1.wrapping_add(new_byte).wrapping_sub(old_byte);
        s2 = s2
            .wrapping_add(s1)
            .wrapping_sub(size.wrapping_mul(old_byte.wrapping_add(CHAR_OFFSET)));
        Crc::combine(s1, s2)
    }

    /// Append `new_byte` to the window.
    pub fn rollin(self, new_byte: u8) -> Crc {
        let (mut s1, mut s2) = self.split();
        s1 = s1.wrapping_add(new_byte as u16);
        s2 = s2.wrapping_add(s1);
        s1 = s1.wrapping_add(CHAR_OFFSET);
        s2 = s2.wrapping_add(CHAR_OFFSET);
        Crc::combine(s1, s2)
    }

    /// Fold `buf` into the checksum, four bytes at a time.
    pub fn update(self, buf: &[u8]) -> Crc {
        let (mut s1, mut s2) = self.split();
        let mut chunks = buf.chunks_exact(4);
        for group in &mut chunks {
            let (b0, b1, b2, b3) = (
                group[0] as u16,
                group[1] as u16,
                group[2] as u16,
                group[3] as u16,
            );
            s2 = s2
                .wrapping_add(s1.wrapping_add(b0).wrapping_mul(4))
                .wrapping_add(b1.wrapping_mul(3))
                .wrapping_add(b2.wrapping_mul(2))
                .wrapping_add(b3)
                .wrapping_add(10 * CHAR_OFFSET);
            s1 = s1
                .wrapping_add(b0)
                .wrapping_add(b1)
                .wrapping_add(b2)
                .wrapping_add(b3)
                .wrapping_add(4 * CHAR_OFFSET);
        }
        for &byte in chunks.remainder() {
            s1 = s1.wrapping_add(byte as u16).wrapping_add(CHAR_OFFSET);
            s2 = s2.wrapping_add(s1);
        }
        Crc::combine(s1, s2)
    }

    /// Like `Crc::update`, but one byte at a time.
    pub fn basic_update(self, buf: &[u8]) -> Crc {
        let (mut s1, mut s2) = self.split();
        for &byte in buf {
            s1 = s1.wrapping_add(byte as u16);
            s2 = s2.wrapping_add(s1);
        }
        let len = buf.len() as u32;
        s1 = s1.wrapping_add((len as u16).wrapping_mul(CHAR_OFFSET));
        s2 = s2.wrapping_add(
            ((len.wrapping_mul(len.wrapping_add(1)) / 2) as u16).wrapping_mul(CHAR_OFFSET),
        );
        Crc::combine(s1, s2)
    }
}

#[cfg(test)]
mod tests {
    use super::Crc;
    use quickcheck_macros::quickcheck;

    #[test]
    fn known_values() {
        assert_eq!(Crc::calculate(b""), Crc(0));
        // s1 = 'a' + 31 = 128, s2 = 128
        assert_eq!(Crc::calculate(b"a"), Crc(128 | (128 << 16)));
        // the 4-byte group path and the byte path must agree on an exact group
        assert_eq!(Crc::calculate(b"abcd"), Crc::new().basic_update(b"abcd"));
    }

    #[test]
    fn wraps_instead_of_saturating() {
        let data = vec![0xff; 1 << 16];
        assert_eq!(Crc::calculate(&data), Crc::new().basic_update(&data));
    }

    #[quickcheck]
    fn rollin_one(initial: u32, buf: Vec<u8>) -> bool {
        let sum1 = Crc(initial).basic_update(&buf);
        let sum2 = buf.iter().copied().fold(Crc(initial), Crc::rollin);
        sum1 == sum2
    }

    #[quickcheck]
    fn grouped_update(initial: u32, buf: Vec<u8>) -> bool {
        let sum1 = Crc(initial).update(&buf);
        let sum2 = Crc(initial).basic_update(&buf);
        sum1 == sum2
    }

    #[quickcheck]
    fn update_twice(initial: u32, mut buf1: Vec<u8>, buf2: Vec<u8>) -> bool {
        let sum1 = Crc(initial).update(&buf1).update(&buf2);
        buf1.extend(&buf2);
        let sum2 = Crc(initial).update(&buf1);
        sum1 == sum2
    }

    #[quickcheck]
    fn rotate_one(mut buf: Vec<u8>, byte: u8) -> bool {
        if buf.is_empty() {
            return true;
        }
        let sum1 = Crc::calculate(&buf).rotate(buf.len() as u32, buf[0], byte);
        buf.push(byte);
        let sum2 = Crc::calculate(&buf[1..]);
        sum1 == sum2
    }

    #[quickcheck]
    fn rollout_one(buf: Vec<u8>) -> bool {
        if buf.is_empty() {
            return true;
        }
        let sum1 = Crc::calculate(&buf).rollout(buf.len() as u32, buf[0]);
        let sum2 = Crc::calculate(&buf[1..]);
        sum1 == sum2
    }
}
