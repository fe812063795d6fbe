use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

use crate::consts::DELTA_MAGIC;
use crate::error::{Error, Result};
use crate::wire::{read_exact, read_length, Opcode};

/// Copy exactly `len` bytes from `input` to `out`, returning how many were available.
fn copy_n<R, W>(input: &mut R, out: &mut W, len: u64) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    io::copy(&mut input.take(len), out)
}

/// Apply `delta` to the base data `base`, writing the result to `out`.
/// Errors if more than `limit` bytes would be written to `out`.
///
/// `base` must be seekable, since copy commands may refer to any offset.
/// `base` and `out` must not refer to the same underlying file.
pub fn patch_limited<B, D, W>(base: &mut B, delta: &mut D, out: &mut W, mut limit: u64) -> Result<()>
where
    B: Read + Seek + ?Sized,
    D: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut delta = BufReader::new(delta);
    macro_rules! reserve {
        ($len:expr, $what:expr) => {{
            let len = $len;
            if len > limit {
                return Err(Error::OutputLimit {
                    what: $what,
                    wanted: len,
                    available: limit,
                });
            }
            limit -= len;
        }};
    }

    let mut magic = [0; 4];
    read_exact(&mut delta, &mut magic, "magic")?;
    let magic = u32::from_be_bytes(magic);
    if magic != DELTA_MAGIC {
        return Err(Error::WrongMagic {
            what: "delta",
            magic,
        });
    }

    let (mut copies, mut literals) = (0u64, 0u64);
    loop {
        let mut cmd = [0; 1];
        read_exact(&mut delta, &mut cmd, "cmd")?;
        let len = match Opcode::parse(cmd[0])? {
            Opcode::End => break,
            Opcode::ShortLiteral(n) => Some(n as u64),
            Opcode::Literal { len_width } => {
                Some(read_length(&mut delta, len_width, "literal length")?)
            }
            Opcode::Copy {
                offset_width,
                len_width,
            } => {
                let offset = read_length(&mut delta, offset_width, "copy offset")?;
                let len = read_length(&mut delta, len_width, "copy length")?;
                reserve!(len, "copy");
                base.seek(SeekFrom::Start(offset))?;
                let copied = copy_n(base, out, len)?;
                if copied != len {
                    return Err(Error::CopyOutOfBounds {
                        offset,
                        len,
                        copied,
                    });
                }
                copies += 1;
                None
            }
        };
        if let Some(len) = len {
            reserve!(len, "literal");
            let copied = copy_n(&mut delta, out, len)?;
            if copied != len {
                return Err(Error::UnexpectedEof {
                    reading: "literal",
                    expected: len,
                    available: copied,
                });
            }
            literals += 1;
        }
    }
    out.flush()?;
    tracing::debug!(copies, literals, "applied delta");
    Ok(())
}

/// Apply `delta` to the base data `base`, writing the result to `out`.
///
/// # Security
/// This function should not be used with untrusted input, as a delta may create an arbitrarily
/// large output. Use [patch_limited()] instead to set an upper bound on the size of the output.
pub fn patch<B, D, W>(base: &mut B, delta: &mut D, out: &mut W) -> Result<()>
where
    B: Read + Seek + ?Sized,
    D: Read + ?Sized,
    W: Write + ?Sized,
{
    patch_limited(base, delta, out, u64::max_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn apply(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        patch(&mut Cursor::new(base), &mut &delta[..], &mut out)?;
        Ok(out)
    }

    #[test]
    fn copies_and_literals() {
        let delta = b"rs\x02\x36\x45\x00\x04\x41\x01X\x45\x04\x04\x00";
        assert_eq!(apply(b"ABCDEFGH", delta).unwrap(), b"ABCDXEFGH");
    }

    #[test]
    fn short_literal_form() {
        let delta = b"rs\x02\x36\x03abc\x45\x01\x02\x00";
        assert_eq!(apply(b"xyz", delta).unwrap(), b"abcyz");
    }

    #[test]
    fn wide_operands() {
        // two-byte offset and four-byte length
        let base: Vec<u8> = (0..400u32).map(|i| i as u8).collect();
        let delta = b"rs\x02\x36\x4b\x01\x2c\x00\x00\x00\x03\x00";
        assert_eq!(apply(&base, delta).unwrap(), &base[300..303]);
    }

    #[test]
    fn bad_magic() {
        assert!(matches!(
            apply(b"", b"rs\x01\x36\x00"),
            Err(Error::WrongMagic { what: "delta", .. })
        ));
        assert!(matches!(
            apply(b"", b"rs"),
            Err(Error::UnexpectedEof { reading: "magic", .. })
        ));
    }

    #[test]
    fn unknown_command() {
        assert!(matches!(
            apply(b"", b"rs\x02\x36\x60\x00"),
            Err(Error::UnknownCommand { command: 0x60 })
        ));
    }

    #[test]
    fn missing_end() {
        assert!(matches!(
            apply(b"", b"rs\x02\x36\x41\x01X"),
            Err(Error::UnexpectedEof { reading: "cmd", .. })
        ));
    }

    #[test]
    fn truncated_operands() {
        assert!(matches!(
            apply(b"", b"rs\x02\x36\x42\x01"),
            Err(Error::UnexpectedEof {
                reading: "literal length",
                expected: 2,
                available: 1
            })
        ));
        assert!(matches!(
            apply(b"abcd", b"rs\x02\x36\x49\x00"),
            Err(Error::UnexpectedEof {
                reading: "copy offset",
                ..
            })
        ));
        assert!(matches!(
            apply(b"", b"rs\x02\x36\x41\x05ab"),
            Err(Error::UnexpectedEof {
                reading: "literal",
                expected: 5,
                available: 2
            })
        ));
    }

    #[test]
    fn copy_past_end_of_base() {
        assert!(matches!(
            apply(b"abcd", b"rs\x02\x36\x45\x02\x04\x00"),
            Err(Error::CopyOutOfBounds {
                offset: 2,
                len: 4,
                copied: 2
            })
        ));
    }

    #[test]
    fn output_limit() {
        let delta = b"rs\x02\x36\x45\x00\x04\x41\x01X\x00";
        let mut out = Vec::new();
        let result = patch_limited(&mut Cursor::new(b"ABCD"), &mut &delta[..], &mut out, 4);
        assert!(matches!(
            result,
            Err(Error::OutputLimit {
                what: "literal",
                wanted: 1,
                available: 0
            })
        ));
        let mut out = Vec::new();
        patch_limited(&mut Cursor::new(b"ABCD"), &mut &delta[..], &mut out, 5).unwrap();
        assert_eq!(out, b"ABCDX");
    }
}
