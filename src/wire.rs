//! Encoding helpers for the rdiff binary formats.
//!
//! All integers on the wire are big-endian, whatever the host byte order.

use std::io::{self, ErrorKind, Read, Write};

use crate::consts::{
    RS_OP_COPY_N1_N1, RS_OP_COPY_N8_N8, RS_OP_END, RS_OP_LITERAL_1, RS_OP_LITERAL_64,
    RS_OP_LITERAL_N1, RS_OP_LITERAL_N8,
};
use crate::error::{Error, Result};

/// Reads until `buf` is full or the input is exhausted, returning the number of bytes read.
pub(crate) fn read_full<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match input.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Like `read_exact`, but reports a short read as [Error::UnexpectedEof].
pub(crate) fn read_exact<R: Read + ?Sized>(
    input: &mut R,
    buf: &mut [u8],
    reading: &'static str,
) -> Result<()> {
    let n = read_full(input, buf)?;
    if n != buf.len() {
        return Err(Error::UnexpectedEof {
            reading,
            expected: buf.len() as u64,
            available: n as u64,
        });
    }
    Ok(())
}

/// The smallest field width (1, 2, 4 or 8 bytes) that can hold `value`.
pub fn find_length(value: u64) -> Result<usize> {
    if value > i64::max_value() as u64 {
        Err(Error::ValueTooLarge(value))
    } else if value <= u8::max_value() as u64 {
        Ok(1)
    } else if value <= u16::max_value() as u64 {
        Ok(2)
    } else if value <= u32::max_value() as u64 {
        Ok(4)
    } else {
        Ok(8)
    }
}

/// Write `value` as a big-endian integer of exactly `width` bytes.
pub(crate) fn write_int<W: Write + ?Sized>(value: u64, width: usize, out: &mut W) -> io::Result<()> {
    debug_assert!(matches!(width, 1 | 2 | 4 | 8));
    out.write_all(&value.to_be_bytes()[8 - width..])
}

/// Write `value` using the smallest width that holds it, returning that width.
pub fn encode_length<W: Write + ?Sized>(value: u64, out: &mut W) -> Result<usize> {
    let width = find_length(value)?;
    write_int(value, width, out)?;
    Ok(width)
}

/// Decode a big-endian integer of 1, 2, 4 or 8 bytes.
///
/// Eight-byte values must fit in an `i64`, as rdiff reads them signed.
pub fn decode_length(bytes: &[u8]) -> Result<u64> {
    let value = match bytes.len() {
        1 | 2 | 4 | 8 => {
            let mut b = [0; 8];
            b[8 - bytes.len()..].copy_from_slice(bytes);
            u64::from_be_bytes(b)
        }
        width => return Err(Error::InvalidFieldWidth(width)),
    };
    if value > i64::max_value() as u64 {
        return Err(Error::ValueTooLarge(value));
    }
    Ok(value)
}

/// Read and decode an integer field of `width` bytes.
pub(crate) fn read_length<R: Read + ?Sized>(
    input: &mut R,
    width: usize,
    reading: &'static str,
) -> Result<u64> {
    let mut b = [0; 8];
    read_exact(input, &mut b[..width], reading)?;
    decode_length(&b[..width])
}

#[inline]
fn width_index(width: usize) -> u8 {
    match width {
        1 => 0,
        2 => 1,
        4 => 2,
        _ => 3,
    }
}

/// The copy opcode whose operand widths fit `offset` and `len`.
pub fn copy_command(offset: u64, len: u64) -> Result<u8> {
    let offset_len = width_index(find_length(offset)?);
    let len_len = width_index(find_length(len)?);
    Ok(RS_OP_COPY_N1_N1 + offset_len * 4 + len_len)
}

/// The literal opcode with an explicit length field wide enough for `len`.
pub fn literal_command(len: u64) -> Result<u8> {
    Ok(RS_OP_LITERAL_N1 + width_index(find_length(len)?))
}

/// A decoded delta opcode, before its operands are read.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Opcode {
    /// End of the delta.
    End,
    /// A literal of 1 to 64 bytes whose length is carried by the opcode.
    ShortLiteral(u8),
    /// A literal whose length follows in a field of `len_width` bytes.
    Literal {
        /// Width of the length field.
        len_width: usize,
    },
    /// A copy from the base, with offset and length fields of the given widths.
    Copy {
        /// Width of the offset field.
        offset_width: usize,
        /// Width of the length field.
        len_width: usize,
    },
}

impl Opcode {
    /// Classify a command byte.
    pub fn parse(cmd: u8) -> Result<Opcode> {
        match cmd {
            RS_OP_END => Ok(Opcode::End),
            RS_OP_LITERAL_1..=RS_OP_LITERAL_64 => Ok(Opcode::ShortLiteral(1 + cmd - RS_OP_LITERAL_1)),
            RS_OP_LITERAL_N1..=RS_OP_LITERAL_N8 => Ok(Opcode::Literal {
                len_width: 1 << (cmd - RS_OP_LITERAL_N1) as usize,
            }),
            RS_OP_COPY_N1_N1..=RS_OP_COPY_N8_N8 => {
                let mode = cmd - RS_OP_COPY_N1_N1;
                Ok(Opcode::Copy {
                    offset_width: 1 << (mode / 4) as usize,
                    len_width: 1 << (mode % 4) as usize,
                })
            }
            _ => Err(Error::UnknownCommand { command: cmd }),
        }
    }
}

/// A fully decoded delta command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Bytes to write to the output as-is.
    Literal(Vec<u8>),
    /// A range of the base data to write to the output.
    Copy {
        /// Absolute offset into the base data.
        offset: u64,
        /// Number of bytes to copy.
        len: u64,
    },
}

/// Decodes a delta stream into [Command]s, for inspection.
///
/// The magic is checked on construction; iteration stops after the end command.
/// Literal payloads are held in memory, so [patch](crate::patch) should be
/// preferred for actually applying a delta.
pub struct DeltaReader<R> {
    input: R,
    done: bool,
}

impl<R: Read> DeltaReader<R> {
    /// Validate the delta magic and prepare to read commands.
    pub fn new(mut input: R) -> Result<Self> {
        let mut magic = [0; 4];
        read_exact(&mut input, &mut magic, "magic")?;
        let magic = u32::from_be_bytes(magic);
        if magic != crate::consts::DELTA_MAGIC {
            return Err(Error::WrongMagic {
                what: "delta",
                magic,
            });
        }
        Ok(DeltaReader { input, done: false })
    }

    fn read_literal(&mut self, len: u64) -> Result<Command> {
        let mut data = Vec::new();
        let n = (&mut self.input).take(len).read_to_end(&mut data)? as u64;
        if n != len {
            return Err(Error::UnexpectedEof {
                reading: "literal",
                expected: len,
                available: n,
            });
        }
        Ok(Command::Literal(data))
    }

    fn next_command(&mut self) -> Result<Option<Command>> {
        let mut cmd = [0; 1];
        read_exact(&mut self.input, &mut cmd, "cmd")?;
        match Opcode::parse(cmd[0])? {
            Opcode::End => Ok(None),
            Opcode::ShortLiteral(n) => self.read_literal(n as u64).map(Some),
            Opcode::Literal { len_width } => {
                let len = read_length(&mut self.input, len_width, "literal length")?;
                self.read_literal(len).map(Some)
            }
            Opcode::Copy {
                offset_width,
                len_width,
            } => {
                let offset = read_length(&mut self.input, offset_width, "copy offset")?;
                let len = read_length(&mut self.input, len_width, "copy length")?;
                Ok(Some(Command::Copy { offset, len }))
            }
        }
    }
}

impl<R: Read> Iterator for DeltaReader<R> {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_command() {
            Ok(Some(cmd)) => Some(Ok(cmd)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
