use std::io::{Read, Write};

use crate::buffer::RollingBuffer;
use crate::consts::{DELTA_MAGIC, RS_OP_END};
use crate::crc::Crc;
use crate::error::{Error, Result};
use crate::hasher::StrongHasher;
use crate::index::IndexedSignature;
use crate::wire::{copy_command, literal_command, write_int};

/// The smallest read window, so that tiny block sizes don't mean tiny reads.
const MIN_WINDOW: usize = 64 * 1024;

/// Counters describing an emitted delta.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DiffStats {
    /// Number of copy commands.
    pub copy_commands: u64,
    /// Bytes covered by copy commands.
    pub copy_bytes: u64,
    /// Number of literal commands.
    pub literal_commands: u64,
    /// Bytes carried by literal commands.
    pub literal_bytes: u64,
}

fn insert_command<W: Write + ?Sized>(data: &[u8], out: &mut W) -> Result<()> {
    let len = data.len() as u64;
    let cmd = literal_command(len)?;
    out.write_all(&[cmd])?;
    let mode = cmd - crate::consts::RS_OP_LITERAL_N1;
    write_int(len, 1 << mode, out)?;
    out.write_all(data)?;
    Ok(())
}

fn copy_command_to<W: Write + ?Sized>(offset: u64, len: u64, out: &mut W) -> Result<()> {
    let cmd = copy_command(offset, len)?;
    let mode = cmd - crate::consts::RS_OP_COPY_N1_N1;
    out.write_all(&[cmd])?;
    write_int(offset, 1 << (mode / 4), out)?;
    write_int(len, 1 << (mode % 4), out)?;
    Ok(())
}

struct OutputState<'a, W: ?Sized> {
    out: &'a mut W,
    /// `(base offset, length)` of the copy being accumulated.
    queued_copy: Option<(u64, u64)>,
    stats: DiffStats,
}

impl<W: Write + ?Sized> OutputState<'_, W> {
    fn flush_copy(&mut self) -> Result<()> {
        if let Some((offset, len)) = self.queued_copy.take() {
            copy_command_to(offset, len, &mut *self.out)?;
            self.stats.copy_commands += 1;
            self.stats.copy_bytes += len;
        }
        Ok(())
    }

    fn literal(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if self.queued_copy.is_some() {
            return Err(Error::InternalConsistency(
                "a copy and a literal were pending at the same time",
            ));
        }
        insert_command(data, &mut *self.out)?;
        self.stats.literal_commands += 1;
        self.stats.literal_bytes += data.len() as u64;
        Ok(())
    }

    /// Queue a copy of `len` bytes at `offset`, extending the queued copy if `extends` is set.
    fn copy(&mut self, offset: u64, len: u64, extends: bool) -> Result<()> {
        if let Some((queued_offset, queued_len)) = self.queued_copy {
            if extends && queued_offset + queued_len == offset {
                // just extend the copy
                self.queued_copy = Some((queued_offset, queued_len + len));
                return Ok(());
            }
        }
        self.flush_copy()?;
        self.queued_copy = Some((offset, len));
        Ok(())
    }
}

/// Calculate a delta and write it to `out`.
/// This delta can be applied to the base data represented by `signature` to
/// reconstruct the data read from `input`.
pub fn diff<H, R, W>(
    signature: &IndexedSignature<H>,
    input: &mut R,
    out: &mut W,
) -> Result<DiffStats>
where
    H: StrongHasher,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    diff_with_cancel(signature, input, out, || false)
}

/// Like [diff()], but calls `cancelled` each time the input window is refilled
/// and stops with [Error::Cancelled] once it returns `true`.
pub fn diff_with_cancel<H, R, W, F>(
    signature: &IndexedSignature<H>,
    input: &mut R,
    out: &mut W,
    mut cancelled: F,
) -> Result<DiffStats>
where
    H: StrongHasher,
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: FnMut() -> bool,
{
    let block_size = signature.block_size() as usize;
    let window = (4 * block_size).max(MIN_WINDOW);
    let mut buffer = RollingBuffer::new(input);
    let mut state = OutputState {
        out,
        queued_copy: None,
        stats: DiffStats::default(),
    };
    state.out.write_all(&DELTA_MAGIC.to_be_bytes())?;

    // `buffer[..here]` are unmatched bytes not yet emitted as a literal, and
    // `crc` is the checksum of `buffer[here..here + len]` when known.
    let mut here = 0;
    let mut crc: Option<Crc> = None;
    let mut next_match: u32 = 0;
    loop {
        if buffer.len() - here <= block_size && !buffer.is_exhausted() {
            state.literal(&buffer.data()[..here])?;
            buffer.consume(here);
            here = 0;
            if cancelled() {
                return Err(Error::Cancelled);
            }
            buffer.fill(window)?;
        }
        let available = buffer.len() - here;
        if available == 0 {
            break;
        }
        let len = available.min(block_size);
        let data = &buffer.data()[here..here + len];
        let sum = match crc {
            Some(sum) => sum,
            None => Crc::calculate(data),
        };
        if let Some(idx) = signature.lookup(sum, data, Some(next_match)) {
            // match found
            let unmatched = &buffer.data()[..here];
            state.literal(unmatched)?;
            let extends = idx == next_match;
            state.copy(idx as u64 * block_size as u64, len as u64, extends)?;
            next_match = idx.wrapping_add(1);
            buffer.consume(here + len);
            here = 0;
            crc = None;
            continue;
        }
        // no match, slide the window by one byte
        state.flush_copy()?;
        let old_byte = buffer[here];
        crc = Some(if available > block_size {
            sum.rotate(block_size as u32, old_byte, buffer[here + block_size])
        } else {
            // the input is exhausted and the final window shrinks
            sum.rollout(len as u32, old_byte)
        });
        here += 1;
    }
    state.flush_copy()?;
    state.literal(&buffer.data()[..here])?;
    state.out.write_all(&[RS_OP_END])?;
    state.out.flush()?;
    tracing::debug!(
        copy_commands = state.stats.copy_commands,
        copy_bytes = state.stats.copy_bytes,
        literal_commands = state.stats.literal_commands,
        literal_bytes = state.stats.literal_bytes,
        "wrote delta"
    );
    Ok(state.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{calculate_signature, SignatureOptions};
    use crate::wire::{Command, DeltaReader};

    fn delta(base: &[u8], new: &[u8], block_size: u32) -> (Vec<u8>, DiffStats) {
        let sig = calculate_signature(
            base,
            SignatureOptions {
                block_size,
                crypto_hash_size: 8,
            },
        )
        .unwrap();
        let sig = IndexedSignature::from_bytes(&sig).unwrap();
        let mut out = Vec::new();
        let stats = diff(&sig, &mut &new[..], &mut out).unwrap();
        (out, stats)
    }

    fn commands(delta: &[u8]) -> Vec<Command> {
        DeltaReader::new(delta)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn insertion_between_blocks() {
        let (out, stats) = delta(b"ABCDEFGH", b"ABCDXEFGH", 4);
        assert_eq!(
            commands(&out),
            vec![
                Command::Copy { offset: 0, len: 4 },
                Command::Literal(b"X".to_vec()),
                Command::Copy { offset: 4, len: 4 },
            ]
        );
        assert_eq!(
            out,
            b"rs\x02\x36\x45\x00\x04\x41\x01X\x45\x04\x04\x00".to_vec()
        );
        assert_eq!(stats.copy_commands, 2);
        assert_eq!(stats.literal_bytes, 1);
    }

    #[test]
    fn identical_data_is_one_copy() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 253) as u8).collect();
        let (out, _) = delta(&data, &data, 64);
        assert_eq!(
            commands(&out),
            vec![Command::Copy {
                offset: 0,
                len: 10_000
            }]
        );
    }

    #[test]
    fn repeated_blocks_stay_contiguous() {
        let base = b"AAAAAAAAAAAAAAAA";
        let (out, _) = delta(base, base, 4);
        assert_eq!(commands(&out), vec![Command::Copy { offset: 0, len: 16 }]);
    }

    #[test]
    fn reordered_blocks() {
        let (out, _) = delta(b"ABCDEFGH", b"EFGHABCD", 4);
        assert_eq!(
            commands(&out),
            vec![
                Command::Copy { offset: 4, len: 4 },
                Command::Copy { offset: 0, len: 4 },
            ]
        );
    }

    #[test]
    fn disjoint_data_is_all_literal() {
        let (out, stats) = delta(b"abcdefgh", b"0123456789", 4);
        assert_eq!(commands(&out), vec![Command::Literal(b"0123456789".to_vec())]);
        assert_eq!(stats.copy_commands, 0);
    }

    #[test]
    fn short_tail_block_matches() {
        let (out, _) = delta(b"ABCDEF", b"xABCDEF", 4);
        assert_eq!(
            commands(&out),
            vec![
                Command::Literal(b"x".to_vec()),
                Command::Copy { offset: 0, len: 6 },
            ]
        );
    }

    #[test]
    fn empty_inputs() {
        let (out, _) = delta(b"", b"", 4);
        assert_eq!(out, b"rs\x02\x36\x00".to_vec());
        let (out, _) = delta(b"", b"abc", 4);
        assert_eq!(commands(&out), vec![Command::Literal(b"abc".to_vec())]);
        let (out, _) = delta(b"abc", b"", 4);
        assert!(commands(&out).is_empty());
    }

    #[test]
    fn literals_are_bounded_by_the_window() {
        let new = vec![7u8; 3 * MIN_WINDOW];
        let (out, stats) = delta(b"abcdefgh", &new, 4);
        assert!(stats.literal_commands > 1);
        let total: usize = commands(&out)
            .into_iter()
            .map(|cmd| match cmd {
                Command::Literal(data) => {
                    assert!(data.len() <= MIN_WINDOW);
                    data.len()
                }
                Command::Copy { .. } => panic!("unexpected copy"),
            })
            .sum();
        assert_eq!(total, new.len());
    }

    #[test]
    fn huge_block_length_with_short_input() {
        // a valid header for an empty base, with a block length of 1e9
        let mut sig = b"rs\x01\x36".to_vec();
        sig.extend_from_slice(&1_000_000_000u32.to_be_bytes());
        sig.extend_from_slice(&8u32.to_be_bytes());
        let sig = IndexedSignature::from_bytes(&sig).unwrap();
        let mut out = Vec::new();
        diff(&sig, &mut &b"abc"[..], &mut out).unwrap();
        assert_eq!(commands(&out), vec![Command::Literal(b"abc".to_vec())]);
    }

    #[test]
    fn cancel_stops_at_refill() {
        let sig = calculate_signature(b"abcd", SignatureOptions::default()).unwrap();
        let sig = IndexedSignature::from_bytes(&sig).unwrap();
        let mut out = Vec::new();
        let result = diff_with_cancel(&sig, &mut &b"abcd"[..], &mut out, || true);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
