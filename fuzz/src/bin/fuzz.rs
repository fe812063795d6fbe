#[macro_use]
extern crate honggfuzz;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use rdiff_stream::wire::{Command, DeltaReader};
use rdiff_stream::{patch_limited, Error};
use std::io::Cursor;

fn main() {
    const MAX_LEN: usize = 1 << 24;
    const MAX_OUT: u64 = 1 << 24;
    let mut base_data = vec![0; MAX_LEN];
    SmallRng::seed_from_u64(0).fill_bytes(&mut base_data);
    let mut out_data = Vec::with_capacity(MAX_OUT as usize);
    loop {
        fuzz!(|data: &[u8]| {
            if data.len() < 4 {
                return;
            }
            let (base_len, delta) = data.split_at(4);
            let base_len = u32::from_be_bytes([base_len[0], base_len[1], base_len[2], base_len[3]])
                as usize
                % MAX_LEN;
            let base_data = &base_data[..base_len];
            out_data.clear();

            let result = patch_limited(
                &mut Cursor::new(base_data),
                &mut &delta[..],
                &mut out_data,
                MAX_OUT,
            );
            // the inspection decoder must agree with the patcher on well-formed deltas
            let decoded = DeltaReader::new(delta)
                .and_then(|reader| reader.collect::<Result<Vec<_>, Error>>());
            match result {
                Ok(()) => {
                    assert!(out_data.len() as u64 <= MAX_OUT);
                    let mut expected = Vec::new();
                    for command in decoded.expect("patched delta must decode") {
                        match command {
                            Command::Literal(bytes) => expected.extend_from_slice(&bytes),
                            Command::Copy { len: 0, .. } => {}
                            Command::Copy { offset, len } => expected.extend_from_slice(
                                &base_data[offset as usize..(offset + len) as usize],
                            ),
                        }
                    }
                    assert_eq!(expected, out_data);
                }
                Err(Error::OutputLimit { .. }) | Err(Error::CopyOutOfBounds { .. }) => {}
                Err(e) => {
                    assert!(decoded.is_err(), "unexpected error: {:?}, delta={:?}", e, delta);
                }
            }
        });
    }
}
