//! Label Studio brush RLE.
//!
//! The stream is bit packed, most significant bit first:
//!
//! * 32 bits: number of encoded values (`width * height * 4`, one per RGBA channel)
//! * 5 bits: word size minus one
//! * 4 x 4 bits: run-length field widths minus one (`[3, 4, 8, 16]`)
//! * blocks of `flag(1) size_index(2) length-1(width) value(word)`, where flag 1
//!   repeats `value` and flag 0 is followed by `length` literal words.

use ndarray::{Array2, ArrayView2};
use shared::Rle;

const WORD_SIZE: u32 = 8;
const RLE_SIZES: [u32; 4] = [3, 4, 8, 16];
const CHANNELS: usize = 4;
const MAX_RUN: usize = 1 << 16;

#[derive(Debug, thiserror::Error)]
pub enum RleError {
    #[error("RLE stream ended after {0} bits")]
    Truncated(usize),
    #[error("RLE holds {actual} values, expected {expected} for the mask size")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Unsupported word size {0}")]
    WordSize(u32),
    #[error("Mask of {0} values is too large to encode")]
    TooLarge(usize),
}

struct BitWriter {
    bytes: Vec<u8>,
    acc: u8,
    filled: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            acc: 0,
            filled: 0,
        }
    }

    fn write(&mut self, value: u32, bits: u32) {
        for shift in (0..bits).rev() {
            self.acc = (self.acc << 1) | ((value >> shift) & 1) as u8;
            self.filled += 1;
            if self.filled == 8 {
                self.bytes.push(self.acc);
                self.acc = 0;
                self.filled = 0;
            }
        }
    }

    /// Label Studio's encoder always appends padding, a whole zero byte when
    /// the stream is already aligned.
    fn finish(mut self) -> Vec<u8> {
        let pad = 8 - self.filled;
        self.write(0, pad);
        self.bytes
    }
}

struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read(&mut self, bits: u32) -> Result<u32, RleError> {
        let mut value = 0u32;
        for _ in 0..bits {
            let byte = self
                .bytes
                .get(self.pos / 8)
                .ok_or(RleError::Truncated(self.pos))?;
            let bit = (byte >> (7 - self.pos % 8)) & 1;
            value = (value << 1) | u32::from(bit);
            self.pos += 1;
        }
        Ok(value)
    }
}

fn write_series(out: &mut BitWriter, size_index: usize, len: usize, value: u8) {
    out.write(1, 1);
    out.write(size_index as u32, 2);
    out.write((len - 1) as u32, RLE_SIZES[size_index]);
    out.write(u32::from(value), WORD_SIZE);
}

fn write_run(out: &mut BitWriter, len: usize, value: u8) {
    match len {
        0 => {}
        1 => {
            out.write(0, 1);
            out.write(0, 2);
            out.write(0, RLE_SIZES[0]);
            out.write(u32::from(value), WORD_SIZE);
        }
        2..=8 => write_series(out, 0, len, value),
        9..=16 => write_series(out, 1, len, value),
        17..=256 => write_series(out, 2, len, value),
        _ => {
            let mut remaining = len;
            while remaining > MAX_RUN {
                write_series(out, 3, MAX_RUN, value);
                remaining -= MAX_RUN;
            }
            write_series(out, 3, remaining, value);
        }
    }
}

/// Encodes a mask (rows x columns, values 0..=255) as brush RLE.
///
/// Every pixel is written to all four RGBA channels, so a run of `n` equal
/// pixels becomes a run of `4n` values.
pub fn mask_to_rle(mask: ArrayView2<u8>) -> Result<Rle, RleError> {
    let total = mask.len() * CHANNELS;
    let count = u32::try_from(total).map_err(|_| RleError::TooLarge(total))?;

    let mut out = BitWriter::new();
    out.write(count, 32);
    out.write(WORD_SIZE - 1, 5);
    for size in RLE_SIZES {
        out.write(size - 1, 4);
    }

    let mut pixels = mask.iter().copied();
    if let Some(first) = pixels.next() {
        let (mut value, mut run) = (first, 1usize);
        for pixel in pixels {
            if pixel == value {
                run += 1;
            } else {
                write_run(&mut out, run * CHANNELS, value);
                value = pixel;
                run = 1;
            }
        }
        write_run(&mut out, run * CHANNELS, value);
    }

    Ok(Rle::from(out.finish()))
}

/// Decodes an RLE stream into its flat value sequence.
pub fn decode(rle: &[u8]) -> Result<Vec<u8>, RleError> {
    let mut input = BitReader::new(rle);
    let count = input.read(32)? as usize;
    let word_size = input.read(5)? + 1;
    if word_size > 8 {
        return Err(RleError::WordSize(word_size));
    }
    let mut sizes = [0u32; 4];
    for size in sizes.iter_mut() {
        *size = input.read(4)? + 1;
    }

    // The header count is untrusted until the blocks back it up.
    let mut out = Vec::with_capacity(count.min(rle.len().saturating_mul(64)));
    while out.len() < count {
        let series = input.read(1)? == 1;
        let size_index = input.read(2)? as usize;
        let len = input.read(sizes[size_index])? as usize + 1;
        if series {
            let value = input.read(word_size)? as u8;
            let end = (out.len() + len).min(count);
            out.resize(end, value);
        } else {
            for _ in 0..len {
                let value = input.read(word_size)? as u8;
                if out.len() < count {
                    out.push(value);
                }
            }
        }
    }
    Ok(out)
}

/// Decodes brush RLE back into a `height x width` mask (the alpha channel).
pub fn rle_to_mask(rle: &[u8], width: usize, height: usize) -> Result<Array2<u8>, RleError> {
    let values = decode(rle)?;
    let expected = width * height * CHANNELS;
    if values.len() != expected {
        return Err(RleError::SizeMismatch {
            expected,
            actual: values.len(),
        });
    }
    let alpha: Vec<u8> = values
        .chunks_exact(CHANNELS)
        .map(|px| px[CHANNELS - 1])
        .collect();
    Array2::from_shape_vec((height, width), alpha).map_err(|_| RleError::SizeMismatch {
        expected,
        actual: values.len(),
    })
}
