//! LZF block compression, as used by the `binary_compressed` PCD payload.
//!
//! A compressed block is a sequence of instructions, each starting with a control byte:
//!
//! - `0..=31`: literal run, the next `ctrl + 1` bytes are copied verbatim
//! - `32..=255`: back-reference of length `(ctrl >> 5) + 2` (a length field of 7
//!   is followed by an extra byte added to the length), and offset
//!   `((ctrl & 0x1f) << 8) + next_byte + 1` counted backwards from the current
//!   output position.
//!
//! The block carries no length information, callers store the decompressed
//! length next to it.

use crate::errors::LzfError;

const HASH_LOG: u32 = 14;
const HASH_SIZE: usize = 1 << HASH_LOG;
/// Largest backward distance a match may have
const MAX_OFFSET: usize = 8191;
/// Largest number of bytes in one literal instruction
const MAX_LITERAL: usize = 32;
/// Largest number of bytes in one back-reference instruction
const MAX_REFERENCE: usize = 264;
/// Length field value announcing an extra length byte
const LONG_REFERENCE: usize = 7;
/// Largest output to input ratio, a three byte long reference
const MAX_EXPANSION: usize = MAX_REFERENCE / 3;

/// Size of the scratch buffer used by [`compress`] for an input of `input_len` bytes
pub fn max_compressed_len(input_len: usize) -> usize {
    input_len + input_len / 8 + 16
}

#[inline]
fn hash(b0: u8, b1: u8, b2: u8) -> usize {
    let mut h = ((u32::from(b0) << 8) | u32::from(b1)) ^ (u32::from(b2) << 5);
    h ^= h >> 2;
    h as usize & (HASH_SIZE - 1)
}

/// Bounded writer over the output buffer
struct Output<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> Output<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    #[inline]
    fn push(&mut self, byte: u8) -> Option<()> {
        let slot = self.buffer.get_mut(self.position)?;
        *slot = byte;
        self.position += 1;
        Some(())
    }

    fn literals(&mut self, mut bytes: &[u8]) -> Option<()> {
        while !bytes.is_empty() {
            let run = bytes.len().min(MAX_LITERAL);
            if self.remaining() < run + 1 {
                return None;
            }
            self.push((run - 1) as u8)?;
            self.buffer[self.position..self.position + run].copy_from_slice(&bytes[..run]);
            self.position += run;
            bytes = &bytes[run..];
        }
        Some(())
    }

    fn back_reference(&mut self, offset: usize, len: usize) -> Option<()> {
        debug_assert!((3..=MAX_REFERENCE).contains(&len));
        debug_assert!((1..=MAX_OFFSET).contains(&offset));
        let distance = offset - 1;
        let high = (distance >> 8) as u8;
        let low = (distance & 0xFF) as u8;
        let len_field = len - 2;
        if len_field < LONG_REFERENCE {
            self.push(((len_field as u8) << 5) | high)?;
        } else {
            self.push(((LONG_REFERENCE as u8) << 5) | high)?;
            self.push((len_field - LONG_REFERENCE) as u8)?;
        }
        self.push(low)
    }
}

fn compress_matches(input: &[u8], out: &mut Output) -> Option<()> {
    let mut table = vec![usize::MAX; HASH_SIZE];
    let mut literal_start = 0;
    let mut ip = 0;

    while ip + 2 < input.len() {
        let h = hash(input[ip], input[ip + 1], input[ip + 2]);
        let candidate = table[h];
        table[h] = ip;

        if candidate != usize::MAX {
            let offset = ip - candidate;
            if offset <= MAX_OFFSET && input[candidate..candidate + 3] == input[ip..ip + 3] {
                out.literals(&input[literal_start..ip])?;

                let max_len = (input.len() - ip).min(MAX_REFERENCE);
                let mut len = 3;
                while len < max_len && input[candidate + len] == input[ip + len] {
                    len += 1;
                }
                out.back_reference(offset, len)?;

                ip += len;
                literal_start = ip;
                continue;
            }
        }
        ip += 1;
    }
    out.literals(&input[literal_start..])
}

/// Compresses `input` into `output`, returns the number of bytes written.
///
/// When the matches found do not fit in `output` the input is stored as plain
/// literal runs instead, failing only if even that does not fit.
pub fn compress_into(input: &[u8], output: &mut [u8]) -> Result<usize, LzfError> {
    if input.len() >= 3 {
        let mut out = Output::new(output);
        if compress_matches(input, &mut out).is_some() {
            return Ok(out.position);
        }
        log::trace!("lzf: matches overflowed the output, storing {} bytes literally", input.len());
    }

    let capacity = output.len();
    let mut out = Output::new(output);
    out.literals(input).ok_or(LzfError::OutputTooSmall {
        input_len: input.len(),
        capacity,
    })?;
    Ok(out.position)
}

/// Compresses `input` into a new buffer
pub fn compress(input: &[u8]) -> Result<Vec<u8>, LzfError> {
    let mut output = vec![0u8; max_compressed_len(input.len())];
    let written = compress_into(input, &mut output)?;
    output.truncate(written);
    log::trace!("lzf: {} bytes compressed to {}", input.len(), written);
    Ok(output)
}

/// Decompresses `input`, which must expand to exactly `expected_len` bytes
pub fn decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>, LzfError> {
    let mut output: Vec<u8> =
        Vec::with_capacity(expected_len.min(input.len().saturating_mul(MAX_EXPANSION)));
    let mut ip = 0;

    let next_byte = |ip: &mut usize| -> Result<usize, LzfError> {
        let byte = *input
            .get(*ip)
            .ok_or(LzfError::TruncatedInput { position: *ip })?;
        *ip += 1;
        Ok(usize::from(byte))
    };

    while ip < input.len() {
        let ctrl = next_byte(&mut ip)?;

        if ctrl < MAX_LITERAL {
            let len = ctrl + 1;
            let literal = input
                .get(ip..ip + len)
                .ok_or(LzfError::TruncatedInput { position: ip })?;
            if output.len() + len > expected_len {
                return Err(LzfError::OutputOverflow {
                    needed: output.len() + len,
                    capacity: expected_len,
                });
            }
            output.extend_from_slice(literal);
            ip += len;
        } else {
            let mut len = (ctrl >> 5) + 2;
            if len == LONG_REFERENCE + 2 {
                len += next_byte(&mut ip)?;
            }
            let offset = ((ctrl & 0x1f) << 8) + next_byte(&mut ip)? + 1;

            if offset > output.len() {
                return Err(LzfError::InvalidBackReference {
                    offset,
                    position: output.len(),
                });
            }
            if output.len() + len > expected_len {
                return Err(LzfError::OutputOverflow {
                    needed: output.len() + len,
                    capacity: expected_len,
                });
            }

            // source and destination overlap when offset < len
            let start = output.len() - offset;
            for i in start..start + len {
                let byte = output[i];
                output.push(byte);
            }
        }
    }

    if output.len() != expected_len {
        return Err(LzfError::LengthMismatch {
            expected: expected_len,
            actual: output.len(),
        });
    }
    Ok(output)
}
