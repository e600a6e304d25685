//! Field codec
//!
//! Every byte on the wire is carried as two upper-case hexadecimal
//! characters ("nibble pairs"). Multi-byte scalars are written big-endian,
//! text is written one byte per ASCII character followed by a zero
//! terminator.
//!
//! ```text
//! 0x1234u16        -> "1234"
//! -1i32            -> "FFFFFFFF"
//! 1.0f32           -> "3F800000"
//! "AB"             -> "414200"
//! ```
//!
//! [`HexReader`] is the receiving side of the same contract.

use crate::error::DecodeError;
use std::fmt;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A run of hex digit pairs, one pair per encoded byte
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedField(String);

impl EncodedField {
    /// Encoded characters
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes this field carries once decoded
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    /// Number of hex characters (always `2 * byte_len()`)
    pub fn char_len(&self) -> usize {
        self.0.len()
    }

    /// Consume the field, returning the encoded characters
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-width scalar with a hex wire representation
pub trait HexEncode: Copy {
    /// Width on the wire, in bytes
    const WIDTH: usize;

    /// Append the big-endian hex rendering of `self` to `out`
    fn encode_hex(self, out: &mut String);
}

macro_rules! impl_hex_encode {
    ($($ty:ty),*) => {
        $(
            impl HexEncode for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn encode_hex(self, out: &mut String) {
                    for byte in self.to_be_bytes() {
                        push_byte(out, byte);
                    }
                }
            }
        )*
    };
}

impl_hex_encode!(u8, u16, u32, u64, i32, i64);

impl HexEncode for f32 {
    const WIDTH: usize = 4;

    fn encode_hex(self, out: &mut String) {
        self.to_bits().encode_hex(out);
    }
}

/// Encode a fixed-width scalar
pub fn encode<T: HexEncode>(value: T) -> EncodedField {
    let mut out = String::with_capacity(T::WIDTH * 2);
    value.encode_hex(&mut out);
    EncodedField(out)
}

/// Encode text as zero-terminated ASCII
///
/// Non-ASCII characters are stripped before encoding.
pub fn encode_str(text: &str) -> EncodedField {
    let mut out = String::with_capacity(estimate_str_size(text) * 2);
    encode_str_into(text, &mut out);
    EncodedField(out)
}

/// Bytes `encode_str(text)` would occupy, without encoding it
pub fn estimate_str_size(text: &str) -> usize {
    text.chars().filter(char::is_ascii).count() + 1
}

pub(crate) fn encode_str_into(text: &str, out: &mut String) {
    for byte in text.bytes().filter(u8::is_ascii) {
        push_byte(out, byte);
    }
    push_byte(out, 0x00);
}

#[inline]
fn push_byte(out: &mut String, byte: u8) {
    out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
    out.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
}

/// Sequential reader over an encoded payload
///
/// Accepts upper- and lower-case digits.
#[derive(Debug, Clone)]
pub struct HexReader<'a> {
    payload: &'a [u8],
    offset: usize,
}

impl<'a> HexReader<'a> {
    /// Create a reader; the payload must hold whole nibble pairs
    pub fn new(payload: &'a str) -> Result<Self, DecodeError> {
        if payload.len() % 2 != 0 {
            return Err(DecodeError::OddLength(payload.len()));
        }
        Ok(Self {
            payload: payload.as_bytes(),
            offset: 0,
        })
    }

    /// Current position, in characters
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        (self.payload.len() - self.offset) / 2
    }

    /// Check whether the whole payload has been consumed
    pub fn is_empty(&self) -> bool {
        self.offset >= self.payload.len()
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bits(1)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(self.read_bits(2)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_bits(4)? as u32)
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        self.read_bits(8)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read a zero-terminated string, consuming the terminator
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let start = self.offset;
        let mut text = String::new();
        while !self.is_empty() {
            match self.read_u8()? {
                0x00 => return Ok(text),
                byte => text.push(byte as char),
            }
        }
        self.offset = start;
        Err(DecodeError::UnterminatedString(start))
    }

    fn read_bits(&mut self, width: usize) -> Result<u64, DecodeError> {
        let needed = width * 2;
        let available = self.payload.len() - self.offset;
        if available < needed {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed,
                available,
            });
        }

        let mut value = 0u64;
        for (i, &digit) in self.payload[self.offset..self.offset + needed]
            .iter()
            .enumerate()
        {
            let nibble = (digit as char)
                .to_digit(16)
                .ok_or(DecodeError::InvalidDigit {
                    offset: self.offset + i,
                    digit: digit as char,
                })?;
            value = (value << 4) | nibble as u64;
        }
        self.offset += needed;
        Ok(value)
    }
}
