//! Bounds-checked reading and writing of the blob's little-endian primitives.
//!
//! A [`BinaryCursor`] owns (or borrows) one buffer and a position. Every
//! primitive checks the requested width against the buffer length before
//! touching it and advances the position by exactly that width, so a
//! size-computation bug or a truncated blob surfaces as
//! [`ReportError::OutOfBounds`] at the first access past the end.

use byteorder::{ByteOrder, LittleEndian};

use crate::report::types::error::{ReportError, Result};
use crate::report::types::file_kind::FileKind;

/// Largest string a length byte can describe.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Raw value reserved for the unavailable sentinel in a fixed field of
/// `width` bytes (all bits set).
pub fn fixed_sentinel(width: usize) -> u32 {
    ((1u64 << (8 * width)) - 1) as u32
}

/// Powers of ten for fixed-point scaling.
pub fn decimal_scale(decimals: u8) -> u64 {
    10u64.pow(decimals as u32)
}

/// Converts a decimal literal into the raw integer of a fixed field.
///
/// The conversion is exact on the decimal digits: fractional digits beyond
/// `decimals` are truncated and missing ones are zero-filled, so `"12.34"`
/// with 2 places is `1234` and `"12.349"` is `1234` as well. Returns `None`
/// for anything that is not an unsigned decimal or does not fit in `u64`.
pub fn decimal_to_raw(text: &str, decimals: u8) -> Option<u64> {
    let text = text.strip_prefix('+').unwrap_or(text);
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut raw: u64 = 0;
    for digit in int_part.bytes() {
        raw = raw.checked_mul(10)?.checked_add((digit - b'0') as u64)?;
    }
    let mut frac_digits = frac_part.bytes();
    for _ in 0..decimals {
        let digit = frac_digits.next().map(|b| (b - b'0') as u64).unwrap_or(0);
        raw = raw.checked_mul(10)?.checked_add(digit)?;
    }
    Some(raw)
}

/// A position-tracking view over a byte buffer.
///
/// Decoders use `BinaryCursor<&[u8]>`; encoders write into an exactly-sized
/// `BinaryCursor<Vec<u8>>`.
#[derive(Debug)]
pub struct BinaryCursor<B> {
    buf: B,
    pos: usize,
    kind: FileKind,
}

impl<B: AsRef<[u8]>> BinaryCursor<B> {
    pub fn new(kind: FileKind, buf: B) -> Self {
        Self { buf, pos: 0, kind }
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.len()
    }

    pub fn into_inner(self) -> B {
        self.buf
    }

    fn check(&self, width: usize) -> Result<()> {
        if width > self.remaining() {
            return Err(ReportError::OutOfBounds {
                kind: self.kind,
                offset: self.pos,
                width,
                len: self.len(),
            });
        }
        Ok(())
    }

    fn take(&mut self, width: usize) -> Result<&[u8]> {
        self.check(width)?;
        let start = self.pos;
        self.pos += width;
        Ok(&self.buf.as_ref()[start..start + width])
    }

    /// Moves past `width` bytes without interpreting them.
    pub fn advance(&mut self, width: usize) -> Result<()> {
        self.check(width)?;
        self.pos += width;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Reads the unsigned integer of a 2- or 3-byte fixed field.
    pub fn read_fixed_raw(&mut self, width: usize) -> Result<u32> {
        let offset = self.pos;
        if !(1..=4).contains(&width) {
            return Err(ReportError::FieldOverflow {
                kind: self.kind,
                offset,
                reason: format!("unsupported fixed-point width {}", width),
            });
        }
        Ok(LittleEndian::read_uint(self.take(width)?, width) as u32)
    }

    /// Reads a fixed-point value as `raw / 10^decimals`.
    ///
    /// The all-ones raw value is the unavailable sentinel and reads as `-1`.
    pub fn read_fixed(&mut self, width: usize, decimals: u8) -> Result<f64> {
        let raw = self.read_fixed_raw(width)?;
        if raw == fixed_sentinel(width) {
            return Ok(-1.0);
        }
        Ok(raw as f64 / decimal_scale(decimals) as f64)
    }

    /// Reads a length-prefixed string: one length byte, then that many bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads an inline array length and rejects negative values.
    pub fn read_count_i16(&mut self) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_i16()?;
        usize::try_from(count)
            .map_err(|_| ReportError::malformed_blob(self.kind, offset, format!("negative count {}", count)))
    }

    /// Reads an inline array length and rejects negative values.
    pub fn read_count_i32(&mut self) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_i32()?;
        usize::try_from(count)
            .map_err(|_| ReportError::malformed_blob(self.kind, offset, format!("negative count {}", count)))
    }

    /// Fails with `MalformedReport` unless the whole buffer was consumed.
    pub fn expect_exhausted(&self) -> Result<()> {
        if !self.is_exhausted() {
            return Err(ReportError::malformed_blob(
                self.kind,
                self.pos,
                format!("{} trailing bytes after the last record", self.remaining()),
            ));
        }
        Ok(())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BinaryCursor<B> {
    fn slot(&mut self, width: usize) -> Result<&mut [u8]> {
        self.check(width)?;
        let start = self.pos;
        self.pos += width;
        Ok(&mut self.buf.as_mut()[start..start + width])
    }

    fn overflow(&self, reason: String) -> ReportError {
        ReportError::FieldOverflow {
            kind: self.kind,
            offset: self.pos,
            reason,
        }
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.slot(1)?[0] = value;
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.slot(1)?[0] = value as u8;
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        LittleEndian::write_i16(self.slot(2)?, value);
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        LittleEndian::write_i32(self.slot(4)?, value);
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        LittleEndian::write_f32(self.slot(4)?, value);
        Ok(())
    }

    /// Writes the unsigned integer of a fixed field of `width` bytes.
    pub fn write_fixed_raw(&mut self, width: usize, raw: u32) -> Result<()> {
        if !(1..=4).contains(&width) {
            return Err(self.overflow(format!("unsupported fixed-point width {}", width)));
        }
        if (raw as u64) > fixed_sentinel(width) as u64 {
            return Err(self.overflow(format!("raw value {} does not fit {} bytes", raw, width)));
        }
        LittleEndian::write_uint(self.slot(width)?, raw as u64, width);
        Ok(())
    }

    /// Writes a decimal value into a fixed field, truncating digits beyond
    /// `decimals`. `-1` writes the unavailable sentinel.
    pub fn write_fixed(&mut self, width: usize, decimals: u8, value: f64) -> Result<()> {
        if value == -1.0 {
            return self.write_fixed_raw(width, fixed_sentinel(width));
        }
        let raw = decimal_to_raw(&value.to_string(), decimals)
            .filter(|raw| *raw < fixed_sentinel(width) as u64)
            .ok_or_else(|| {
                self.overflow(format!(
                    "{} is not representable in {} bytes with {} decimals",
                    value, width, decimals
                ))
            })?;
        self.write_fixed_raw(width, raw as u32)
    }

    /// Writes one length byte followed by the string's bytes.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(self.overflow(format!(
                "string of {} bytes exceeds the {}-byte limit",
                bytes.len(),
                MAX_STRING_LEN
            )));
        }
        self.check(1 + bytes.len())?;
        self.write_u8(bytes.len() as u8)?;
        self.slot(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_count_i16(&mut self, count: usize) -> Result<()> {
        let value = i16::try_from(count)
            .map_err(|_| self.overflow(format!("count {} exceeds a 16-bit length", count)))?;
        self.write_i16(value)
    }

    pub fn write_count_i32(&mut self, count: usize) -> Result<()> {
        let value = i32::try_from(count)
            .map_err(|_| self.overflow(format!("count {} exceeds a 32-bit length", count)))?;
        self.write_i32(value)
    }
}

/// Encoded size of a length-prefixed string.
pub fn string_size(value: &str) -> usize {
    1 + value.len()
}
