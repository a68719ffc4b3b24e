//! MSB-first bit packing.
//!
//! Bits are appended to a byte buffer starting at the high-order bit of each byte.
//! [`BitWriter::finish`] zero-pads the low-order bits of the final byte.

use crate::error::{Error, Result};

#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push_bit(&mut self, bit: bool) {
        let offset = self.bit_len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> offset;
        }
        self.bit_len += 1;
    }

    /// Append the low `count` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u64, count: u32) {
        debug_assert!(count <= 64);
        for shift in (0..count).rev() {
            self.push_bit((value >> shift) & 1 == 1);
        }
    }

    /// Append `count` one-bits.
    pub fn push_ones(&mut self, count: u32) {
        for _ in 0..count {
            self.push_bit(true);
        }
    }

    /// Append a logical bit string such as `"11001"`. Any character other than `0`/`1`
    /// is rejected.
    pub fn append_bit_str(&mut self, bits: &str) -> Result<()> {
        for c in bits.chars() {
            match c {
                '0' => self.push_bit(false),
                '1' => self.push_bit(true),
                other => return Err(Error::invalid(format!("not a bit character: {other:?}"))),
            }
        }
        Ok(())
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reads bits from a byte slice at an explicit bit cursor.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor, in bits from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.pos >= self.data.len() * 8 {
            return Err(Error::TruncatedStream { needed: 1, remaining: 0 });
        }
        let byte = self.data[self.pos / 8];
        let bit = byte & (0x80 >> (self.pos % 8)) != 0;
        self.pos += 1;
        Ok(bit)
    }

    /// Read `count` bits (at most 64) as an unsigned integer, most significant first.
    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        if count > 64 {
            return Err(Error::invalid(format!("cannot read {count} bits into a u64")));
        }
        let remaining = self.remaining();
        if count as usize > remaining {
            return Err(Error::TruncatedStream { needed: count as usize, remaining });
        }
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Count one-bits up to and including the terminating zero-bit. The zero is consumed.
    pub fn read_unary(&mut self) -> Result<u32> {
        let mut ones = 0u32;
        while self.read_bit()? {
            ones += 1;
        }
        Ok(ones)
    }

    /// Render the next `count` bits as a `0`/`1` string without advancing.
    pub fn peek_bit_str(&self, count: usize) -> Result<String> {
        let mut ahead = self.clone();
        let mut out = String::with_capacity(count);
        for _ in 0..count {
            out.push(if ahead.read_bit()? { '1' } else { '0' });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_msb_first_and_pads() {
        let mut w = BitWriter::new();
        w.append_bit_str("11001").unwrap();
        assert_eq!(w.bit_len(), 5);
        assert_eq!(w.finish(), vec![0b1100_1000]);
    }

    #[test]
    fn bits_span_byte_boundaries() {
        let mut w = BitWriter::new();
        w.push_bits(0b101, 3);
        w.push_bits(0xABC, 12);
        let bytes = w.finish();
        assert_eq!(bytes.len(), 2);

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_bits(12).unwrap(), 0xABC);
        assert_eq!(r.position(), 15);
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn reading_past_end_is_truncation() {
        let bytes = [0xFFu8];
        let mut r = BitReader::new(&bytes);
        assert!(matches!(r.read_unary(), Err(Error::TruncatedStream { .. })));

        let mut r = BitReader::new(&bytes);
        let err = r.read_bits(9).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream { needed: 9, remaining: 8 }));
        // A failed multi-bit read does not move the cursor.
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn rejects_non_bit_characters() {
        let mut w = BitWriter::new();
        assert!(w.append_bit_str("10x").is_err());
    }

    #[test]
    fn peek_does_not_advance() {
        let bytes = [0b1010_0000u8];
        let r = BitReader::new(&bytes);
        assert_eq!(r.peek_bit_str(4).unwrap(), "1010");
        assert_eq!(r.position(), 0);
    }
}
