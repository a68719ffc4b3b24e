//! Elias gamma and delta codes for positive 32-bit integers.
//!
//! Neither code can represent zero. Callers that may produce a zero (the first
//! document-id gap of a postings list) shift the value by one on both sides.

use serde::{Deserialize, Serialize};

use crate::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Codec {
    Gamma,
    Delta,
}

impl Codec {
    pub fn encode(self, n: u32, out: &mut BitWriter) -> Result<()> {
        match self {
            Codec::Gamma => gamma_encode(n, out),
            Codec::Delta => delta_encode(n, out),
        }
    }

    /// Encode a value coming from signed arithmetic. Negative or out-of-range values
    /// are rejected.
    pub fn encode_signed(self, n: i64, out: &mut BitWriter) -> Result<()> {
        let n = u32::try_from(n).map_err(|_| Error::invalid(format!("{n} is outside the 32-bit codec range")))?;
        self.encode(n, out)
    }

    pub fn decode(self, input: &mut BitReader<'_>) -> Result<u32> {
        match self {
            Codec::Gamma => gamma_decode(input),
            Codec::Delta => delta_decode(input),
        }
    }

    /// Codeword length in bits.
    pub fn codeword_len(self, n: u32) -> Result<u32> {
        let b = significant_bits(n)?;
        Ok(match self {
            Codec::Gamma => 2 * b - 1,
            Codec::Delta => 2 * significant_bits(b)? - 1 + b - 1,
        })
    }

    /// Codeword as a `0`/`1` string, e.g. `gamma(5) == "11001"`.
    pub fn to_bit_string(self, n: u32) -> Result<String> {
        let mut w = BitWriter::new();
        self.encode(n, &mut w)?;
        let len = w.bit_len();
        let bytes = w.finish();
        BitReader::new(&bytes).peek_bit_str(len)
    }
}

/// Number of bits in the binary representation of `n` without leading zeros.
#[inline]
fn significant_bits(n: u32) -> Result<u32> {
    if n == 0 {
        return Err(Error::invalid("0 has no gamma/delta codeword"));
    }
    Ok(32 - n.leading_zeros())
}

/// `b - 1` one-bits, a zero-bit, then the low `b - 1` bits of `n`.
pub fn gamma_encode(n: u32, out: &mut BitWriter) -> Result<()> {
    let b = significant_bits(n)?;
    out.push_ones(b - 1);
    out.push_bit(false);
    out.push_bits(u64::from(n), b - 1);
    Ok(())
}

pub fn gamma_decode(input: &mut BitReader<'_>) -> Result<u32> {
    let offset_len = input.read_unary()?;
    if offset_len > 31 {
        return Err(Error::corrupt(format!("gamma prefix of {offset_len} ones exceeds 32-bit range")));
    }
    let offset = input.read_bits(offset_len)?;
    Ok(((1u64 << offset_len) | offset) as u32)
}

/// Gamma code of `b`, then the low `b - 1` bits of `n`.
pub fn delta_encode(n: u32, out: &mut BitWriter) -> Result<()> {
    let b = significant_bits(n)?;
    gamma_encode(b, out)?;
    out.push_bits(u64::from(n), b - 1);
    Ok(())
}

pub fn delta_decode(input: &mut BitReader<'_>) -> Result<u32> {
    let b = gamma_decode(input)?;
    if b > 32 {
        return Err(Error::corrupt(format!("delta length {b} exceeds 32-bit range")));
    }
    let offset = input.read_bits(b - 1)?;
    Ok(((1u64 << (b - 1)) | offset) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(codec: Codec, values: &[u32]) -> Vec<u32> {
        let mut w = BitWriter::new();
        for &v in values {
            codec.encode(v, &mut w).unwrap();
        }
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        values.iter().map(|_| codec.decode(&mut r).unwrap()).collect()
    }

    #[test]
    fn gamma_of_five() {
        assert_eq!(Codec::Gamma.to_bit_string(5).unwrap(), "11001");
        assert_eq!(Codec::Gamma.to_bit_string(1).unwrap(), "0");
        assert_eq!(Codec::Gamma.to_bit_string(2).unwrap(), "100");
    }

    #[test]
    fn delta_codewords() {
        // b = 1 -> gamma(1) = "0"
        assert_eq!(Codec::Delta.to_bit_string(1).unwrap(), "0");
        // b = 3 -> gamma(3) = "101", then "01"
        assert_eq!(Codec::Delta.to_bit_string(5).unwrap(), "10101");
        // b = 4 -> gamma(4) = "11000", then "001"
        assert_eq!(Codec::Delta.to_bit_string(9).unwrap(), "11000001");
    }

    #[test]
    fn zero_is_not_representable() {
        let mut w = BitWriter::new();
        assert!(matches!(Codec::Gamma.encode(0, &mut w), Err(Error::InvalidInput(_))));
        assert!(matches!(Codec::Delta.encode(0, &mut w), Err(Error::InvalidInput(_))));
        assert!(w.is_empty());
    }

    #[test]
    fn negative_values_are_rejected() {
        let mut w = BitWriter::new();
        assert!(matches!(Codec::Gamma.encode_signed(-3, &mut w), Err(Error::InvalidInput(_))));
        assert!(matches!(Codec::Delta.encode_signed(1 << 40, &mut w), Err(Error::InvalidInput(_))));
        Codec::Delta.encode_signed(7, &mut w).unwrap();
    }

    #[test]
    fn extremes_round_trip() {
        let values = [1, 2, 3, 31, 32, 1023, 1024, u32::MAX - 1, u32::MAX];
        assert_eq!(round_trip(Codec::Gamma, &values), values);
        assert_eq!(round_trip(Codec::Delta, &values), values);
    }

    #[test]
    fn codeword_lengths_match_encoder() {
        for n in [1u32, 2, 5, 17, 100, 65_535, u32::MAX] {
            for codec in [Codec::Gamma, Codec::Delta] {
                let len = codec.to_bit_string(n).unwrap().len() as u32;
                assert_eq!(codec.codeword_len(n).unwrap(), len, "{codec:?} {n}");
            }
        }
    }

    #[test]
    fn truncated_codeword() {
        let mut w = BitWriter::new();
        gamma_encode(1000, &mut w).unwrap();
        let mut bytes = w.finish();
        bytes.truncate(1);
        let mut r = BitReader::new(&bytes);
        assert!(matches!(gamma_decode(&mut r), Err(Error::TruncatedStream { .. })));
    }
}
