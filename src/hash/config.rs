// Signature parameters: block length and strong checksum truncation.
//
// Defaults are the usual rdiff values: 2048-byte blocks, 8-byte strong sums.

use crate::error::{Error, Result};

use super::strong::MD4_DIGEST_LEN;

/// Default block length in bytes.
pub const DEFAULT_BLOCK_LEN: usize = 2048;

/// Default truncated strong checksum length in bytes.
pub const DEFAULT_STRONG_LEN: usize = 8;

/// Smallest block length chosen by [`SignatureOptions::recommended`].
pub const MIN_RECOMMENDED_BLOCK_LEN: usize = 256;

/// Largest block length accepted anywhere (the wire header holds a u32).
pub const MAX_BLOCK_LEN: usize = u32::MAX as usize;

/// Parameters fixed for the lifetime of one signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureOptions {
    /// Bytes per basis block (the final block may be shorter).
    pub block_len: usize,
    /// Bytes of MD4 digest kept per block, `1..=16`.
    pub strong_len: usize,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            block_len: DEFAULT_BLOCK_LEN,
            strong_len: DEFAULT_STRONG_LEN,
        }
    }
}

impl SignatureOptions {
    pub fn new(block_len: usize, strong_len: usize) -> Result<Self> {
        let opts = Self {
            block_len,
            strong_len,
        };
        opts.validate()?;
        Ok(opts)
    }

    /// Check both parameters against the ranges the wire format allows.
    pub fn validate(&self) -> Result<()> {
        if self.block_len == 0 || self.block_len > MAX_BLOCK_LEN {
            return Err(Error::InvalidConfig(format!(
                "block length {} out of range 1..={MAX_BLOCK_LEN}",
                self.block_len
            )));
        }
        if self.strong_len == 0 || self.strong_len > MD4_DIGEST_LEN {
            return Err(Error::InvalidConfig(format!(
                "strong checksum length {} out of range 1..={MD4_DIGEST_LEN}",
                self.strong_len
            )));
        }
        Ok(())
    }

    /// Parameters scaled to a basis of `basis_len` bytes.
    ///
    /// Block length grows with the square root of the basis size (rounded up
    /// to a multiple of 8, at least 256). The strong length is the minimum
    /// that keeps a false block match around 2^-24 likely for the whole file.
    pub fn recommended(basis_len: u64) -> Self {
        let root = isqrt(basis_len) as usize;
        let block_len = root.div_ceil(8).saturating_mul(8).max(MIN_RECOMMENDED_BLOCK_LEN);
        let blocks = basis_len / block_len as u64 + 1;
        let bits = ln2(basis_len.saturating_add(1 << 24)) + ln2(blocks);
        let strong_len = (2 + (bits as usize + 7) / 8).clamp(DEFAULT_STRONG_LEN, MD4_DIGEST_LEN);
        Self {
            block_len,
            strong_len,
        }
    }

    /// Number of blocks a basis of `basis_len` bytes divides into.
    pub fn block_count(&self, basis_len: u64) -> u64 {
        basis_len.div_ceil(self.block_len as u64)
    }
}

/// Integer floor(log2(v)), with ln2(0) = 0.
fn ln2(v: u64) -> u32 {
    if v == 0 { 0 } else { 63 - v.leading_zeros() }
}

fn isqrt(v: u64) -> u64 {
    if v < 2 {
        return v;
    }
    let mut x = (v as f64).sqrt() as u64;
    while x.checked_mul(x).is_none_or(|sq| sq > v) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= v) {
        x += 1;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let o = SignatureOptions::default();
        assert_eq!(o.block_len, 2048);
        assert_eq!(o.strong_len, 8);
        o.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(SignatureOptions::new(0, 8).is_err());
        assert!(SignatureOptions::new(16, 0).is_err());
        assert!(SignatureOptions::new(16, 17).is_err());
        assert!(SignatureOptions::new(1, 16).is_ok());
    }

    #[test]
    fn recommended_scales_with_size() {
        let small = SignatureOptions::recommended(1000);
        assert_eq!(small.block_len, MIN_RECOMMENDED_BLOCK_LEN);
        small.validate().unwrap();

        let big = SignatureOptions::recommended(1 << 32);
        assert_eq!(big.block_len, 1 << 16);
        assert!(big.strong_len >= small.strong_len);
        big.validate().unwrap();
    }

    #[test]
    fn block_count_rounds_up() {
        let o = SignatureOptions::new(16, 8).unwrap();
        assert_eq!(o.block_count(0), 0);
        assert_eq!(o.block_count(16), 1);
        assert_eq!(o.block_count(17), 2);
        assert_eq!(o.block_count(64), 4);
    }

    #[test]
    fn log_and_sqrt_helpers() {
        assert_eq!(ln2(0), 0);
        assert_eq!(ln2(1), 0);
        assert_eq!(ln2(1024), 10);
        assert_eq!(ln2(1025), 10);
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(u64::MAX), u32::MAX as u64);
    }
}
