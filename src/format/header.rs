// Stream headers: magic numbers and the signature header.
//
// Signature: magic (4) | block_len (4) | strong_len (4), big-endian.
// Delta:     magic (4).

use super::netint;
use crate::error::{Error, Result};
use crate::hash::config::SignatureOptions;
use crate::hash::strong::MD4_DIGEST_LEN;

/// Signature stream using the rollsum weak checksum and MD4 strong checksum.
pub const SIG_MAGIC: u32 = 0x7273_0136;

/// Delta stream.
pub const DELTA_MAGIC: u32 = 0x7273_0236;

/// Bytes in a delta header.
pub const DELTA_HEADER_LEN: usize = 4;

/// Bytes in a signature header.
pub const SIG_HEADER_LEN: usize = 12;

/// Bytes in one signature record.
#[inline]
pub fn sig_record_len(strong_len: usize) -> usize {
    4 + strong_len
}

/// Parsed signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureHeader {
    pub block_len: u32,
    pub strong_len: u32,
}

impl SignatureHeader {
    pub fn from_options(opts: &SignatureOptions) -> Self {
        Self {
            block_len: opts.block_len as u32,
            strong_len: opts.strong_len as u32,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        netint::put_u32(out, SIG_MAGIC);
        netint::put_u32(out, self.block_len);
        netint::put_u32(out, self.strong_len);
    }

    /// Parse and validate a header.
    ///
    /// Magic is checked first so a delta or foreign stream is reported as
    /// an unsupported format rather than corruption.
    pub fn parse(bytes: &[u8; SIG_HEADER_LEN]) -> Result<Self> {
        let [m0, m1, m2, m3, b0, b1, b2, b3, s0, s1, s2, s3] = *bytes;
        let magic = netint::get_u32(&[m0, m1, m2, m3]);
        if magic != SIG_MAGIC {
            return Err(Error::UnsupportedFormat { magic });
        }
        let block_len = netint::get_u32(&[b0, b1, b2, b3]);
        let strong_len = netint::get_u32(&[s0, s1, s2, s3]);

        if block_len == 0 {
            return Err(Error::corrupt("signature header has zero block length"));
        }
        if strong_len == 0 || strong_len as usize > MD4_DIGEST_LEN {
            return Err(Error::corrupt(format!(
                "signature header strong length {strong_len} out of range 1..={MD4_DIGEST_LEN}"
            )));
        }
        Ok(Self {
            block_len,
            strong_len,
        })
    }

    pub fn options(&self) -> SignatureOptions {
        SignatureOptions {
            block_len: self.block_len as usize,
            strong_len: self.strong_len as usize,
        }
    }
}

pub fn encode_delta_header(out: &mut Vec<u8>) {
    netint::put_u32(out, DELTA_MAGIC);
}

pub fn check_delta_header(bytes: &[u8; DELTA_HEADER_LEN]) -> Result<()> {
    let magic = netint::get_u32(bytes);
    if magic != DELTA_MAGIC {
        return Err(Error::UnsupportedFormat { magic });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(magic: u32, block_len: u32, strong_len: u32) -> [u8; SIG_HEADER_LEN] {
        let mut out = Vec::new();
        netint::put_u32(&mut out, magic);
        netint::put_u32(&mut out, block_len);
        netint::put_u32(&mut out, strong_len);
        out.try_into().unwrap()
    }

    #[test]
    fn signature_header_layout() {
        let mut out = Vec::new();
        SignatureHeader {
            block_len: 2048,
            strong_len: 8,
        }
        .encode(&mut out);
        assert_eq!(
            out,
            [0x72, 0x73, 0x01, 0x36, 0, 0, 0x08, 0x00, 0, 0, 0, 8]
        );
        let parsed = SignatureHeader::parse(&out.try_into().unwrap()).unwrap();
        assert_eq!(parsed.options(), SignatureOptions::default());
    }

    #[test]
    fn delta_magic_is_unsupported_as_signature() {
        let err = SignatureHeader::parse(&header_bytes(DELTA_MAGIC, 16, 8)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { magic } if magic == DELTA_MAGIC));
    }

    #[test]
    fn bad_lengths_are_corrupt() {
        for (block_len, strong_len) in [(0, 8), (16, 0), (16, 17)] {
            let err = SignatureHeader::parse(&header_bytes(SIG_MAGIC, block_len, strong_len))
                .unwrap_err();
            assert!(matches!(err, Error::CorruptInput(_)), "{block_len}/{strong_len}");
        }
    }

    #[test]
    fn delta_header() {
        let mut out = Vec::new();
        encode_delta_header(&mut out);
        assert_eq!(out, b"rs\x026");
        check_delta_header(&out.try_into().unwrap()).unwrap();
        assert!(matches!(
            check_delta_header(b"rs\x016"),
            Err(Error::UnsupportedFormat { magic: SIG_MAGIC })
        ));
    }
}
