// Strong block checksum: MD4 truncated to the signature's strong length.
//
// Computed once per basis block when building a signature, and once per
// weak-checksum hit when searching. Never rolled.

use md4::{Digest, Md4};

/// Full MD4 digest length.
pub const MD4_DIGEST_LEN: usize = 16;

/// A strong checksum truncated to at most [`MD4_DIGEST_LEN`] bytes.
///
/// Stored inline so signature blocks stay a flat, allocation-free array.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrongSum {
    bytes: [u8; MD4_DIGEST_LEN],
    len: u8,
}

impl StrongSum {
    /// Digest `data` and keep the first `strong_len` bytes.
    pub fn compute(data: &[u8], strong_len: usize) -> Self {
        debug_assert!((1..=MD4_DIGEST_LEN).contains(&strong_len));
        let full: [u8; MD4_DIGEST_LEN] = Md4::digest(data).into();
        Self::from_truncated(&full[..strong_len])
    }

    /// Wrap bytes read from a signature stream.
    pub fn from_truncated(bytes: &[u8]) -> Self {
        let len = bytes.len().min(MD4_DIGEST_LEN);
        let mut out = [0u8; MD4_DIGEST_LEN];
        out[..len].copy_from_slice(&bytes[..len]);
        Self {
            bytes: out,
            len: len as u8,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Strong sum of a block that arrives in pieces.
#[derive(Clone, Default)]
pub struct StrongHasher {
    md4: Md4,
}

impl StrongHasher {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.md4.update(data);
    }

    /// Truncated digest of everything fed so far; the hasher starts over.
    pub fn finish(&mut self, strong_len: usize) -> StrongSum {
        debug_assert!((1..=MD4_DIGEST_LEN).contains(&strong_len));
        let full: [u8; MD4_DIGEST_LEN] = self.md4.finalize_reset().into();
        StrongSum::from_truncated(&full[..strong_len])
    }
}

impl std::fmt::Debug for StrongHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StrongHasher(md4)")
    }
}

impl std::fmt::Debug for StrongSum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.as_bytes() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
