// Block signatures of a basis.
//
// A `Signature` is built either by scanning a basis (`SignatureJob` produces
// the wire stream, `Signature::from_basis` builds it in memory) or by loading
// a signature stream (`LoadSignatureJob`). It is immutable once built and
// safe to share read-only across threads.
//
// - `builder`: SignatureJob: basis bytes → signature stream
// - `loader`: LoadSignatureJob: signature stream → Signature

pub mod builder;
pub mod loader;

pub use builder::SignatureJob;
pub use loader::LoadSignatureJob;

use crate::error::{Error, Result};
use crate::hash::config::SignatureOptions;
use crate::hash::rolling::weak_sum;
use crate::hash::strong::StrongSum;
use crate::hash::table::BlockTable;

/// Checksums of one basis block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSum {
    pub weak: u32,
    pub strong: StrongSum,
}

impl BlockSum {
    pub fn compute(block: &[u8], strong_len: usize) -> Self {
        Self {
            weak: weak_sum(block),
            strong: StrongSum::compute(block, strong_len),
        }
    }
}

/// Ordered block checksums plus the weak-sum index over them.
///
/// Block `i` covers basis bytes `i * block_len .. (i + 1) * block_len`.
#[derive(Clone, Debug)]
pub struct Signature {
    opts: SignatureOptions,
    blocks: Vec<BlockSum>,
    table: BlockTable,
}

impl Signature {
    /// Index an ordered list of block sums.
    pub fn from_blocks(opts: SignatureOptions, blocks: Vec<BlockSum>) -> Result<Self> {
        opts.validate()?;
        if let Some(bad) = blocks.iter().position(|b| b.strong.len() != opts.strong_len) {
            return Err(Error::InvalidConfig(format!(
                "block {bad} has a {}-byte strong sum, expected {}",
                blocks[bad].strong.len(),
                opts.strong_len
            )));
        }
        let table = BlockTable::build(blocks.iter().map(|b| b.weak))?;
        Ok(Self {
            opts,
            blocks,
            table,
        })
    }

    /// Checksum every block of an in-memory basis.
    pub fn from_basis(basis: &[u8], opts: SignatureOptions) -> Result<Self> {
        opts.validate()?;
        let mut blocks = Vec::new();
        blocks
            .try_reserve_exact(basis.len().div_ceil(opts.block_len))
            .map_err(|e| Error::exhausted("signature blocks", e))?;
        blocks.extend(
            basis
                .chunks(opts.block_len)
                .map(|block| BlockSum::compute(block, opts.strong_len)),
        );
        Self::from_blocks(opts, blocks)
    }

    pub fn options(&self) -> SignatureOptions {
        self.opts
    }

    pub fn block_len(&self) -> usize {
        self.opts.block_len
    }

    pub fn strong_len(&self) -> usize {
        self.opts.strong_len
    }

    pub fn blocks(&self) -> &[BlockSum] {
        &self.blocks
    }

    pub fn block(&self, ordinal: u32) -> &BlockSum {
        &self.blocks[ordinal as usize]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn table(&self) -> &BlockTable {
        &self.table
    }

    /// Basis offset where block `ordinal` starts.
    pub fn offset_of(&self, ordinal: u32) -> u64 {
        u64::from(ordinal) * self.opts.block_len as u64
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.opts == other.opts && self.blocks == other.blocks
    }
}

impl Eq for Signature {}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(block_len: usize, strong_len: usize) -> SignatureOptions {
        SignatureOptions::new(block_len, strong_len).unwrap()
    }

    #[test]
    fn empty_basis_gives_empty_signature() {
        let sig = Signature::from_basis(b"", opts(16, 8)).unwrap();
        assert!(sig.is_empty());
        assert!(sig.table().is_empty());
    }

    #[test]
    fn final_short_block_is_kept() {
        let basis = vec![7u8; 40];
        let sig = Signature::from_basis(&basis, opts(16, 8)).unwrap();
        assert_eq!(sig.len(), 3);
        assert_eq!(sig.block(2).weak, weak_sum(&basis[32..]));
        assert_eq!(sig.offset_of(2), 32);
    }

    #[test]
    fn identical_blocks_share_a_chain() {
        let basis = vec![0x41u8; 64];
        let sig = Signature::from_basis(&basis, opts(16, 8)).unwrap();
        assert_eq!(sig.len(), 4);
        let first = sig.block(0);
        assert!(sig.blocks().iter().all(|b| b == first));
        let chain: Vec<u32> = sig.table().candidates(first.weak).to_vec();
        assert_eq!(chain, vec![0, 1, 2, 3]);
    }

    #[test]
    fn from_blocks_rejects_wrong_strong_len() {
        let blocks = vec![BlockSum::compute(b"abcd", 4)];
        let err = Signature::from_blocks(opts(4, 8), blocks).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn signature_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Signature>();
    }
}
