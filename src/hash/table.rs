// Weak-checksum index over a signature's blocks.
//
// Arena layout: the blocks live in one ordered Vec owned by the signature;
// this table only stores block ordinals, grouped by bucket into one flat
// `entries` array with per-bucket start offsets (a CSR layout). Lookup
// returns a slice; no per-node allocation and nothing mutable after build,
// so the table can be shared across threads freely.
//
// Within a bucket, ordinals keep insertion (ascending basis offset) order.

use crate::error::{Error, Result};

/// Largest table lg-size. One bit short of the weak sum so the fold in
/// `bucket` still mixes both halves; block counts never exceed `u32::MAX`.
const MAX_TABLE_BITS: u32 = 31;

/// Smallest table lg-size.
const MIN_TABLE_BITS: u32 = 4;

/// Bucket configuration for a power-of-two table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCfg {
    /// Number of buckets (power of 2).
    pub size: usize,
    /// `32 - log2(size)`.
    pub shift: u32,
    /// `size - 1`.
    pub mask: u32,
}

impl HashCfg {
    /// Smallest power-of-two table holding `slots` entries, clamped to
    /// `2^4..=2^31` buckets.
    pub fn new(slots: usize) -> Self {
        let bits = slots
            .max(1)
            .next_power_of_two()
            .trailing_zeros()
            .clamp(MIN_TABLE_BITS, MAX_TABLE_BITS);
        let size = 1usize << bits;
        Self {
            size,
            shift: 32 - bits,
            mask: (size as u32) - 1,
        }
    }

    /// Fold the high bits of the weak sum (from s2) onto the low bits
    /// (from s1) before masking, so both halves pick the bucket.
    #[inline(always)]
    pub fn bucket(&self, weak: u32) -> usize {
        ((weak >> self.shift) ^ (weak & self.mask)) as usize
    }
}

/// Immutable weak checksum → block ordinal index.
#[derive(Clone, Debug)]
pub struct BlockTable {
    cfg: HashCfg,
    /// `entries[starts[b]..starts[b + 1]]` are the ordinals in bucket `b`.
    starts: Vec<u32>,
    entries: Vec<u32>,
}

impl BlockTable {
    /// Index `count` weak sums produced (twice) by `weaks`.
    ///
    /// Counting sort by bucket: one pass to size buckets, a prefix sum, and
    /// a second pass to place ordinals. Stable, so each chain stays in
    /// ascending ordinal order.
    pub fn build<I>(weaks: I) -> Result<Self>
    where
        I: ExactSizeIterator<Item = u32> + Clone,
    {
        let count = weaks.len();
        if count > u32::MAX as usize {
            return Err(Error::ResourceExhausted(format!(
                "{count} blocks exceed the index capacity"
            )));
        }

        let cfg = HashCfg::new(count);

        let mut starts: Vec<u32> = Vec::new();
        starts
            .try_reserve_exact(cfg.size + 1)
            .map_err(|e| Error::exhausted("hash table buckets", e))?;
        starts.resize(cfg.size + 1, 0);

        for weak in weaks.clone() {
            starts[cfg.bucket(weak) + 1] += 1;
        }
        for b in 0..cfg.size {
            starts[b + 1] += starts[b];
        }

        let mut entries: Vec<u32> = Vec::new();
        entries
            .try_reserve_exact(count)
            .map_err(|e| Error::exhausted("hash table chains", e))?;
        entries.resize(count, 0);

        // Reuse a cursor per bucket; `cursor[b]` starts at `starts[b]`.
        let mut cursor: Vec<u32> = Vec::new();
        cursor
            .try_reserve_exact(cfg.size)
            .map_err(|e| Error::exhausted("hash table cursors", e))?;
        cursor.extend_from_slice(&starts[..cfg.size]);

        for (ordinal, weak) in weaks.enumerate() {
            let b = cfg.bucket(weak);
            entries[cursor[b] as usize] = ordinal as u32;
            cursor[b] += 1;
        }

        log::trace!(
            "indexed {count} blocks into {} buckets (longest chain {})",
            cfg.size,
            starts.windows(2).map(|w| w[1] - w[0]).max().unwrap_or(0)
        );

        Ok(Self {
            cfg,
            starts,
            entries,
        })
    }

    /// Ordinals of every block whose weak sum falls in the same bucket as
    /// `weak`, in ascending order. Callers still compare weak sums exactly.
    #[inline]
    pub fn candidates(&self, weak: u32) -> &[u32] {
        let b = self.cfg.bucket(weak);
        let lo = self.starts[b] as usize;
        let hi = self.starts[b + 1] as usize;
        &self.entries[lo..hi]
    }

    /// Number of indexed blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bucket count.
    pub fn size(&self) -> usize {
        self.cfg.size
    }

    pub fn cfg(&self) -> &HashCfg {
        &self.cfg
    }
}
