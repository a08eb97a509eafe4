// Block search: weak-sum candidate lookup confirmed by strong sum.
//
//   1. Bucket lookup in the signature's BlockTable.
//   2. Exact weak-sum compare per candidate (cheap reject).
//   3. Strong sum of the window, computed at most once per search, compared
//      against each weak-equal candidate.
//
// The first confirmed candidate wins; chains are in ascending ordinal order,
// so equal-content blocks resolve to the lowest basis offset.

use super::rolling::RollingChecksum;
use super::strong::StrongSum;
use crate::signature::Signature;

/// Searches one signature for windows of new data.
///
/// Holds only a shared borrow of the signature; each job owns its matcher.
#[derive(Debug)]
pub struct BlockMatcher<'s> {
    sig: &'s Signature,
    /// Weak-sum hits rejected by the strong sum.
    false_matches: u64,
    /// Strong sums computed so far.
    strong_sums: u64,
}

impl<'s> BlockMatcher<'s> {
    pub fn new(sig: &'s Signature) -> Self {
        Self {
            sig,
            false_matches: 0,
            strong_sums: 0,
        }
    }

    pub fn signature(&self) -> &'s Signature {
        self.sig
    }

    /// Find a block whose checksums match `window`, given its rolling weak
    /// sum. Returns the block ordinal.
    pub fn search(&mut self, weak: u32, window: &[u8]) -> Option<u32> {
        let sig = self.sig;
        let mut strong: Option<StrongSum> = None;

        for &ordinal in sig.table().candidates(weak) {
            let block = sig.block(ordinal);
            if block.weak != weak {
                continue;
            }

            let ours = *strong.get_or_insert_with(|| {
                self.strong_sums += 1;
                StrongSum::compute(window, sig.strong_len())
            });

            if ours == block.strong {
                log::trace!("block {ordinal} matches window of {} bytes", window.len());
                return Some(ordinal);
            }
            self.false_matches += 1;
        }
        None
    }

    pub fn false_matches(&self) -> u64 {
        self.false_matches
    }

    pub fn strong_sums(&self) -> u64 {
        self.strong_sums
    }
}

/// Locate each of `sig`'s blocks inside `basis`.
///
/// Scans `basis` with the rolling checksum, the same way the delta encoder
/// scans new data, but records where signature blocks were found instead of
/// emitting instructions. Slot `i` of the result holds the basis offset of
/// the last place block `i`'s content was found, or `None`.
///
/// `sig` is normally the signature of a newer file, so the result maps new
/// blocks back onto positions of an older one.
pub fn reverse_match(sig: &Signature, basis: &[u8]) -> Vec<Option<u64>> {
    let mut found = vec![None; sig.len()];
    let block_len = sig.block_len();
    if sig.is_empty() || basis.len() < block_len {
        return found;
    }

    let mut matcher = BlockMatcher::new(sig);
    let mut sum = RollingChecksum::new();
    let mut pos = 0usize;

    while pos + block_len <= basis.len() {
        if sum.is_empty() {
            sum.update(&basis[pos..pos + block_len]);
        }
        let window = &basis[pos..pos + block_len];
        if let Some(ordinal) = matcher.search(sum.digest(), window) {
            found[ordinal as usize] = Some(pos as u64);
            pos += block_len;
            sum.reset();
        } else if pos + block_len < basis.len() {
            sum.rotate(basis[pos], basis[pos + block_len]);
            pos += 1;
        } else {
            break;
        }
    }

    log::debug!(
        "reverse match: {} of {} blocks located, {} false matches",
        found.iter().filter(|f| f.is_some()).count(),
        sig.len(),
        matcher.false_matches()
    );
    found
}
