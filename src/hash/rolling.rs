// Rolling weak checksum (rsync "rollsum").
//
// Two 16-bit accumulators over a sliding window:
//   s1 = sum of (byte + CHAR_OFFSET)
//   s2 = sum of the running s1 values
// combined as `(s2 << 16) | s1`. The offset keeps runs of zero bytes from
// hashing to zero. Values are bit-identical to the classic rsync rollsum, so a
// signature built elsewhere with the same magic matches here.

/// Added to every byte before it is accumulated.
pub const CHAR_OFFSET: u32 = 31;

/// Rolling checksum state for one window.
///
/// `count` is the number of bytes currently inside the window. `rotate`
/// keeps it fixed; `roll_in`/`roll_out` grow and shrink it by one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    count: usize,
}

impl RollingChecksum {
    pub const fn new() -> Self {
        Self {
            s1: 0,
            s2: 0,
            count: 0,
        }
    }

    /// Forget all bytes.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Number of bytes contributing to the digest.
    #[inline]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Absorb a whole run of bytes in O(len).
    pub fn update(&mut self, buf: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;

        let mut chunks = buf.chunks_exact(16);
        for chunk in &mut chunks {
            for &b in chunk {
                s1 = s1.wrapping_add(u32::from(b));
                s2 = s2.wrapping_add(s1);
            }
        }
        for &b in chunks.remainder() {
            s1 = s1.wrapping_add(u32::from(b));
            s2 = s2.wrapping_add(s1);
        }

        // Fold the per-byte offset in once: len * OFFSET into s1 and
        // OFFSET * len * (len + 1) / 2 into s2.
        let len = buf.len() as u64;
        let tri = (len.wrapping_mul(len.wrapping_add(1)) / 2) as u32;
        s1 = s1.wrapping_add((len as u32).wrapping_mul(CHAR_OFFSET));
        s2 = s2.wrapping_add(tri.wrapping_mul(CHAR_OFFSET));

        self.s1 = s1 & 0xffff;
        self.s2 = s2 & 0xffff;
        self.count += buf.len();
    }

    /// Slide a full window by one byte: `out` leaves, `inp` enters.
    #[inline(always)]
    pub fn rotate(&mut self, out: u8, inp: u8) {
        let out = u32::from(out).wrapping_add(CHAR_OFFSET);
        let inp = u32::from(inp).wrapping_add(CHAR_OFFSET);
        self.s1 = self.s1.wrapping_sub(out).wrapping_add(inp) & 0xffff;
        self.s2 = self
            .s2
            .wrapping_sub((self.count as u32).wrapping_mul(out))
            .wrapping_add(self.s1)
            & 0xffff;
    }

    /// Append one byte to the end of the window.
    #[inline]
    pub fn roll_in(&mut self, inp: u8) {
        let inp = u32::from(inp).wrapping_add(CHAR_OFFSET);
        self.s1 = self.s1.wrapping_add(inp) & 0xffff;
        self.s2 = self.s2.wrapping_add(self.s1) & 0xffff;
        self.count += 1;
    }

    /// Drop the oldest byte from the window.
    #[inline]
    pub fn roll_out(&mut self, out: u8) {
        debug_assert!(self.count > 0, "roll_out on empty window");
        let out = u32::from(out).wrapping_add(CHAR_OFFSET);
        self.s1 = self.s1.wrapping_sub(out) & 0xffff;
        self.s2 = self
            .s2
            .wrapping_sub((self.count as u32).wrapping_mul(out))
            & 0xffff;
        self.count -= 1;
    }

    /// Current 32-bit weak checksum.
    #[inline(always)]
    pub const fn digest(&self) -> u32 {
        (self.s2 << 16) | (self.s1 & 0xffff)
    }
}

/// One-shot weak checksum of `buf`.
pub fn weak_sum(buf: &[u8]) -> u32 {
    let mut sum = RollingChecksum::new();
    sum.update(buf);
    sum.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct per-byte definition, no folding tricks.
    fn naive(buf: &[u8]) -> u32 {
        let mut s1: u32 = 0;
        let mut s2: u32 = 0;
        for &b in buf {
            s1 = s1.wrapping_add(u32::from(b) + CHAR_OFFSET);
            s2 = s2.wrapping_add(s1);
        }
        ((s2 & 0xffff) << 16) | (s1 & 0xffff)
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(RollingChecksum::new().digest(), 0);
        assert_eq!(weak_sum(b""), 0);
    }

    #[test]
    fn update_matches_naive_definition() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 + 3) as u8).collect();
        for len in [1, 2, 15, 16, 17, 31, 255, 1000] {
            assert_eq!(weak_sum(&data[..len]), naive(&data[..len]), "len {len}");
        }
    }

    #[test]
    fn split_updates_equal_single_update() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut a = RollingChecksum::new();
        a.update(&data[..10]);
        a.update(&data[10..]);
        assert_eq!(a.digest(), weak_sum(data));
        assert_eq!(a.count(), data.len());
    }

    #[test]
    fn known_value_for_single_byte() {
        // s1 = 'a' + 31 = 128, s2 = 128.
        assert_eq!(weak_sum(b"a"), (128 << 16) | 128);
    }

    #[test]
    fn rotate_equals_fresh_checksum() {
        let data: Vec<u8> = (0..=255u8).cycle().take(600).collect();
        let window = 64;
        let mut sum = RollingChecksum::new();
        sum.update(&data[..window]);
        for i in 0..data.len() - window {
            sum.rotate(data[i], data[i + window]);
            assert_eq!(sum.digest(), weak_sum(&data[i + 1..i + 1 + window]), "offset {i}");
            assert_eq!(sum.count(), window);
        }
    }

    #[test]
    fn roll_in_and_out() {
        let data = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let mut sum = RollingChecksum::new();
        for &b in &data[..8] {
            sum.roll_in(b);
        }
        assert_eq!(sum.digest(), weak_sum(&data[..8]));

        sum.roll_out(data[0]);
        assert_eq!(sum.digest(), weak_sum(&data[1..8]));
        assert_eq!(sum.count(), 7);

        for i in 1..8 {
            sum.roll_out(data[i]);
        }
        assert!(sum.is_empty());
        assert_eq!(sum.digest(), 0);
    }

    #[test]
    fn reset_clears_state() {
        let mut sum = RollingChecksum::new();
        sum.update(b"hello");
        sum.reset();
        assert_eq!(sum, RollingChecksum::new());
    }

    #[test]
    fn zero_runs_do_not_hash_to_zero() {
        assert_ne!(weak_sum(&[0u8; 32]), 0);
        assert_ne!(weak_sum(&[0u8; 32]), weak_sum(&[0u8; 33]));
    }
}
