// Per-job counters.

use std::fmt;
use std::time::{Duration, Instant};

/// Counters a job keeps while it runs.
///
/// Command counts and byte totals describe the delta stream (for delta and
/// patch jobs) or the signature (for signature jobs). `in_bytes` and
/// `out_bytes` count what crossed the job's input and output windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Short operation name: "signature", "loadsig", "delta" or "patch".
    pub op: &'static str,

    pub lit_cmds: u64,
    /// Literal payload bytes.
    pub lit_bytes: u64,
    /// Opcode and length bytes spent on literals.
    pub lit_cmdbytes: u64,

    pub copy_cmds: u64,
    /// Bytes copied from the basis.
    pub copy_bytes: u64,
    /// Opcode and parameter bytes spent on copies.
    pub copy_cmdbytes: u64,

    /// Signature records written or read.
    pub sig_blocks: u64,
    /// Signature stream bytes, header included.
    pub sig_bytes: u64,
    /// Weak-sum hits rejected by the strong sum.
    pub false_matches: u64,
    pub block_len: u64,

    pub in_bytes: u64,
    pub out_bytes: u64,
    /// Time spent inside `drive`.
    pub elapsed: Duration,
}

impl Stats {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            ..Self::default()
        }
    }

    /// Record one `drive` call that started at `start`.
    pub(crate) fn account(&mut self, consumed: usize, produced: usize, start: Instant) {
        self.in_bytes += consumed as u64;
        self.out_bytes += produced as u64;
        self.elapsed += start.elapsed();
    }

    /// Total command bytes excluding literal payload.
    pub fn cmd_bytes(&self) -> u64 {
        self.lit_cmdbytes + self.copy_cmdbytes
    }
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} statistics: ", self.op)?;
        if self.lit_cmds > 0 {
            write!(
                f,
                "literal[{} cmds, {} bytes, {} cmdbytes] ",
                self.lit_cmds, self.lit_bytes, self.lit_cmdbytes
            )?;
        }
        if self.copy_cmds > 0 || self.false_matches > 0 {
            write!(
                f,
                "copy[{} cmds, {} bytes, {} cmdbytes, {} false] ",
                self.copy_cmds, self.copy_bytes, self.copy_cmdbytes, self.false_matches
            )?;
        }
        if self.sig_blocks > 0 {
            write!(
                f,
                "signature[{} blocks, {} bytes per block] ",
                self.sig_blocks, self.block_len
            )?;
        }
        let secs = self.elapsed.as_secs_f64();
        let rate = |bytes: u64| if secs > 0.0 { mib(bytes) / secs } else { 0.0 };
        write!(
            f,
            "speed[{:.1} MB ({:.1} MB/s) in, {:.1} MB ({:.1} MB/s) out, {:.3} sec]",
            mib(self.in_bytes),
            rate(self.in_bytes),
            mib(self.out_bytes),
            rate(self.out_bytes),
            secs
        )
    }
}
