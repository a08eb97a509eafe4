// SignatureJob: basis bytes in, signature stream out.

use std::time::Instant;

use super::BlockSum;
use crate::error::{Error, Result};
use crate::format::header::{SIG_HEADER_LEN, SignatureHeader};
use crate::format::netint;
use crate::hash::config::SignatureOptions;
use crate::hash::rolling::RollingChecksum;
use crate::hash::strong::StrongHasher;
use crate::job::{Buffers, Job, JobStatus, Stats, Tube};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Blocks,
    Done,
    Failed,
}

/// Streams the signature of a basis.
///
/// Emits the header, then one record per `block_len` bytes of input as soon
/// as the block is complete; the final short block is emitted at end of
/// input. A block split across calls is hashed piece by piece, so memory use
/// is one record whatever the block length.
#[derive(Debug)]
pub struct SignatureJob {
    opts: SignatureOptions,
    state: State,
    /// Sums of the partial block carried between calls.
    weak: RollingChecksum,
    strong: StrongHasher,
    filled: usize,
    tube: Tube,
    stats: Stats,
}

impl SignatureJob {
    pub fn new(opts: SignatureOptions) -> Result<Self> {
        opts.validate()?;
        let mut stats = Stats::new("signature");
        stats.block_len = opts.block_len as u64;
        Ok(Self {
            opts,
            state: State::Header,
            weak: RollingChecksum::new(),
            strong: StrongHasher::new(),
            filled: 0,
            tube: Tube::new(),
            stats,
        })
    }

    pub fn options(&self) -> SignatureOptions {
        self.opts
    }

    /// Record for the partial block, which is then reset.
    fn emit_partial(&mut self) {
        let sum = BlockSum {
            weak: self.weak.digest(),
            strong: self.strong.finish(self.opts.strong_len),
        };
        self.weak.reset();
        self.filled = 0;
        self.emit_record(sum);
    }

    fn emit_record(&mut self, sum: BlockSum) {
        let out = self.tube.buf_mut();
        netint::put_u32(out, sum.weak);
        out.extend_from_slice(sum.strong.as_bytes());
        self.stats.sig_blocks += 1;
        self.stats.sig_bytes += (4 + self.opts.strong_len) as u64;
        log::trace!("block {}: weak {:#010x}", self.stats.sig_blocks - 1, sum.weak);
    }

    fn step(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        let block_len = self.opts.block_len;
        loop {
            if !self.tube.drain(bufs) {
                return Ok(JobStatus::OutputFull);
            }
            match self.state {
                State::Header => {
                    SignatureHeader::from_options(&self.opts).encode(self.tube.buf_mut());
                    self.stats.sig_bytes += SIG_HEADER_LEN as u64;
                    self.state = State::Blocks;
                    log::debug!(
                        "signature: block_len {block_len}, strong_len {}",
                        self.opts.strong_len
                    );
                }
                State::Blocks => {
                    // Whole blocks straight from the input when nothing is
                    // carried over.
                    if self.filled == 0 && bufs.input().len() >= block_len {
                        let sum = BlockSum::compute(bufs.take(block_len), self.opts.strong_len);
                        self.emit_record(sum);
                        continue;
                    }

                    let piece = bufs.take(block_len - self.filled);
                    self.weak.update(piece);
                    self.strong.update(piece);
                    self.filled += piece.len();

                    if self.filled == block_len || (bufs.eof() && self.filled > 0) {
                        self.emit_partial();
                    } else if bufs.eof() {
                        self.state = State::Done;
                        log::debug!("{}", self.stats);
                    } else {
                        return Ok(JobStatus::NeedMoreInput);
                    }
                }
                State::Done => return Ok(JobStatus::Done),
                State::Failed => return Err(Error::aborted("signature")),
            }
        }
    }
}

impl Job for SignatureJob {
    fn drive(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        let start = Instant::now();
        let (in0, out0) = (bufs.consumed(), bufs.produced());
        let status = if self.state == State::Failed {
            Err(Error::aborted("signature"))
        } else {
            self.step(bufs)
        };
        if status.is_err() {
            self.state = State::Failed;
        }
        self.stats
            .account(bufs.consumed() - in0, bufs.produced() - out0, start);
        status
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::header::SIG_MAGIC;
    use crate::hash::rolling::weak_sum;
    use crate::hash::strong::StrongSum;

    fn run(job: &mut SignatureJob, input: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; 4096];
        let mut bufs = Buffers::new(input, true, &mut out);
        assert_eq!(job.drive(&mut bufs).unwrap(), JobStatus::Done);
        let n = bufs.produced();
        out.truncate(n);
        out
    }

    #[test]
    fn empty_basis_is_header_only() {
        let mut job = SignatureJob::new(SignatureOptions::new(16, 8).unwrap()).unwrap();
        let out = run(&mut job, b"");
        assert_eq!(out.len(), SIG_HEADER_LEN);
        assert_eq!(&out[..4], SIG_MAGIC.to_be_bytes());
        assert_eq!(job.stats().sig_blocks, 0);
    }

    #[test]
    fn records_follow_header() {
        let basis: Vec<u8> = (0..40u8).collect();
        let mut job = SignatureJob::new(SignatureOptions::new(16, 4).unwrap()).unwrap();
        let out = run(&mut job, &basis);
        assert_eq!(out.len(), SIG_HEADER_LEN + 3 * 8);

        let rec = &out[SIG_HEADER_LEN + 16..SIG_HEADER_LEN + 24];
        assert_eq!(&rec[..4], weak_sum(&basis[32..]).to_be_bytes());
        assert_eq!(&rec[4..], StrongSum::compute(&basis[32..], 4).as_bytes());
        assert_eq!(job.stats().sig_blocks, 3);
        assert_eq!(job.stats().in_bytes, 40);
        assert_eq!(job.stats().out_bytes, out.len() as u64);
    }

    #[test]
    fn byte_at_a_time_matches_one_shot() {
        let basis: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 251) as u8).collect();
        let opts = SignatureOptions::new(64, 8).unwrap();
        let expected = run(&mut SignatureJob::new(opts).unwrap(), &basis);

        let mut job = SignatureJob::new(opts).unwrap();
        let mut got = Vec::new();
        let mut fed = 0;
        loop {
            let eof = fed == basis.len();
            let input = &basis[fed..(fed + 1).min(basis.len())];
            let mut out = [0u8; 3];
            let mut bufs = Buffers::new(input, eof, &mut out);
            let status = job.drive(&mut bufs).unwrap();
            fed += bufs.consumed();
            let n = bufs.produced();
            got.extend_from_slice(&out[..n]);
            if status == JobStatus::Done {
                break;
            }
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn huge_block_split_across_calls() {
        let opts = SignatureOptions::new(u32::MAX as usize, 8).unwrap();
        let mut job = SignatureJob::new(opts).unwrap();
        let mut out = vec![0u8; 64];
        let mut produced = 0;
        for (chunk, eof) in [(&b"tiny "[..], false), (&b""[..], false), (&b"basis"[..], true)] {
            let mut bufs = Buffers::new(chunk, eof, &mut out[produced..]);
            let status = job.drive(&mut bufs).unwrap();
            assert_eq!(bufs.consumed(), chunk.len());
            produced += bufs.produced();
            let want = if eof { JobStatus::Done } else { JobStatus::NeedMoreInput };
            assert_eq!(status, want);
        }
        assert_eq!(produced, SIG_HEADER_LEN + 12);
        let rec = &out[SIG_HEADER_LEN..produced];
        assert_eq!(&rec[..4], weak_sum(b"tiny basis").to_be_bytes());
        assert_eq!(&rec[4..], StrongSum::compute(b"tiny basis", 8).as_bytes());
        assert_eq!(job.stats().sig_blocks, 1);
    }

    #[test]
    fn rejects_bad_options() {
        let opts = SignatureOptions {
            block_len: 0,
            strong_len: 8,
        };
        assert!(matches!(SignatureJob::new(opts), Err(Error::InvalidConfig(_))));
    }
}
