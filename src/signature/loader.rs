// LoadSignatureJob: signature stream in, indexed Signature out.

use std::time::Instant;

use super::{BlockSum, Signature};
use crate::error::{Error, Result};
use crate::format::header::{SIG_HEADER_LEN, SignatureHeader, sig_record_len};
use crate::format::netint;
use crate::hash::strong::StrongSum;
use crate::job::{Buffers, Job, JobStatus, Stats};

#[derive(Debug)]
enum State {
    Header,
    Records(SignatureHeader),
    Done(Signature),
    Taken,
    Failed,
}

/// Reads a signature stream and builds the in-memory [`Signature`].
///
/// Produces no output. Once `drive` returns `Done`, collect the result with
/// [`LoadSignatureJob::finish`].
#[derive(Debug)]
pub struct LoadSignatureJob {
    state: State,
    /// Partial header or record carried between calls.
    partial: Vec<u8>,
    blocks: Vec<BlockSum>,
    stats: Stats,
}

impl Default for LoadSignatureJob {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSignatureJob {
    pub fn new() -> Self {
        Self {
            state: State::Header,
            partial: Vec::new(),
            blocks: Vec::new(),
            stats: Stats::new("loadsig"),
        }
    }

    /// The loaded signature, once the job is done.
    pub fn signature(&self) -> Option<&Signature> {
        match &self.state {
            State::Done(sig) => Some(sig),
            _ => None,
        }
    }

    /// Take the loaded signature. Fails unless `drive` has returned `Done`.
    pub fn finish(mut self) -> Result<Signature> {
        match std::mem::replace(&mut self.state, State::Taken) {
            State::Done(sig) => Ok(sig),
            _ => Err(Error::corrupt("signature stream not completely loaded")),
        }
    }

    /// Fill `partial` to `len` bytes from the input. True once full.
    fn fill(&mut self, bufs: &mut Buffers<'_>, len: usize) -> bool {
        let want = len - self.partial.len();
        self.partial.extend_from_slice(bufs.take(want));
        self.partial.len() == len
    }

    fn push_record(&mut self, rec: &[u8]) {
        let (weak, strong) = rec.split_at(4);
        let weak = netint::get_u32(&[weak[0], weak[1], weak[2], weak[3]]);
        self.blocks.push(BlockSum {
            weak,
            strong: StrongSum::from_truncated(strong),
        });
    }

    fn step(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        loop {
            match &self.state {
                State::Header => {
                    if !self.fill(bufs, SIG_HEADER_LEN) {
                        if bufs.eof() {
                            return Err(Error::corrupt(format!(
                                "signature header truncated at {} bytes",
                                self.partial.len()
                            )));
                        }
                        return Ok(JobStatus::NeedMoreInput);
                    }
                    let mut head = [0u8; SIG_HEADER_LEN];
                    head.copy_from_slice(&self.partial);
                    self.partial.clear();
                    let header = SignatureHeader::parse(&head)?;
                    self.stats.block_len = u64::from(header.block_len);
                    self.stats.sig_bytes += SIG_HEADER_LEN as u64;
                    log::debug!(
                        "loading signature: block_len {}, strong_len {}",
                        header.block_len,
                        header.strong_len
                    );
                    self.state = State::Records(header);
                }
                &State::Records(header) => {
                    let rec_len = sig_record_len(header.strong_len as usize);

                    if !self.partial.is_empty() {
                        if !self.fill(bufs, rec_len) {
                            if bufs.eof() {
                                return Err(Error::corrupt(format!(
                                    "signature ends inside a record ({} of {rec_len} bytes)",
                                    self.partial.len()
                                )));
                            }
                            return Ok(JobStatus::NeedMoreInput);
                        }
                        let rec = std::mem::take(&mut self.partial);
                        self.blocks
                            .try_reserve(1)
                            .map_err(|e| Error::exhausted("signature blocks", e))?;
                        self.push_record(&rec);
                        self.partial = rec;
                        self.partial.clear();
                    }

                    let whole = bufs.input().len() / rec_len;
                    self.blocks
                        .try_reserve(whole)
                        .map_err(|e| Error::exhausted("signature blocks", e))?;
                    for rec in bufs.take(whole * rec_len).chunks_exact(rec_len) {
                        self.push_record(rec);
                    }

                    if !bufs.input().is_empty() {
                        // Less than one record left; carry it.
                        self.fill(bufs, rec_len);
                    }

                    if !bufs.eof() {
                        return Ok(JobStatus::NeedMoreInput);
                    }
                    if !self.partial.is_empty() {
                        return Err(Error::corrupt(format!(
                            "signature ends inside a record ({} of {rec_len} bytes)",
                            self.partial.len()
                        )));
                    }

                    let blocks = std::mem::take(&mut self.blocks);
                    let count = blocks.len() as u64;
                    let sig = Signature::from_blocks(header.options(), blocks)?;
                    self.stats.sig_blocks = count;
                    self.stats.sig_bytes += count * rec_len as u64;
                    log::debug!("{}", self.stats);
                    self.state = State::Done(sig);
                }
                State::Done(_) => return Ok(JobStatus::Done),
                State::Taken => {
                    return Err(Error::corrupt("signature already taken from this job"));
                }
                State::Failed => return Err(Error::aborted("loadsig")),
            }
        }
    }
}

impl Job for LoadSignatureJob {
    fn drive(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        let start = Instant::now();
        let (in0, out0) = (bufs.consumed(), bufs.produced());
        let status = if matches!(self.state, State::Failed) {
            Err(Error::aborted("loadsig"))
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
