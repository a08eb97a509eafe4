// DeltaJob: new bytes in, delta stream out.
//
// Input is staged in the scoop:
//
//   scoop[..lit_start]          already emitted, dropped on the next refill
//   scoop[lit_start..pos]       pending literal run
//   scoop[pos..pos + block_len] window covered by the rolling checksum
//   scoop[pos + block_len..]    lookahead
//
// A match emits the pending literal and a COPY, then restarts the window
// just past the matched block. A miss slides the window one byte, which
// moves that byte into the literal run. The scoop grows with the input and
// never holds more than MAX_LITERAL_RUN + block_len bytes.
//
// At end of input the window shrinks from the front one byte at a time and
// every shorter window is searched, so a final short basis block can still
// be matched.

use std::time::Instant;

use super::pipeline::{CommandWriter, MAX_LITERAL_RUN};
use crate::error::{Error, Result};
use crate::format::header::encode_delta_header;
use crate::hash::matching::BlockMatcher;
use crate::hash::rolling::RollingChecksum;
use crate::job::{Buffers, Job, JobStatus, Stats};
use crate::signature::Signature;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Scan,
    Tail,
    Done,
    Failed,
}

/// Streams the delta of new data against a signature.
///
/// Borrows the signature for its lifetime; one signature can serve any
/// number of concurrent jobs.
#[derive(Debug)]
pub struct DeltaJob<'s> {
    matcher: BlockMatcher<'s>,
    block_len: usize,
    state: State,
    scoop: Vec<u8>,
    cap: usize,
    lit_start: usize,
    pos: usize,
    sum: RollingChecksum,
    /// The full window at `pos` has already been searched.
    checked: bool,
    writer: CommandWriter,
    stats: Stats,
}

impl<'s> DeltaJob<'s> {
    pub fn new(sig: &'s Signature) -> Self {
        let block_len = sig.block_len();
        let mut stats = Stats::new("delta");
        stats.block_len = block_len as u64;
        Self {
            matcher: BlockMatcher::new(sig),
            block_len,
            state: State::Header,
            scoop: Vec::new(),
            cap: MAX_LITERAL_RUN.saturating_add(block_len),
            lit_start: 0,
            pos: 0,
            sum: RollingChecksum::new(),
            checked: false,
            writer: CommandWriter::new(),
            stats,
        }
    }

    pub fn signature(&self) -> &'s Signature {
        self.matcher.signature()
    }

    fn flush_literal(&mut self) {
        let run = &self.scoop[self.lit_start..self.pos];
        self.writer.literal(run, &mut self.stats);
        self.lit_start = self.pos;
    }

    /// Emit the pending literal and a COPY of block `ordinal`, covering the
    /// `len` bytes at `pos`.
    fn emit_match(&mut self, ordinal: u32, len: usize) {
        self.flush_literal();
        let offset = self.matcher.signature().offset_of(ordinal);
        self.writer.copy(offset, len as u64, &mut self.stats);
        self.pos += len;
        self.lit_start = self.pos;
        self.sum.reset();
        self.checked = false;
    }

    /// Drop emitted bytes and append input up to the scoop's capacity. The
    /// scoop only grows by what actually arrives.
    fn refill(&mut self, bufs: &mut Buffers<'_>) -> Result<()> {
        if self.lit_start > 0 {
            self.scoop.drain(..self.lit_start);
            self.pos -= self.lit_start;
            self.lit_start = 0;
        }
        let room = self.cap - self.scoop.len();
        debug_assert!(room > 0);
        let chunk = bufs.take(room);
        self.scoop
            .try_reserve(chunk.len())
            .map_err(|e| Error::exhausted("delta input buffer", e))?;
        self.scoop.extend_from_slice(chunk);
        Ok(())
    }

    /// Search full windows through the scoop. True once something was
    /// emitted; false when more input is needed to go on.
    fn scan(&mut self) -> bool {
        let block_len = self.block_len;

        if self.matcher.signature().is_empty() {
            self.pos = self.scoop.len().min(self.lit_start + MAX_LITERAL_RUN);
            if self.pos - self.lit_start == MAX_LITERAL_RUN {
                self.flush_literal();
                return true;
            }
            return false;
        }

        loop {
            if self.sum.is_empty() {
                if self.scoop.len() - self.pos < block_len {
                    return false;
                }
                self.sum.update(&self.scoop[self.pos..self.pos + block_len]);
                self.checked = false;
            }

            if !self.checked {
                let window = &self.scoop[self.pos..self.pos + block_len];
                if let Some(ordinal) = self.matcher.search(self.sum.digest(), window) {
                    self.emit_match(ordinal, block_len);
                    return true;
                }
                self.checked = true;
            }

            let next = self.pos + block_len;
            if next >= self.scoop.len() {
                return false;
            }
            self.sum.rotate(self.scoop[self.pos], self.scoop[next]);
            self.pos += 1;
            self.checked = false;

            if self.pos - self.lit_start >= MAX_LITERAL_RUN {
                self.flush_literal();
                return true;
            }
        }
    }

    /// Search the shrinking final window. True once something was emitted;
    /// false when every byte has been placed.
    fn tail(&mut self) -> bool {
        if self.matcher.signature().is_empty() {
            self.pos = self.scoop.len();
            return false;
        }

        while self.pos < self.scoop.len() {
            if self.sum.is_empty() {
                self.sum.update(&self.scoop[self.pos..]);
                self.checked = false;
            }

            if !self.checked {
                let window = &self.scoop[self.pos..];
                if let Some(ordinal) = self.matcher.search(self.sum.digest(), window) {
                    let len = self.scoop.len() - self.pos;
                    self.emit_match(ordinal, len);
                    return true;
                }
            }

            self.sum.roll_out(self.scoop[self.pos]);
            self.pos += 1;
            self.checked = false;

            if self.pos - self.lit_start >= MAX_LITERAL_RUN {
                self.flush_literal();
                return true;
            }
        }
        false
    }

    fn step(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        loop {
            if !self.writer.tube().drain(bufs) {
                return Ok(JobStatus::OutputFull);
            }
            match self.state {
                State::Header => {
                    encode_delta_header(self.writer.tube().buf_mut());
                    self.state = State::Scan;
                    log::debug!(
                        "delta: {} blocks of {} bytes",
                        self.matcher.signature().len(),
                        self.block_len
                    );
                }
                State::Scan => {
                    if self.scan() {
                        continue;
                    }
                    if !bufs.input().is_empty() {
                        self.refill(bufs)?;
                    } else if bufs.eof() {
                        self.state = State::Tail;
                    } else {
                        return Ok(JobStatus::NeedMoreInput);
                    }
                }
                State::Tail => {
                    if self.tail() {
                        continue;
                    }
                    self.flush_literal();
                    self.writer.end(&mut self.stats);
                    self.scoop = Vec::new();
                    self.state = State::Done;
                    self.stats.false_matches = self.matcher.false_matches();
                    log::debug!("{}", self.stats);
                }
                State::Done => return Ok(JobStatus::Done),
                State::Failed => return Err(Error::aborted("delta")),
            }
        }
    }
}

impl Job for DeltaJob<'_> {
    fn drive(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        let start = Instant::now();
        let (in0, out0) = (bufs.consumed(), bufs.produced());
        let status = if self.state == State::Failed {
            Err(Error::aborted("delta"))
        } else {
            self.step(bufs)
        };
        if status.is_err() {
            self.state = State::Failed;
        }
        self.stats.false_matches = self.matcher.false_matches();
        self.stats
            .account(bufs.consumed() - in0, bufs.produced() - out0, start);
        status
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
