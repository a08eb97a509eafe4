// PatchJob: delta stream in, reconstructed data out.
//
// Commands are decoded one at a time. Literal payload moves straight from
// the input window to the output window; COPY ranges are read from the
// basis directly into the output window. Neither is staged, so memory use
// does not depend on command sizes.

use std::time::Instant;

use super::basis::Basis;
use crate::error::{Error, Result};
use crate::format::command::{COMMAND_TABLE, Instruction, MAX_COMMAND_LEN, decode_params};
use crate::format::header::{DELTA_HEADER_LEN, check_delta_header};
use crate::job::{Buffers, Job, JobStatus, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Command,
    Params { op: u8, need: usize },
    Literal { remaining: u64 },
    Copy { offset: u64, remaining: u64 },
    Done,
    Failed,
}

/// Applies a delta stream to a basis.
///
/// COPY ranges are checked against the basis length before any byte of
/// them is produced. Checksums are not verified; the delta is trusted to
/// belong to this basis. After an error every further `drive` fails.
#[derive(Debug)]
pub struct PatchJob<B> {
    basis: B,
    basis_len: u64,
    state: State,
    /// Header or command parameters carried between calls.
    params: [u8; MAX_COMMAND_LEN],
    have: usize,
    stats: Stats,
}

impl<B: Basis> PatchJob<B> {
    pub fn new(basis: B) -> Self {
        let basis_len = basis.len();
        Self {
            basis,
            basis_len,
            state: State::Header,
            params: [0; MAX_COMMAND_LEN],
            have: 0,
            stats: Stats::new("patch"),
        }
    }

    pub fn into_basis(self) -> B {
        self.basis
    }

    /// Fill `params[..need]` from the input. True once full.
    fn fill(&mut self, bufs: &mut Buffers<'_>, need: usize) -> bool {
        let got = bufs.take(need - self.have);
        self.params[self.have..self.have + got.len()].copy_from_slice(got);
        self.have += got.len();
        self.have == need
    }

    fn begin(&mut self, inst: Instruction, cmd_len: u64) -> Result<()> {
        match inst {
            Instruction::Literal { len } => {
                self.stats.lit_cmds += 1;
                self.stats.lit_bytes += len;
                self.stats.lit_cmdbytes += cmd_len;
                self.state = State::Literal { remaining: len };
                log::trace!("LITERAL {len}");
            }
            Instruction::Copy { offset, len } => {
                if offset
                    .checked_add(len)
                    .is_none_or(|end| end > self.basis_len)
                {
                    return Err(Error::corrupt(format!(
                        "copy of {len} bytes at offset {offset} reaches past basis end {}",
                        self.basis_len
                    )));
                }
                self.stats.copy_cmds += 1;
                self.stats.copy_bytes += len;
                self.stats.copy_cmdbytes += cmd_len;
                self.state = State::Copy {
                    offset,
                    remaining: len,
                };
                log::trace!("COPY {offset} {len}");
            }
        }
        Ok(())
    }

    fn step(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        loop {
            match self.state {
                State::Header => {
                    if !self.fill(bufs, DELTA_HEADER_LEN) {
                        return starved(bufs, || "delta header truncated".into());
                    }
                    let [a, b, c, d, ..] = self.params;
                    check_delta_header(&[a, b, c, d])?;
                    self.have = 0;
                    self.state = State::Command;
                    log::debug!("patch: basis of {} bytes", self.basis_len);
                }
                State::Command => {
                    let Some(op) = bufs.take_byte() else {
                        return starved(bufs, || "delta ends without END command".into());
                    };
                    let need = COMMAND_TABLE[op as usize].param_len();
                    self.have = 0;
                    self.state = State::Params { op, need };
                }
                State::Params { op, need } => {
                    if !self.fill(bufs, need) {
                        let have = self.have;
                        return starved(bufs, || {
                            format!("command {op:#04x} truncated: {have} of {need} parameter bytes")
                        });
                    }
                    let inst = decode_params(op, &self.params[..need])?;
                    self.have = 0;
                    match inst {
                        Some(inst) => self.begin(inst, 1 + need as u64)?,
                        None => {
                            self.state = State::Done;
                            log::debug!("{}", self.stats);
                        }
                    }
                }
                State::Literal { remaining } => {
                    if remaining == 0 {
                        self.state = State::Command;
                        continue;
                    }
                    if bufs.avail_out() == 0 {
                        return Ok(JobStatus::OutputFull);
                    }
                    let n = remaining.min(bufs.avail_out() as u64) as usize;
                    let data = bufs.take(n);
                    if data.is_empty() {
                        return starved(bufs, || {
                            format!("literal truncated with {remaining} bytes missing")
                        });
                    }
                    bufs.write(data);
                    self.state = State::Literal {
                        remaining: remaining - data.len() as u64,
                    };
                }
                State::Copy { offset, remaining } => {
                    if remaining == 0 {
                        self.state = State::Command;
                        continue;
                    }
                    if bufs.avail_out() == 0 {
                        return Ok(JobStatus::OutputFull);
                    }
                    let out = bufs.output_mut();
                    let n = remaining.min(out.len() as u64) as usize;
                    let got = self.basis.read_at(offset, &mut out[..n])?;
                    if got == 0 {
                        return Err(Error::corrupt(format!(
                            "basis ended at offset {offset} with {remaining} copy bytes outstanding"
                        )));
                    }
                    bufs.advance_out(got);
                    self.state = State::Copy {
                        offset: offset + got as u64,
                        remaining: remaining - got as u64,
                    };
                }
                State::Done => return Ok(JobStatus::Done),
                State::Failed => return Err(Error::aborted("patch")),
            }
        }
    }
}

/// Out of input: wait for more, or fail if there is none.
fn starved(bufs: &Buffers<'_>, what: impl FnOnce() -> String) -> Result<JobStatus> {
    if bufs.eof() {
        Err(Error::corrupt(what()))
    } else {
        Ok(JobStatus::NeedMoreInput)
    }
}

impl<B: Basis> Job for PatchJob<B> {
    fn drive(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        let start = Instant::now();
        let (in0, out0) = (bufs.consumed(), bufs.produced());
        let status = if self.state == State::Failed {
            Err(Error::aborted("patch"))
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
