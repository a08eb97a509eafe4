// Resumable streaming jobs.
//
// A job is a state machine driven by repeated `drive` calls. Each call hands
// it a window of input and a window of free output space; the job consumes
// and produces what it can, then says why it stopped. Jobs never do I/O of
// their own and never block, so the same job runs under a blocking loop
// (`crate::io::run_job`), an event loop, or a hand-written driver.
//
// - `stats`: per-job counters
// - `tube`: output a job has produced but not yet placed

pub mod stats;
pub mod tube;

pub use stats::Stats;
pub use tube::Tube;

use crate::error::Result;

/// Why `drive` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Every input byte was consumed and more are needed. Never returned
    /// once the caller has signalled end of input.
    NeedMoreInput,
    /// The output window is full; call again with more space.
    OutputFull,
    /// The job finished and all of its output has been placed.
    Done,
}

/// Input and output windows for one `drive` call.
///
/// The job advances the read and write cursors; afterwards the caller reads
/// `consumed()` and `produced()` to learn how far each moved.
#[derive(Debug)]
pub struct Buffers<'a> {
    input: &'a [u8],
    in_pos: usize,
    eof: bool,
    output: &'a mut [u8],
    out_pos: usize,
}

impl<'a> Buffers<'a> {
    /// `eof` says that `input` holds the last bytes the source will supply.
    pub fn new(input: &'a [u8], eof: bool, output: &'a mut [u8]) -> Self {
        Self {
            input,
            in_pos: 0,
            eof,
            output,
            out_pos: 0,
        }
    }

    /// Unconsumed input.
    #[inline]
    pub fn input(&self) -> &'a [u8] {
        let input: &'a [u8] = self.input;
        &input[self.in_pos..]
    }

    #[inline]
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Input bytes consumed so far in this call.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.in_pos
    }

    /// Output bytes written so far in this call.
    #[inline]
    pub fn produced(&self) -> usize {
        self.out_pos
    }

    /// Free output space.
    #[inline]
    pub fn avail_out(&self) -> usize {
        self.output.len() - self.out_pos
    }

    /// Consume up to `max` input bytes.
    #[inline]
    pub fn take(&mut self, max: usize) -> &'a [u8] {
        let rest = self.input();
        let n = max.min(rest.len());
        self.in_pos += n;
        &rest[..n]
    }

    /// Consume one input byte.
    #[inline]
    pub fn take_byte(&mut self) -> Option<u8> {
        let b = *self.input().first()?;
        self.in_pos += 1;
        Some(b)
    }

    /// Copy as much of `bytes` as fits into the output. Returns the count.
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.avail_out());
        self.output[self.out_pos..self.out_pos + n].copy_from_slice(&bytes[..n]);
        self.out_pos += n;
        n
    }

    /// Free output space, for jobs that fill it directly. Follow with
    /// [`Buffers::advance_out`].
    #[inline]
    pub fn output_mut(&mut self) -> &mut [u8] {
        &mut self.output[self.out_pos..]
    }

    #[inline]
    pub fn advance_out(&mut self, n: usize) {
        debug_assert!(n <= self.avail_out());
        self.out_pos += n;
    }
}

/// A resumable streaming operation.
///
/// Calling `drive` again after `NeedMoreInput` or `OutputFull` continues
/// exactly where the previous call stopped. An error is terminal: the job
/// must not be driven again.
pub trait Job {
    fn drive(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus>;

    /// Counters so far; final once `drive` has returned `Done` or an error.
    fn stats(&self) -> &Stats;
}

impl<J: Job + ?Sized> Job for &mut J {
    fn drive(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        (**self).drive(bufs)
    }

    fn stats(&self) -> &Stats {
        (**self).stats()
    }
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn drive(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        (**self).drive(bufs)
    }

    fn stats(&self) -> &Stats {
        (**self).stats()
    }
}
