// Command emission for the delta encoder.
//
// The encoder reports matches and literal runs in stream order; this stage
// turns them into wire commands:
//   - Coalesce a COPY into the pending one when its basis range follows on
//   - Split literal runs at MAX_LITERAL_RUN
//   - Skip empty runs
//
// A COPY stays pending until something that cannot extend it arrives, so
// output order always equals input order.

use crate::format::command;
use crate::job::{Stats, Tube};

/// Longest literal run the encoder holds before emitting it.
pub const MAX_LITERAL_RUN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCopy {
    offset: u64,
    len: u64,
}

/// Encodes commands into a tube, coalescing contiguous copies.
#[derive(Debug, Default)]
pub struct CommandWriter {
    tube: Tube,
    pending: Option<PendingCopy>,
}

impl CommandWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tube(&mut self) -> &mut Tube {
        &mut self.tube
    }

    /// Queue `len` basis bytes starting at `offset`.
    pub fn copy(&mut self, offset: u64, len: u64, stats: &mut Stats) {
        if let Some(p) = &mut self.pending
            && p.offset + p.len == offset
        {
            p.len += len;
            return;
        }
        self.flush_copy(stats);
        self.pending = Some(PendingCopy { offset, len });
    }

    /// Emit `data` as literal commands, after any pending copy.
    pub fn literal(&mut self, data: &[u8], stats: &mut Stats) {
        if data.is_empty() {
            return;
        }
        self.flush_copy(stats);
        for run in data.chunks(MAX_LITERAL_RUN) {
            let out = self.tube.buf_mut();
            let head = command::encode_literal(out, run.len() as u64);
            out.extend_from_slice(run);
            stats.lit_cmds += 1;
            stats.lit_bytes += run.len() as u64;
            stats.lit_cmdbytes += head as u64;
            log::trace!("LITERAL {}", run.len());
        }
    }

    /// Emit the pending copy, if any.
    pub fn flush_copy(&mut self, stats: &mut Stats) {
        if let Some(PendingCopy { offset, len }) = self.pending.take() {
            let head = command::encode_copy(self.tube.buf_mut(), offset, len);
            stats.copy_cmds += 1;
            stats.copy_bytes += len;
            stats.copy_cmdbytes += head as u64;
            log::trace!("COPY {offset} {len}");
        }
    }

    /// Flush everything and terminate the stream.
    pub fn end(&mut self, stats: &mut Stats) {
        self.flush_copy(stats);
        command::encode_end(self.tube.buf_mut());
    }
}
