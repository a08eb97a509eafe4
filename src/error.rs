// Error type shared by every job and helper in the crate.
//
// Each variant is terminal for the job that produced it: nothing inside the
// engine retries. Drivers decide whether to rerun the whole operation.

use std::collections::TryReserveError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by signature, delta and patch jobs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A byte source, byte sink or basis reader reported a failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed stream: bad header field, truncated command or record,
    /// reserved opcode, or a COPY that reaches past the end of the basis.
    #[error("corrupt input: {0}")]
    CorruptInput(String),

    /// The stream header carries a magic number this crate does not speak.
    #[error("unsupported format: unknown magic {magic:#010x}")]
    UnsupportedFormat { magic: u32 },

    /// An allocation for the signature, its index, or a job buffer failed.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Job parameters rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::warn!("corrupt input: {msg}");
        Self::CorruptInput(msg)
    }

    /// Returned by every `drive` after the job has already failed once.
    pub(crate) fn aborted(op: &str) -> Self {
        Self::CorruptInput(format!("{op} job already failed"))
    }

    pub(crate) fn exhausted(what: &str, err: TryReserveError) -> Self {
        Self::ResourceExhausted(format!("{what}: {err}"))
    }

    /// True for errors caused by the content of an input stream rather than
    /// by the environment.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptInput(_) | Self::UnsupportedFormat { .. })
    }
}
