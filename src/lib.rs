//! rsdelta: rsync-algorithm signatures, deltas and patches in Rust.
//!
//! The crate provides:
//! - Rolling and strong block checksums (`hash`)
//! - Signature generation, loading and indexing (`signature`)
//! - Delta encoding and patching (`delta`)
//! - The wire format of both streams (`format`)
//! - Resumable streaming jobs and their driver (`job`, `io`)
//! - In-memory conveniences (`engine`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use rsdelta::{engine, SignatureOptions};
//!
//! let basis = b"hello old world, hello old world";
//! let new = b"hello new world, hello old world";
//!
//! let sig = engine::signature(basis, SignatureOptions::new(8, 8).unwrap()).unwrap();
//! let sig = engine::load_signature(&sig).unwrap();
//! let delta = engine::delta(&sig, new).unwrap();
//! let rebuilt = engine::patch(basis, &delta).unwrap();
//! assert_eq!(rebuilt, new);
//! ```

pub mod delta;
pub mod engine;
pub mod error;
pub mod format;
pub mod hash;
pub mod io;
pub mod job;
pub mod signature;

#[cfg(feature = "cli")]
pub mod cli;

pub use delta::{Basis, DeltaJob, PatchJob, SeekBasis};
pub use error::{Error, Result};
pub use hash::config::SignatureOptions;
pub use job::{Buffers, Job, JobStatus, Stats};
pub use signature::{LoadSignatureJob, Signature, SignatureJob};
