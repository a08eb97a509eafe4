// In-memory conveniences.
//
// Each function runs the corresponding streaming job over byte slices, so
// results are identical to the streaming path:
//   - signature:       basis → signature stream
//   - load_signature:  signature stream → Signature
//   - delta:           Signature + new → delta stream
//   - patch:           basis + delta stream → new

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::delta::{DeltaJob, PatchJob};
use crate::error::Result;
use crate::hash::config::SignatureOptions;
use crate::io::run_job;
use crate::signature::{LoadSignatureJob, Signature, SignatureJob};

/// Signature stream of `basis`.
pub fn signature(basis: &[u8], opts: SignatureOptions) -> Result<Vec<u8>> {
    let mut job = SignatureJob::new(opts)?;
    let blocks = opts.block_count(basis.len() as u64) as usize;
    let mut out = Vec::with_capacity(12 + blocks.saturating_mul(4 + opts.strong_len));
    run_job(&mut job, basis, &mut out)?;
    Ok(out)
}

/// Parse and index a signature stream.
pub fn load_signature(sig: &[u8]) -> Result<Signature> {
    let mut job = LoadSignatureJob::new();
    run_job(&mut job, sig, std::io::sink())?;
    job.finish()
}

/// Delta stream turning the basis behind `sig` into `new`.
pub fn delta(sig: &Signature, new: &[u8]) -> Result<Vec<u8>> {
    let mut job = DeltaJob::new(sig);
    let mut out = Vec::new();
    run_job(&mut job, new, &mut out)?;
    Ok(out)
}

/// Apply `delta` to `basis`.
pub fn patch(basis: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut job = PatchJob::new(basis);
    let mut out = Vec::new();
    run_job(&mut job, delta, &mut out)?;
    Ok(out)
}

/// Deltas of many inputs against one shared signature, computed in
/// parallel. Results keep the order of `inputs`.
#[cfg(feature = "parallel")]
pub fn delta_batch(sig: &Signature, inputs: &[&[u8]]) -> Vec<Result<Vec<u8>>> {
    inputs.par_iter().map(|new| delta(sig, new)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
