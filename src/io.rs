// Whole-stream drivers.
//
// `run_job` owns a pair of buffers and pumps any job between a reader and a
// writer until it reports `Done`. The `*_file` helpers build the right job
// for each operation and run it, returning the job's statistics. With the
// `file-io` feature they also compute a streaming SHA-256 of what they
// wrote.

use std::io::{self, Read, Write};

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::delta::{Basis, DeltaJob, PatchJob};
use crate::error::{Error, Result};
use crate::hash::config::SignatureOptions;
use crate::job::{Buffers, Job, JobStatus, Stats};
use crate::signature::{LoadSignatureJob, Signature, SignatureJob};

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

pub const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// What a whole-stream helper reports.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Counters from the job.
    pub job: Stats,
    /// SHA-256 of everything written (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Driver loop
// ---------------------------------------------------------------------------

/// Run `job` to completion, feeding it from `reader` and draining it into
/// `writer`, with 64 KiB buffers on each side.
pub fn run_job<J, R, W>(job: &mut J, reader: R, writer: W) -> Result<()>
where
    J: Job + ?Sized,
    R: Read,
    W: Write,
{
    run_job_with(job, reader, writer, BUF_SIZE, BUF_SIZE)
}

/// [`run_job`] with explicit buffer sizes (each at least 1 byte).
pub fn run_job_with<J, R, W>(
    job: &mut J,
    mut reader: R,
    mut writer: W,
    in_size: usize,
    out_size: usize,
) -> Result<()>
where
    J: Job + ?Sized,
    R: Read,
    W: Write,
{
    let mut inbuf = vec![0u8; in_size.max(1)];
    let mut outbuf = vec![0u8; out_size.max(1)];
    let (mut start, mut end) = (0usize, 0usize);
    let mut eof = false;
    let mut calls = 0u64;

    loop {
        let mut bufs = Buffers::new(&inbuf[start..end], eof, &mut outbuf);
        let status = job.drive(&mut bufs)?;
        let (consumed, produced) = (bufs.consumed(), bufs.produced());
        calls += 1;

        start += consumed;
        writer.write_all(&outbuf[..produced])?;

        match status {
            JobStatus::Done => break,
            JobStatus::OutputFull => {}
            JobStatus::NeedMoreInput => {
                if eof {
                    return Err(Error::corrupt("job wants input past end of stream"));
                }
                inbuf.copy_within(start..end, 0);
                end -= start;
                start = 0;
                debug_assert!(end < inbuf.len(), "job left its input window full");
                let n = read_some(&mut reader, &mut inbuf[end..])?;
                if n == 0 {
                    eof = true;
                } else {
                    end += n;
                }
            }
        }
    }

    writer.flush()?;
    log::trace!("{} finished after {calls} drive calls", job.stats().op);
    Ok(())
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Run `job`, hashing its output when the `file-io` feature is enabled.
fn run_hashed<J, R, W>(job: &mut J, reader: R, writer: W) -> Result<RunStats>
where
    J: Job,
    R: Read,
    W: Write,
{
    #[cfg(feature = "file-io")]
    let output_sha256 = {
        let mut hasher = sha2::Sha256::new();
        run_job(job, reader, HashingWriter {
            inner: writer,
            hasher: &mut hasher,
        })?;
        Some(hasher.finalize().into())
    };

    #[cfg(not(feature = "file-io"))]
    let output_sha256 = {
        run_job(job, reader, writer)?;
        None
    };

    Ok(RunStats {
        job: job.stats().clone(),
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Write the signature of `basis` to `sig_out`.
pub fn signature_file<R: Read, W: Write>(
    basis: R,
    sig_out: W,
    opts: SignatureOptions,
) -> Result<RunStats> {
    let mut job = SignatureJob::new(opts)?;
    run_hashed(&mut job, basis, sig_out)
}

/// Read and index a signature stream.
pub fn load_signature_file<R: Read>(sig_in: R) -> Result<(Signature, Stats)> {
    let mut job = LoadSignatureJob::new();
    run_job(&mut job, sig_in, io::sink())?;
    let stats = job.stats().clone();
    Ok((job.finish()?, stats))
}

/// Write the delta of `new` against `sig` to `delta_out`.
pub fn delta_file<R: Read, W: Write>(sig: &Signature, new: R, delta_out: W) -> Result<RunStats> {
    let mut job = DeltaJob::new(sig);
    run_hashed(&mut job, new, delta_out)
}

/// Apply the delta read from `delta` to `basis`, writing the result to `out`.
pub fn patch_file<B: Basis, R: Read, W: Write>(basis: B, delta: R, out: W) -> Result<RunStats> {
    let mut job = PatchJob::new(basis);
    run_hashed(&mut job, delta, out)
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::SeekBasis;
    use std::io::{Cursor, Seek, SeekFrom};

    fn sample(len: usize, seed: u32) -> Vec<u8> {
        (0..len as u32)
            .map(|i| (i.wrapping_mul(2_654_435_761).wrapping_add(seed) >> 13) as u8)
            .collect()
    }

    #[test]
    fn file_roundtrip_through_temp_files() {
        let basis = sample(300_000, 1);
        let mut new = basis.clone();
        new.splice(1000..1000, b"inserted text".iter().copied());
        new.truncate(250_000);

        let mut basis_file = tempfile::tempfile().unwrap();
        basis_file.write_all(&basis).unwrap();
        basis_file.seek(SeekFrom::Start(0)).unwrap();

        let mut sig_bytes = Vec::new();
        let sig_stats =
            signature_file(&mut basis_file, &mut sig_bytes, SignatureOptions::default()).unwrap();
        assert_eq!(sig_stats.job.in_bytes, basis.len() as u64);
        assert_eq!(sig_stats.job.out_bytes, sig_bytes.len() as u64);

        let (sig, load_stats) = load_signature_file(sig_bytes.as_slice()).unwrap();
        assert_eq!(load_stats.sig_blocks, sig.len() as u64);

        let mut delta = Vec::new();
        let delta_stats = delta_file(&sig, new.as_slice(), &mut delta).unwrap();
        assert!(delta.len() < new.len() / 4, "delta of {} bytes", delta.len());
        assert!(delta_stats.job.copy_cmds >= 1);

        let mut out = Vec::new();
        patch_file(SeekBasis::new(basis_file).unwrap(), delta.as_slice(), &mut out).unwrap();
        assert_eq!(out, new);
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn sha256_of_patch_output_matches_new_data() {
        let basis = sample(10_000, 2);
        let new = sample(12_000, 3);
        let sig = crate::engine::signature(&basis, SignatureOptions::default()).unwrap();
        let (sig, _) = load_signature_file(sig.as_slice()).unwrap();
        let mut delta = Vec::new();
        delta_file(&sig, new.as_slice(), &mut delta).unwrap();

        let stats = patch_file(basis.as_slice(), delta.as_slice(), io::sink()).unwrap();
        let expected: [u8; 32] = sha2::Sha256::digest(&new).into();
        assert_eq!(stats.output_sha256, Some(expected));
    }

    #[test]
    fn tiny_buffers_give_identical_output() {
        let basis = sample(5000, 4);
        let mut new = basis.clone();
        new[2500..2600].fill(0xEE);
        let sig = Signature::from_basis(&basis, SignatureOptions::new(64, 8).unwrap()).unwrap();

        let mut big = Vec::new();
        run_job(&mut DeltaJob::new(&sig), new.as_slice(), &mut big).unwrap();
        let mut small = Vec::new();
        run_job_with(&mut DeltaJob::new(&sig), new.as_slice(), &mut small, 1, 1).unwrap();
        assert_eq!(big, small);
    }

    #[test]
    fn truncated_delta_reports_corruption() {
        let basis = sample(4096, 5);
        let sig = Signature::from_basis(&basis, SignatureOptions::new(512, 8).unwrap()).unwrap();
        let mut delta = Vec::new();
        delta_file(&sig, basis.as_slice(), &mut delta).unwrap();
        delta.pop();

        let err = patch_file(basis.as_slice(), delta.as_slice(), io::sink()).unwrap_err();
        assert!(matches!(err, Error::CorruptInput(_)));
    }

    #[test]
    fn reader_errors_surface_as_io() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }
        let err = signature_file(Broken, io::sink(), SignatureOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn writer_errors_surface_as_io() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("no space left"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let basis = sample(5000, 9);
        let sig = Signature::from_basis(&basis, SignatureOptions::new(256, 8).unwrap()).unwrap();
        let mut job = DeltaJob::new(&sig);
        let err = run_job(&mut job, &basis[100..], Full).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "{err}");
        // The first write is the header, before any input was read.
        assert_eq!(job.stats().out_bytes, 4);
        assert_eq!(job.stats().in_bytes, 0);
    }

    #[test]
    fn cursor_basis_works_for_patch() {
        let basis = sample(2000, 6);
        let sig = Signature::from_basis(&basis, SignatureOptions::new(100, 8).unwrap()).unwrap();
        let mut delta = Vec::new();
        delta_file(&sig, &basis[500..1500], &mut delta).unwrap();
        let mut out = Vec::new();
        patch_file(
            SeekBasis::new(Cursor::new(basis.clone())).unwrap(),
            delta.as_slice(),
            &mut out,
        )
        .unwrap();
        assert_eq!(out, &basis[500..1500]);
    }
}
