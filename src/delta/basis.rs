// Random-access basis reads for the patch job.
//
// COPY commands address the basis by absolute offset, so a patch needs
// positioned reads. In-memory bases slice directly; anything `Read + Seek`
// (normally a file) goes through `SeekBasis`.

use std::io::{self, Read, Seek, SeekFrom};

/// The basis a delta is applied against.
pub trait Basis {
    /// Total basis length in bytes.
    fn len(&self) -> u64;

    /// Read bytes at absolute `offset` into `buf`. Returns the count read;
    /// 0 only at or past the end.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Basis for &[u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Some(available) = usize::try_from(offset).ok().and_then(|o| self.get(o..)) else {
            return Ok(0);
        };
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }
}

impl Basis for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.as_slice().read_at(offset, buf)
    }
}

impl<B: Basis + ?Sized> Basis for &mut B {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }
}

/// A seekable reader used as a basis.
///
/// Tracks the stream position so consecutive COPYs of adjacent ranges do
/// not seek.
#[derive(Debug)]
pub struct SeekBasis<R> {
    inner: R,
    len: u64,
    pos: Option<u64>,
}

impl<R: Read + Seek> SeekBasis<R> {
    /// Wrap `inner`, measuring its length by seeking to the end.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self {
            inner,
            len,
            pos: Some(len),
        })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Basis for SeekBasis<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos != Some(offset) {
            self.pos = None;
            self.inner.seek(SeekFrom::Start(offset))?;
        }
        let n = loop {
            match self.inner.read(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.pos = None;
                    return Err(e);
                }
            }
        };
        self.pos = Some(offset + n as u64);
        Ok(n)
    }
}
