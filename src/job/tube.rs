// Output staging.
//
// Jobs encode whole commands or records into the tube, then drain it into
// whatever output space the caller provided. Anything that does not fit
// waits for the next `drive` call.

use super::Buffers;

#[derive(Debug, Default)]
pub struct Tube {
    buf: Vec<u8>,
    pos: usize,
}

impl Tube {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes waiting to be placed.
    #[inline]
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Buffer to encode into; appended bytes queue behind pending ones.
    #[inline]
    pub fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Move pending bytes into `bufs`. True when nothing is left.
    pub fn drain(&mut self, bufs: &mut Buffers<'_>) -> bool {
        if !self.is_empty() {
            self.pos += bufs.write(&self.buf[self.pos..]);
        }
        if self.is_empty() {
            self.buf.clear();
            self.pos = 0;
            true
        } else {
            false
        }
    }
}
