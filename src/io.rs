//! Random-access in-memory stream owned by an opened [`Image`](crate::image::Image).

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::error::Result;

/// A read/seek stream over an owned byte buffer.
///
/// The caller's buffer is copied on construction; [`MemIo::transfer`]
/// replaces the copy, never the original slice.
#[derive(Debug, Clone, Default)]
pub struct MemIo {
    cursor: Cursor<Vec<u8>>,
}

impl MemIo {
    /// Copy `data` into a new stream positioned at offset zero.
    pub fn new(data: &[u8]) -> Self {
        Self {
            cursor: Cursor::new(data.to_vec()),
        }
    }

    /// Current extent of the stream in bytes.
    pub fn size(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Borrow the full contents without moving the cursor.
    pub fn as_slice(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    /// Replace the whole stream with `data` and rewind.
    pub fn transfer(&mut self, data: Vec<u8>) {
        self.cursor = Cursor::new(data);
    }

    /// Read the entire extent from offset zero into an owned buffer.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let size = self.size();
        self.seek(SeekFrom::Start(0))?;
        let mut out = vec![0u8; size];
        self.read_exact(&mut out)?;
        Ok(out)
    }
}

impl Read for MemIo {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemIo {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}
