//! Reusable byte buffers for /proc reads.
//!
//! Every process entry keeps one `ProcBuffer` per source and refills it on
//! each fetch. Capacity only ever grows: `clear` keeps the allocation, and the
//! sole growth primitive is [`ProcBuffer::ensure_capacity`], which reports
//! allocation failure instead of aborting.

use std::borrow::Cow;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::{ProcError, Result};

/// Chunk size for a single `read(2)` into the staging area.
pub const READ_CHUNK: usize = 1024;

/// Growable byte buffer with explicit used length and capacity.
#[derive(Debug, Default, Clone)]
pub struct ProcBuffer {
    data: Vec<u8>,
}

impl ProcBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes holding content from the last load.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes allocated; never decreases during the buffer's life.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Grows the allocation so that at least `n` bytes fit.
    /// Does nothing when the current capacity already suffices.
    pub fn ensure_capacity(&mut self, n: usize) -> Result<()> {
        if n <= self.data.capacity() {
            return Ok(());
        }
        self.data
            .try_reserve_exact(n - self.data.len())
            .map_err(|source| ProcError::Alloc {
                requested: n,
                source,
            })
    }

    /// Drops the content but keeps the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Replaces the content with the whole file at `path`, reading in a loop
    /// until end-of-file. Returns the number of bytes read.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        let file = open(path)?;
        self.fill(file, path)
    }

    /// Like [`load`](Self::load) but stops after `limit` bytes.
    pub fn load_limited(&mut self, path: &Path, limit: usize) -> Result<usize> {
        let file = open(path)?;
        self.fill(file.take(limit as u64), path)
    }

    /// Replaces the content with `bytes`.
    pub fn set(&mut self, bytes: &[u8]) -> Result<()> {
        self.data.clear();
        self.ensure_capacity(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn fill<R: Read>(&mut self, mut reader: R, path: &Path) -> Result<usize> {
        self.data.clear();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(ProcError::Read {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            };
            self.ensure_capacity(self.data.len() + n)?;
            self.data.extend_from_slice(&chunk[..n]);
        }
        Ok(self.data.len())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Content with invalid UTF-8 replaced, borrowing when possible.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| ProcError::Read {
        path: path.to_path_buf(),
        source,
    })
}
