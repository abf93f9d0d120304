//! Chunked source reader - Block-buffered access to a raw device
//!
//! Pulls large fixed-size blocks from the device into an in-memory buffer and
//! hands them out one byte at a time, with bounded lookahead (`peek`) and
//! absolute repositioning (`seek`). Consumed bytes are compacted away before
//! every refill, so the buffer never holds more than one block plus the
//! largest outstanding request no matter how large the device is.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{CarveError, Result};

/// Default refill size (5 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 5 * 1024 * 1024;

/// Smallest block size accepted; anything lower is rounded up
const MIN_BLOCK_SIZE: usize = 512;

/// Open a source device or image strictly for reading
pub fn open_source(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(false)
        .open(path)
        .map_err(|source| CarveError::SourceOpen {
            path: path.to_path_buf(),
            source,
        })
}

/// Sequential reader over a `Read + Seek` source with lookahead
pub struct ChunkedReader<R> {
    inner: R,
    /// Buffered bytes; `buf[pos..]` has not been consumed yet
    buf: Vec<u8>,
    pos: usize,
    block_size: usize,
    /// Absolute offset of `buf[pos]` on the source
    offset: u64,
    /// The underlying source returned 0 bytes
    eof: bool,
}

impl<R: Read + Seek> ChunkedReader<R> {
    /// Wrap `inner`, reading from its current start (offset 0)
    pub fn new(inner: R, block_size: usize) -> Self {
        let block_size = block_size.max(MIN_BLOCK_SIZE);
        Self {
            inner,
            buf: Vec::with_capacity(block_size),
            pos: 0,
            block_size,
            offset: 0,
            eof: false,
        }
    }

    /// Absolute offset of the next byte `read_one` will return
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Number of bytes currently held in memory (consumed or not)
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Read a single byte. `Ok(None)` is clean end of stream.
    pub fn read_one(&mut self) -> Result<Option<u8>> {
        if self.pos >= self.buf.len() {
            self.fill(1)?;
        }
        match self.buf.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                self.offset += 1;
                Ok(Some(byte))
            }
            None => Ok(None),
        }
    }

    /// Consume up to `n` bytes. Fewer are returned only at end of stream.
    pub fn read(&mut self, n: usize) -> Result<&[u8]> {
        self.fill(n)?;
        let end = (self.pos + n).min(self.buf.len());
        let start = self.pos;
        self.pos = end;
        self.offset += (end - start) as u64;
        Ok(&self.buf[start..end])
    }

    /// Look at up to `n` upcoming bytes without consuming them
    pub fn peek(&mut self, n: usize) -> Result<&[u8]> {
        self.fill(n)?;
        let end = (self.pos + n).min(self.buf.len());
        Ok(&self.buf[self.pos..end])
    }

    /// Reposition to an absolute offset, dropping everything buffered
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|source| CarveError::SourceSeek { offset, source })?;
        self.buf.clear();
        self.pos = 0;
        self.offset = offset;
        self.eof = false;
        Ok(())
    }

    /// Make sure at least `want` unconsumed bytes are buffered, unless the
    /// source ends first.
    fn fill(&mut self, want: usize) -> Result<()> {
        while self.buf.len() - self.pos < want && !self.eof {
            self.compact();

            let start = self.buf.len();
            self.buf.resize(start + self.block_size, 0);
            let read = loop {
                match self.inner.read(&mut self.buf[start..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(source) => {
                        self.buf.truncate(start);
                        return Err(CarveError::SourceRead {
                            offset: self.offset + (start - self.pos) as u64,
                            source,
                        });
                    }
                }
            };
            self.buf.truncate(start + read);

            if read == 0 {
                self.eof = true;
            }
        }
        Ok(())
    }

    /// Drop the consumed prefix of the buffer
    fn compact(&mut self) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
    }
}
