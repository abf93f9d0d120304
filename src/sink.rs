//! Output sink - Buffered writer for one carved file.
//!
//! Each carved file gets its own [`OutputSink`] for the lifetime of the
//! session. Bytes are hashed with blake3 as they pass through, so the final
//! digest always describes exactly what reached the file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{CarveError, Result};

/// Write buffer in front of each output file (1 MiB)
const WRITE_BUFFER: usize = 1024 * 1024;

/// Anything the atom carver can copy bytes into
pub trait Sink {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

/// In-memory sink, handy for dry runs and tests
impl Sink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Name of the `n`th carved file, e.g. `found-file-3.braw`
pub fn output_file_name(prefix: &str, n: u64, extension: &str) -> String {
    format!("{}-{}.{}", prefix, n, extension)
}

/// What a closed sink wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSummary {
    pub path: PathBuf,
    pub size: u64,
    /// Hex blake3 of the written bytes
    pub hash: String,
}

/// Buffered, hashed writer bound to one output file
pub struct OutputSink {
    path: PathBuf,
    writer: BufWriter<File>,
    hasher: blake3::Hasher,
    written: u64,
}

impl OutputSink {
    /// Create (or truncate) the file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| CarveError::OutputCreate {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(WRITE_BUFFER, file),
            hasher: blake3::Hasher::new(),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes accepted so far (buffered or flushed)
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush buffers, sync to disk and release the handle
    pub fn close(self) -> Result<SinkSummary> {
        let OutputSink {
            path,
            writer,
            hasher,
            written,
        } = self;

        let file = writer.into_inner().map_err(|e| CarveError::OutputWrite {
            path: path.clone(),
            source: e.into_error(),
        })?;
        file.sync_all().map_err(|source| CarveError::OutputWrite {
            path: path.clone(),
            source,
        })?;

        Ok(SinkSummary {
            path,
            size: written,
            hash: hex::encode(hasher.finalize().as_bytes()),
        })
    }
}

impl Sink for OutputSink {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .map_err(|source| CarveError::OutputWrite {
                path: self.path.clone(),
                source,
            })?;
        self.hasher.update(bytes);
        self.written += bytes.len() as u64;
        Ok(())
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("path", &self.path)
            .field("written", &self.written)
            .finish()
    }
}
