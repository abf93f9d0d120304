//! Error types for the carving engine.
//!
//! End of the source stream is not an error: readers report it as `None` or a
//! short read. Everything in [`CarveError`] is fatal and aborts the run.
//! Checkpoint problems never surface here, they are logged and skipped.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures of a carve run
#[derive(Debug, Error)]
pub enum CarveError {
    /// The source device could not be opened
    #[error("failed to open source {path}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A device read failed somewhere other than clean end-of-stream
    #[error("read error on source at offset {offset}")]
    SourceRead {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Repositioning the source failed (resume seek)
    #[error("failed to seek source to offset {offset}")]
    SourceSeek {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// The destination directory could not be created
    #[error("failed to create output directory {path}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A new output file could not be created
    #[error("failed to create output file {path}")]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or flushing an output file failed
    #[error("failed to write output file {path}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CarveError {
    /// Byte offset on the source the error relates to, when known
    pub fn offset(&self) -> Option<u64> {
        match self {
            CarveError::SourceRead { offset, .. } | CarveError::SourceSeek { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CarveError>;
