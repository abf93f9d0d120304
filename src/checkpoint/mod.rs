//! Checkpoint module - Resume point for long device scans
//!
//! Saves the scan position to a small JSON file so a multi-hour carve can be
//! resumed after interruption. Uses serde_json for human-debuggable
//! checkpoint files. Records are only ever written while no output file is
//! open, so a resume always restarts on a file boundary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default checkpoint file, relative to the working directory
pub const DEFAULT_CHECKPOINT_FILE: &str = "position.json";

/// A resumable scan position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Absolute source offset that has been fully processed
    pub bytes_read: u64,
    /// Number of files carved before this offset
    pub file_num: u64,
    /// Checkpoint format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// When this checkpoint was written
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_version() -> u32 {
    Checkpoint::VERSION
}

impl Checkpoint {
    const VERSION: u32 = 1;

    /// Create a checkpoint at the given offset and file counter
    pub fn new(bytes_read: u64, file_num: u64) -> Self {
        Self {
            bytes_read,
            file_num,
            version: Self::VERSION,
            updated_at: Some(Utc::now()),
        }
    }

    /// The zero state: start of device, no files carved
    pub fn zero() -> Self {
        Self {
            bytes_read: 0,
            file_num: 0,
            version: Self::VERSION,
            updated_at: None,
        }
    }

    /// Whether this is the zero state
    pub fn is_zero(&self) -> bool {
        self.bytes_read == 0 && self.file_num == 0
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::zero()
    }
}

/// Manages checkpoint persistence at one fixed path
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store bound to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint if one exists
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read checkpoint: {}", self.path.display()))?;

        let checkpoint: Checkpoint = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse checkpoint: {}", self.path.display()))?;

        if checkpoint.version > Checkpoint::VERSION {
            tracing::warn!(
                found = checkpoint.version,
                supported = Checkpoint::VERSION,
                "Checkpoint written by a newer version, reading known fields only"
            );
        }

        Ok(Some(checkpoint))
    }

    /// Load the checkpoint, falling back to the zero state when it is absent
    /// or unreadable
    pub fn load_or_default(&self) -> Checkpoint {
        match self.load() {
            Ok(Some(checkpoint)) => {
                tracing::info!(
                    bytes_read = checkpoint.bytes_read,
                    file_num = checkpoint.file_num,
                    "Resumed checkpoint"
                );
                checkpoint
            }
            Ok(None) => Checkpoint::zero(),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "Ignoring checkpoint, starting from zero");
                Checkpoint::zero()
            }
        }
    }

    /// Save a checkpoint, replacing any previous record
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create checkpoint dir: {}", parent.display())
                })?;
            }
        }

        let data =
            serde_json::to_string_pretty(checkpoint).context("Failed to serialize checkpoint")?;

        // Replace via rename: the record on disk is always complete.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)
            .with_context(|| format!("Failed to write checkpoint: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace checkpoint: {}", self.path.display()))?;

        tracing::debug!(
            bytes_read = checkpoint.bytes_read,
            file_num = checkpoint.file_num,
            "Checkpoint saved"
        );

        Ok(())
    }

    /// Delete the checkpoint file if present
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove checkpoint: {}", self.path.display())
            })?;
            tracing::info!("Checkpoint cleared: {}", self.path.display());
        }
        Ok(())
    }

    /// Check if a checkpoint file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_FILE)
    }
}
