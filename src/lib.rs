//! BRAW Drill Library
//!
//! Streaming carver that recovers camera raw video files from a raw,
//! unmounted storage device by signature scanning. The device is read once,
//! front to back, in large blocks; memory use does not grow with its size.
//!
//! # Features
//!
//! - **Wildcard Signatures**: Start and RIFF/WAVE templates with `*` positions
//! - **Chunk-Driven Boundaries**: File ends are found from `data` chunk headers
//! - **Resumable**: JSON checkpoint of the scan position, never mid-file
//! - **Read-Only Source**: The device is opened without write access
//! - **Blake3 Digests**: Every carved file is hashed as it is written
//!
//! # Example
//!
//! ```no_run
//! use braw_drill::{CarveOptions, Carver};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let options = CarveOptions {
//!         source: PathBuf::from("/dev/sdb"),
//!         output_dir: PathBuf::from("recovered"),
//!         ..Default::default()
//!     };
//!
//!     let result = Carver::new(options).carve()?;
//!     println!("Recovered {} files", result.files_carved);
//!     Ok(())
//! }
//! ```

pub mod carve;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod progress;
pub mod reader;
pub mod sink;

// Re-export commonly used types
pub use carve::signatures::{MatchEvent, Matcher, Template};
pub use carve::{CarveOptions, CarveProgress, CarveResult, CarvedFile, Carver, ScanState};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::Config;
pub use error::CarveError;
pub use reader::ChunkedReader;
pub use sink::{OutputSink, Sink};
