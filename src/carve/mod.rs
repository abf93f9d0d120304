//! File carving module - Recover camera raw video from an unmounted device.
//!
//! Streams the raw device byte-by-byte through a chunked reader, looking for
//! the container start signature. When it fires, a new output file is opened
//! and the [`atom::AtomCarver`] copies the container out until it decides the
//! last `data` chunk has been written. A second matcher watches the same
//! stream for RIFF/WAVE headers and only logs them.
//!
//! # Design
//!
//! - **Constant memory**: the reader refills in multi-megabyte blocks and
//!   compacts consumed bytes, so a terabyte device scans in tens of MB
//! - **Single pass**: every byte is seen once, in order; matchers never
//!   backtrack
//! - **Resumable**: the scan position is checkpointed at a fixed cadence, but
//!   only while no output file is open
//! - **Fail loud**: read and write errors abort the run after one last
//!   best-effort checkpoint

pub mod atom;
pub mod signatures;

use std::io::{Read, Seek};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::checkpoint::{Checkpoint, CheckpointStore, DEFAULT_CHECKPOINT_FILE};
use crate::error::{CarveError, Result};
use crate::progress::{human_bytes, human_clock};
use crate::reader::{open_source, ChunkedReader, DEFAULT_BLOCK_SIZE};
use crate::sink::{output_file_name, OutputSink, Sink};
use atom::{AtomCarver, AtomStep};
use signatures::{MatchEvent, Matcher, Template};

/// Default checkpoint cadence in bytes
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 10_000_000;

/// Default progress cadence in bytes
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Immutable configuration for one carve run
#[derive(Debug, Clone)]
pub struct CarveOptions {
    /// Raw device or image to scan
    pub source: PathBuf,
    /// Directory carved files are written to
    pub output_dir: PathBuf,
    /// Continue from the checkpoint file if one exists
    pub resume: bool,
    /// Where the checkpoint record lives
    pub checkpoint_path: PathBuf,
    /// Save a checkpoint every N bytes (0 = never)
    pub checkpoint_interval: u64,
    /// Emit progress every N bytes (0 = never)
    pub progress_interval: u64,
    /// Reader refill size in bytes
    pub block_size: usize,
    /// Signature that starts a carved file
    pub start_template: Template,
    /// Signature that is only reported
    pub wave_template: Template,
    /// Output file name prefix
    pub file_prefix: String,
    /// Output file extension
    pub extension: String,
}

impl Default for CarveOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            output_dir: PathBuf::from("braw-files"),
            resume: true,
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            block_size: DEFAULT_BLOCK_SIZE,
            start_template: Template::braw_start(),
            wave_template: Template::wave_start(),
            file_prefix: "found-file".to_string(),
            extension: "braw".to_string(),
        }
    }
}

/// A file written during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarvedFile {
    /// Sequential file number (1-based, continues across resumes)
    pub file_num: u64,
    /// Output path
    pub path: PathBuf,
    /// Source offset of the first signature byte
    pub start_offset: u64,
    /// Bytes written
    pub size: u64,
    /// `data` chunks copied
    pub chunks: u64,
    /// Blake3 hash of the written bytes
    pub hash: String,
    /// False when the source ended before the container did
    pub complete: bool,
}

/// Summary of a carve run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarveResult {
    pub files_carved: usize,
    pub chunks_found: u64,
    pub wav_detections: usize,
    /// Offset the scan started from (checkpoint or 0)
    pub resumed_from: u64,
    /// Offset where the scan stopped
    pub end_offset: u64,
    pub bytes_scanned: u64,
    pub bytes_written: u64,
    pub checkpoints_saved: usize,
    /// File left open by end of stream, if any
    pub incomplete_file: Option<PathBuf>,
    pub duration_ms: u64,
    pub files: Vec<CarvedFile>,
}

/// Progress updates emitted during carving
#[derive(Debug, Clone)]
pub enum CarveProgress {
    /// Periodic position report
    Scanning { position: u64, elapsed: Duration },
    /// A start signature matched and a new file was opened
    FileStarted { file_num: u64, path: PathBuf, offset: u64 },
    /// A data chunk was copied into the open file
    ChunkFound { file_num: u64, length: u8, read: usize },
    /// The open file was closed
    FileFinished(CarvedFile),
    /// A RIFF/WAVE header went past
    WaveDetected { offset: u64 },
    /// The scan position was persisted
    CheckpointSaved { bytes_read: u64, file_num: u64 },
    /// End of source reached
    Done,
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No file open; feeding the start matcher
    Searching,
    /// File open; bytes routed to the atom carver
    Carving,
}

/// The carving engine
pub struct Carver {
    options: CarveOptions,
}

impl Carver {
    pub fn new(options: CarveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CarveOptions {
        &self.options
    }

    /// Convenience wrapper without progress
    pub fn carve(&self) -> Result<CarveResult> {
        self.carve_with_progress(|_| {})
    }

    /// Open the configured source device and carve it
    pub fn carve_with_progress<F>(&self, on_progress: F) -> Result<CarveResult>
    where
        F: FnMut(CarveProgress),
    {
        let file = open_source(&self.options.source)?;
        tracing::info!(source = %self.options.source.display(), "Opened source");
        self.carve_stream(file, on_progress)
    }

    /// Carve any seekable byte source
    pub fn carve_stream<R, F>(&self, source: R, mut on_progress: F) -> Result<CarveResult>
    where
        R: Read + Seek,
        F: FnMut(CarveProgress),
    {
        let opts = &self.options;
        let store = CheckpointStore::new(&opts.checkpoint_path);

        let checkpoint = if opts.resume {
            store.load_or_default()
        } else {
            Checkpoint::zero()
        };

        std::fs::create_dir_all(&opts.output_dir).map_err(|source| CarveError::OutputDir {
            path: opts.output_dir.clone(),
            source,
        })?;

        let mut reader = ChunkedReader::new(source, opts.block_size);
        if checkpoint.bytes_read > 0 {
            reader.seek(checkpoint.bytes_read)?;
        }

        tracing::info!(
            output = %opts.output_dir.display(),
            resume_offset = checkpoint.bytes_read,
            file_num = checkpoint.file_num,
            start_template = %opts.start_template,
            block_size = opts.block_size,
            "Starting carve"
        );

        let mut run = Run::new(opts, store, reader, &checkpoint);

        match run.scan(&mut on_progress) {
            Ok(()) => {
                let result = run.finish();
                on_progress(CarveProgress::Done);
                tracing::info!(
                    files_carved = result.files_carved,
                    chunks = result.chunks_found,
                    wav_detections = result.wav_detections,
                    scanned = %human_bytes(result.bytes_scanned),
                    written = %human_bytes(result.bytes_written),
                    duration_ms = result.duration_ms,
                    "Carve complete"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, offset = run.reader.position(), "Fatal error, stopping");
                run.final_checkpoint();
                Err(e)
            }
        }
    }
}

/// An open output file
struct Session {
    file_num: u64,
    start_offset: u64,
    sink: OutputSink,
    carver: AtomCarver,
}

/// State of one pass over the source
struct Run<'a, R> {
    opts: &'a CarveOptions,
    store: CheckpointStore,
    reader: ChunkedReader<R>,
    start_matcher: Matcher,
    wave_matcher: Matcher,
    session: Option<Session>,
    /// Files carved so far, including those before a resume
    file_num: u64,
    checkpoint_epoch: u64,
    progress_epoch: u64,
    /// Safe resume point after a failure that lost the current file
    resume_floor: Option<Checkpoint>,
    started: Instant,
    result: CarveResult,
}

impl<'a, R: Read + Seek> Run<'a, R> {
    fn new(
        opts: &'a CarveOptions,
        store: CheckpointStore,
        reader: ChunkedReader<R>,
        checkpoint: &Checkpoint,
    ) -> Self {
        let start = checkpoint.bytes_read;
        Self {
            opts,
            store,
            reader,
            start_matcher: Matcher::new(opts.start_template.clone()),
            wave_matcher: Matcher::new(opts.wave_template.clone()),
            session: None,
            file_num: checkpoint.file_num,
            checkpoint_epoch: epoch(start, opts.checkpoint_interval),
            progress_epoch: epoch(start, opts.progress_interval),
            resume_floor: None,
            started: Instant::now(),
            result: CarveResult {
                resumed_from: start,
                ..Default::default()
            },
        }
    }

    fn state(&self) -> ScanState {
        if self.session.is_some() {
            ScanState::Carving
        } else {
            ScanState::Searching
        }
    }

    fn scan<F: FnMut(CarveProgress)>(&mut self, on_progress: &mut F) -> Result<()> {
        while let Some(byte) = self.reader.read_one()? {
            let offset = self.reader.position() - 1;

            match self.state() {
                ScanState::Carving => self.carve_byte(byte, on_progress)?,
                ScanState::Searching => {
                    if let MatchEvent::Matched(prefix) = self.start_matcher.advance(byte) {
                        self.open_session(prefix, offset, on_progress)?;
                    }
                }
            }

            if let MatchEvent::Matched(header) = self.wave_matcher.advance(byte) {
                let at = offset + 1 - header.len() as u64;
                self.result.wav_detections += 1;
                tracing::info!(offset = at, "Found wav file");
                on_progress(CarveProgress::WaveDetected { offset: at });
            }

            self.tick(on_progress);
        }

        if self.session.is_some() {
            self.close_session(false, on_progress)?;
        }
        Ok(())
    }

    fn carve_byte<F: FnMut(CarveProgress)>(&mut self, byte: u8, on_progress: &mut F) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        match session.carver.feed(byte, &mut self.reader, &mut session.sink)? {
            AtomStep::Copied => {}
            AtomStep::Chunk { length, read } => {
                self.result.chunks_found += 1;
                on_progress(CarveProgress::ChunkFound {
                    file_num: session.file_num,
                    length,
                    read,
                });
            }
            AtomStep::Finished { length, read } => {
                self.result.chunks_found += 1;
                on_progress(CarveProgress::ChunkFound {
                    file_num: session.file_num,
                    length,
                    read,
                });
                self.close_session(true, on_progress)?;
            }
        }
        Ok(())
    }

    fn open_session<F: FnMut(CarveProgress)>(
        &mut self,
        prefix: Vec<u8>,
        last_offset: u64,
        on_progress: &mut F,
    ) -> Result<()> {
        let start_offset = last_offset + 1 - prefix.len() as u64;
        let file_num = self.file_num + 1;
        let path = carved_file_path(self.opts, file_num);

        let sink = OutputSink::create(&path).and_then(|mut sink| {
            sink.write(&prefix)?;
            Ok(sink)
        });
        let sink = match sink {
            Ok(sink) => sink,
            Err(e) => {
                self.resume_floor = Some(Checkpoint::new(start_offset, self.file_num));
                return Err(e);
            }
        };

        self.file_num = file_num;
        tracing::info!(
            file_num,
            offset = start_offset,
            path = %path.display(),
            "Found file, starting write out"
        );
        on_progress(CarveProgress::FileStarted {
            file_num,
            path,
            offset: start_offset,
        });

        self.session = Some(Session {
            file_num,
            start_offset,
            sink,
            carver: AtomCarver::new(),
        });
        Ok(())
    }

    fn close_session<F: FnMut(CarveProgress)>(
        &mut self,
        complete: bool,
        on_progress: &mut F,
    ) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        let Session {
            file_num,
            start_offset,
            sink,
            carver,
        } = session;

        let summary = match sink.close() {
            Ok(summary) => summary,
            Err(e) => {
                self.resume_floor = Some(Checkpoint::new(start_offset, file_num - 1));
                return Err(e);
            }
        };

        let carved = CarvedFile {
            file_num,
            path: summary.path,
            start_offset,
            size: summary.size,
            chunks: carver.chunks(),
            hash: summary.hash,
            complete,
        };

        if complete {
            tracing::info!(
                file_num,
                size = %human_bytes(carved.size),
                chunks = carved.chunks,
                blake3 = %carved.hash,
                "Found end of file"
            );
        } else {
            tracing::warn!(
                file_num,
                path = %carved.path.display(),
                size = carved.size,
                "Source ended mid-file, output is incomplete"
            );
            self.result.incomplete_file = Some(carved.path.clone());
        }

        self.result.files_carved += 1;
        self.result.bytes_written += carved.size;
        self.result.files.push(carved.clone());
        on_progress(CarveProgress::FileFinished(carved));
        Ok(())
    }

    /// Periodic progress and checkpoint work after each byte
    fn tick<F: FnMut(CarveProgress)>(&mut self, on_progress: &mut F) {
        let position = self.reader.position();

        let progress = epoch(position, self.opts.progress_interval);
        if progress > self.progress_epoch {
            self.progress_epoch = progress;
            let elapsed = self.started.elapsed();
            tracing::info!(
                "[{}] Reading {}",
                human_clock(elapsed),
                human_bytes(position)
            );
            on_progress(CarveProgress::Scanning { position, elapsed });
        }

        if self.session.is_some() {
            return;
        }

        let checkpoint = epoch(position, self.opts.checkpoint_interval);
        if checkpoint > self.checkpoint_epoch {
            self.checkpoint_epoch = checkpoint;
            let record = self.safe_checkpoint();
            match self.store.save(&record) {
                Ok(()) => {
                    self.result.checkpoints_saved += 1;
                    on_progress(CarveProgress::CheckpointSaved {
                        bytes_read: record.bytes_read,
                        file_num: record.file_num,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{:#}", e), "Checkpoint save failed, continuing");
                }
            }
        }
    }

    /// Current position minus any partial start match, so a signature that
    /// straddles the checkpoint is seen again on resume
    fn safe_checkpoint(&self) -> Checkpoint {
        let pending = self.start_matcher.pending().len() as u64;
        Checkpoint::new(self.reader.position() - pending, self.file_num)
    }

    /// Best-effort save after a fatal error
    fn final_checkpoint(&mut self) {
        if self.session.is_some() {
            tracing::warn!("File still open, not writing a final checkpoint");
            return;
        }
        let record = self
            .resume_floor
            .take()
            .unwrap_or_else(|| self.safe_checkpoint());
        match self.store.save(&record) {
            Ok(()) => tracing::info!(
                bytes_read = record.bytes_read,
                file_num = record.file_num,
                "Final checkpoint written"
            ),
            Err(e) => tracing::warn!(error = %format!("{:#}", e), "Final checkpoint failed"),
        }
    }

    fn finish(self) -> CarveResult {
        let mut result = self.result;
        result.end_offset = self.reader.position();
        result.bytes_scanned = result.end_offset.saturating_sub(result.resumed_from);
        result.duration_ms = self.started.elapsed().as_millis() as u64;
        result
    }
}

/// Number of whole `interval`s in `position` (0 when disabled)
fn epoch(position: u64, interval: u64) -> u64 {
    if interval == 0 {
        0
    } else {
        position / interval
    }
}

/// Path of the `n`th output file for these options
pub fn carved_file_path(options: &CarveOptions, n: u64) -> PathBuf {
    options
        .output_dir
        .join(output_file_name(&options.file_prefix, n, &options.extension))
}
