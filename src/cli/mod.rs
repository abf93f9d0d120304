//! CLI module - Command line interface definitions and handlers

pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;

/// BRAW Drill - Streaming camera raw video recovery from unmounted devices
///
/// Scans a raw device or disk image byte by byte for camera raw video
/// containers and writes each one out as it is found. The source is opened
/// read-only. Long scans checkpoint their position and can be resumed.
#[derive(Parser, Debug)]
#[command(name = "braw-drill")]
#[command(author = "Ryan Cashmoney <tunclon@proton.me>")]
#[command(version)]
#[command(about = "Recover camera raw video from raw devices by signature scanning", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (debug logging)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for machine parsing
    #[arg(long, value_enum, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Carve camera raw files from a raw device or image
    Carve(CarveArgs),

    /// Inspect or delete the saved scan position
    Checkpoint(CheckpointArgs),

    /// Show the config path or print a sample config
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CarveArgs {
    /// Source raw device or image (e.g. /dev/sdb, card.img)
    #[arg(required = true)]
    pub source: PathBuf,

    /// Output directory for carved files
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Resume from the checkpoint file (default from config)
    #[arg(long, overrides_with = "no_resume")]
    pub resume: bool,

    /// Start from offset 0 and ignore any checkpoint
    #[arg(long, overrides_with = "resume")]
    pub no_resume: bool,

    /// Delete the checkpoint file before starting
    #[arg(long)]
    pub reset_checkpoint: bool,

    /// Checkpoint file path
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Save the scan position every N bytes (0 = disabled)
    #[arg(long)]
    pub checkpoint_interval: Option<u64>,

    /// Report progress every N bytes (0 = disabled)
    #[arg(long)]
    pub progress_interval: Option<u64>,

    /// Bytes read from the source per refill
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Start signature, \xHH for bytes and * for any byte
    #[arg(long)]
    pub start_template: Option<String>,

    /// WAVE detection signature, same syntax as --start-template
    #[arg(long)]
    pub wave_template: Option<String>,

    /// Don't draw a progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

impl CarveArgs {
    /// Fold flags given on the command line into `config`
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref output) = self.output {
            config.output.dir = output.clone();
        }
        if self.resume {
            config.checkpoint.resume = true;
        }
        if self.no_resume {
            config.checkpoint.resume = false;
        }
        if let Some(ref path) = self.checkpoint {
            config.checkpoint.path = path.clone();
        }
        if let Some(interval) = self.checkpoint_interval {
            config.checkpoint.interval = interval;
        }
        if let Some(interval) = self.progress_interval {
            config.scan.progress_interval = interval;
        }
        if let Some(size) = self.block_size {
            config.scan.block_size = size;
        }
        if let Some(ref template) = self.start_template {
            config.scan.start_template = template.clone();
        }
        if let Some(ref template) = self.wave_template {
            config.scan.wave_template = template.clone();
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CheckpointArgs {
    /// What to do with the checkpoint
    #[arg(value_enum, default_value = "show")]
    pub action: CheckpointAction,

    /// Checkpoint file path (default from config)
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CheckpointAction {
    /// Print the saved position
    Show,
    /// Delete the checkpoint file
    Clear,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Print a commented sample config
    #[arg(long)]
    pub sample: bool,

    /// Write the current settings to the config path
    #[arg(long)]
    pub init: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}
