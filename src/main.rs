//! BRAW Drill - Streaming camera raw video recovery
//!
//! Scans an unmounted device or image for camera raw video containers,
//! writes each one to its own file and checkpoints the scan so it can be
//! resumed.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use braw_drill::cli::{self, Cli, Commands};
use braw_drill::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load(),
    };

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        config.general.log_level.as_str()
    };
    let filter = EnvFilter::from_default_env().add_directive(format!("braw_drill={}", level).parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if config.general.json_logs {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Carve(ref args) => {
            cli::run::run_carve(args, config, cli.output_format)?;
        }
        Commands::Checkpoint(ref args) => {
            cli::run::run_checkpoint(args, &config, cli.output_format)?;
        }
        Commands::Config(ref args) => {
            cli::run::run_config(args, &config)?;
        }
    }

    Ok(())
}
