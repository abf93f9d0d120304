//! Command handlers - Drive the carver and print results

use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::carve::{CarveProgress, CarveResult, Carver};
use crate::checkpoint::CheckpointStore;
use crate::cli::{CarveArgs, CheckpointAction, CheckpointArgs, ConfigArgs, OutputFormat};
use crate::config::{generate_sample_config, Config};
use crate::progress::{human_bytes, human_clock};

/// Run a carve with a live spinner, then print the summary
pub fn run_carve(args: &CarveArgs, mut config: Config, format: OutputFormat) -> Result<CarveResult> {
    args.apply_to(&mut config);
    let options = config.to_carve_options(&args.source)?;

    if args.reset_checkpoint {
        CheckpointStore::new(&options.checkpoint_path).clear()?;
        tracing::info!(path = %options.checkpoint_path.display(), "Checkpoint reset");
    }

    let pb = if args.no_progress || format == OutputFormat::Json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let mut files = 0u64;
    let carver = Carver::new(options);
    let result = carver.carve_with_progress(|event| match event {
        CarveProgress::Scanning { position, elapsed } => {
            pb.set_message(format!(
                "{} scanned in {}, {} file(s)",
                human_bytes(position),
                human_clock(elapsed),
                files
            ));
        }
        CarveProgress::FileStarted { file_num, .. } => {
            pb.set_message(format!("carving file {}", file_num));
        }
        CarveProgress::FileFinished(_) => files += 1,
        CarveProgress::Done => pb.finish_and_clear(),
        _ => {}
    });

    pb.finish_and_clear();
    let result = result
        .with_context(|| format!("Carving {} failed", carver.options().source.display()))?;

    match format {
        OutputFormat::Human => print_summary(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(result)
}

fn print_summary(result: &CarveResult) {
    println!("\n{}", "═".repeat(50).bright_cyan());
    println!(
        "  {} {} file(s) carved, {} chunk(s)",
        "✓".bright_green().bold(),
        result.files_carved,
        result.chunks_found
    );
    for file in &result.files {
        let mark = if file.complete {
            "•".normal()
        } else {
            "⚠".yellow()
        };
        println!(
            "    {} {} ({}) @ {}",
            mark,
            file.path.display(),
            human_bytes(file.size),
            file.start_offset
        );
    }
    if result.wav_detections > 0 {
        println!(
            "  {} {} WAVE header(s) seen (not extracted)",
            "♪".bright_cyan(),
            result.wav_detections
        );
    }
    if let Some(ref path) = result.incomplete_file {
        println!(
            "  {} Source ended mid-file: {}",
            "⚠".yellow().bold(),
            path.display()
        );
    }
    println!(
        "  {} Scanned {} from offset {} in {}",
        "📊".bright_cyan(),
        human_bytes(result.bytes_scanned),
        result.resumed_from,
        human_clock(Duration::from_millis(result.duration_ms))
    );
    println!("{}", "═".repeat(50).bright_cyan());
}

/// Show or clear the checkpoint record
pub fn run_checkpoint(args: &CheckpointArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let path = args.path.clone().unwrap_or_else(|| config.checkpoint.path.clone());
    let store = CheckpointStore::new(path);

    match args.action {
        CheckpointAction::Clear => {
            store.clear()?;
            println!("{} Removed {}", "✓".bright_green(), store.path().display());
        }
        CheckpointAction::Show => match store.load()? {
            Some(checkpoint) => match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&checkpoint)?),
                OutputFormat::Human => println!(
                    "Resume at byte {} ({}), {} file(s) carved",
                    checkpoint.bytes_read,
                    human_bytes(checkpoint.bytes_read),
                    checkpoint.file_num
                ),
            },
            None => println!("No checkpoint at {}", store.path().display()),
        },
    }
    Ok(())
}

/// Print config location or a sample
pub fn run_config(args: &ConfigArgs, config: &Config) -> Result<()> {
    if args.sample {
        print!("{}", generate_sample_config());
        return Ok(());
    }

    let path = Config::default_path();
    if args.init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            config.save_to(&path)?;
            println!("{} Wrote {}", "✓".bright_green(), path.display());
        }
        return Ok(());
    }

    println!("{}", path.display());
    Ok(())
}
