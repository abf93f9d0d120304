//! Configuration Module - Run defaults from ~/.config/braw-drill/config.toml
//!
//! Supports:
//! - Output directory and file naming
//! - Checkpoint location, cadence and resume behaviour
//! - Reader block size and progress cadence
//! - Custom start / WAVE signature templates
//!
//! Command line flags override anything set here.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::carve::signatures::Template;
use crate::carve::{CarveOptions, DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_PROGRESS_INTERVAL};
use crate::checkpoint::DEFAULT_CHECKPOINT_FILE;
use crate::reader::DEFAULT_BLOCK_SIZE;

/// BRAW Drill Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Output settings
    pub output: OutputConfig,
    /// Checkpoint settings
    pub checkpoint: CheckpointConfig,
    /// Scan settings
    pub scan: ScanConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Where and how carved files are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination directory
    pub dir: PathBuf,
    /// File name prefix
    pub file_prefix: String,
    /// File extension
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let defaults = CarveOptions::default();
        Self {
            dir: defaults.output_dir,
            file_prefix: defaults.file_prefix,
            extension: defaults.extension,
        }
    }
}

/// Checkpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Resume from the checkpoint file when present
    pub resume: bool,
    /// Checkpoint file path
    pub path: PathBuf,
    /// Save every N bytes (0 = disabled)
    pub interval: u64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            resume: true,
            path: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
            interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

/// Scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Reader block size in bytes
    pub block_size: usize,
    /// Progress line every N bytes (0 = disabled)
    pub progress_interval: u64,
    /// Start signature, `*` is a wildcard byte
    pub start_template: String,
    /// WAVE signature, `*` is a wildcard byte
    pub wave_template: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            start_template: Template::braw_start().to_string(),
            wave_template: Template::wave_start().to_string(),
        }
    }
}

impl Config {
    /// Load config from default path or return defaults
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "tunclon", "braw-drill")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".braw-drill")
                    .join("config.toml")
            })
    }

    /// Build carve options for `source`, parsing the signature templates
    pub fn to_carve_options(&self, source: impl Into<PathBuf>) -> Result<CarveOptions> {
        let start_template = Template::parse(&self.scan.start_template)
            .with_context(|| format!("Invalid start template: {}", self.scan.start_template))?;
        let wave_template = Template::parse(&self.scan.wave_template)
            .with_context(|| format!("Invalid wave template: {}", self.scan.wave_template))?;

        Ok(CarveOptions {
            source: source.into(),
            output_dir: self.output.dir.clone(),
            resume: self.checkpoint.resume,
            checkpoint_path: self.checkpoint.path.clone(),
            checkpoint_interval: self.checkpoint.interval,
            progress_interval: self.scan.progress_interval,
            block_size: self.scan.block_size,
            start_template,
            wave_template,
            file_prefix: self.output.file_prefix.clone(),
            extension: self.output.extension.clone(),
        })
    }
}

/// Generate a sample config file with comments
pub fn generate_sample_config() -> String {
    r#"# BRAW Drill Configuration
# Location: ~/.config/braw-drill/config.toml (or %APPDATA%\tunclon\braw-drill\config\config.toml on Windows)

[general]
# Log level: trace, debug, info, warn, error
log_level = "info"

# Emit JSON log lines instead of text
json_logs = false

[output]
# Directory carved files are written to
dir = "braw-files"

# Files are named <file_prefix>-<n>.<extension>
file_prefix = "found-file"
extension = "braw"

[checkpoint]
# Continue from the checkpoint file when it exists
resume = true

# Checkpoint file (JSON)
path = "position.json"

# Save scan position every N bytes (0 = disabled)
interval = 10000000

[scan]
# Bytes read from the device per refill (5 MiB)
block_size = 5242880

# Progress line every N bytes (0 = disabled)
progress_interval = 1000000

# Signatures: \xHH is a byte, \\ a backslash, * matches any byte
start_template = '\x00\x00\x00\x08wide***\xf8mdat'
wave_template = 'RIFF****WAVEfmt '
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.checkpoint.resume);
        assert_eq!(config.checkpoint.interval, 10_000_000);
        assert_eq!(config.scan.progress_interval, 1_000_000);
        assert_eq!(config.output.file_prefix, "found-file");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_config.toml");

        let mut config = Config::default();
        config.output.dir = PathBuf::from("/mnt/recovered");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.output.dir, config.output.dir);
        assert_eq!(loaded.scan.start_template, config.scan.start_template);
    }

    #[test]
    fn test_parse_sample_config() {
        let sample = generate_sample_config();
        let config: Config = toml::from_str(&sample).unwrap();
        let opts = config.to_carve_options("/dev/sdz").unwrap();
        assert_eq!(opts.start_template, Template::braw_start());
        assert_eq!(opts.wave_template, Template::wave_start());
        assert_eq!(opts.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[checkpoint]\nresume = false\n").unwrap();
        assert!(!config.checkpoint.resume);
        assert_eq!(config.checkpoint.path, PathBuf::from("position.json"));
        assert_eq!(config.output.extension, "braw");
    }

    #[test]
    fn test_default_templates_round_trip() {
        let opts = Config::default().to_carve_options("img.bin").unwrap();
        assert_eq!(opts.start_template, Template::braw_start());
        assert_eq!(opts.source, PathBuf::from("img.bin"));
    }

    #[test]
    fn test_bad_template_is_an_error() {
        let mut config = Config::default();
        config.scan.start_template = "\\xZZ".to_string();
        assert!(config.to_carve_options("img.bin").is_err());
    }
}
