//! Configuration management for the CT slice streamer.
//!
//! This module provides the command-line interface:
//! - Subcommands via clap derive
//! - Environment variables with `CTS_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `CTS_CATALOG` - Path to the volume catalog file
//! - `CTS_VOLUME` - Index of the volume to use (default: 0)
//! - `CTS_MAX_SLICES` - Maximum slices probed per volume (default: 10000)
//! - `CTS_STAGING_BYTES` - Staging buffer capacity in bytes (default: 64MB)
//! - `CTS_MAX_BATCH` - Cap on slices per batch
//! - `CTS_CUTOFF_LOW` / `CTS_CUTOFF_HIGH` - Cutoff window bounds
//! - `CTS_STAGGERED` - Stream one batch per tick (default: false)
//! - `CTS_BLOCK_COUNT_L0` - Low-resolution block reserve kept on clear
//! - `CTS_TOTAL_BLOCK_COUNT` - Total blocks in the voxel grid

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::stream::{CutoffWindow, StreamerConfig, DEFAULT_STAGING_CAPACITY};
use crate::volume::DEFAULT_MAX_SLICES;

// =============================================================================
// CLI Arguments
// =============================================================================

/// CT Slice Streamer - decode and stream CT slice stacks.
#[derive(Parser, Debug, Clone)]
#[command(name = "ct-slice-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the volumes in a catalog file
    Volumes(VolumesConfig),

    /// Count the slices of a volume and report their geometry
    Scan(ScanConfig),

    /// Decode a single slice file
    Decode(DecodeConfig),

    /// Stream a volume through the batch scheduler
    Stream(StreamConfig),
}

/// Output format for reports.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Catalog and volume selection shared by several subcommands.
#[derive(Args, Debug, Clone)]
pub struct VolumeArgs {
    /// Volume catalog file (one `"folder" "template" "ext"` line per volume).
    #[arg(long, env = "CTS_CATALOG")]
    pub catalog: PathBuf,

    /// Index of the volume in the catalog.
    #[arg(long, default_value_t = 0, env = "CTS_VOLUME")]
    pub volume: usize,

    /// Maximum number of slices probed.
    #[arg(long, default_value_t = DEFAULT_MAX_SLICES, env = "CTS_MAX_SLICES")]
    pub max_slices: u32,
}

impl VolumeArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.catalog.as_os_str().is_empty() {
            return Err("Catalog path is required. Set --catalog or CTS_CATALOG".to_string());
        }
        if self.max_slices == 0 {
            return Err("max_slices must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Subcommand Configurations
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct VolumesConfig {
    /// Volume catalog file.
    #[arg(long, env = "CTS_CATALOG")]
    pub catalog: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ScanConfig {
    #[command(flatten)]
    pub volume: VolumeArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.volume.validate()
    }
}

#[derive(Args, Debug, Clone)]
pub struct DecodeConfig {
    /// Slice file to decode.
    pub file: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StreamConfig {
    #[command(flatten)]
    pub volume: VolumeArgs,

    /// Staging buffer capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_STAGING_CAPACITY, env = "CTS_STAGING_BYTES")]
    pub staging_bytes: usize,

    /// Maximum slices per batch.
    #[arg(long, env = "CTS_MAX_BATCH")]
    pub max_batch: Option<u32>,

    /// Lower bound of the cutoff window.
    #[arg(long, env = "CTS_CUTOFF_LOW")]
    pub cutoff_low: Option<u32>,

    /// Upper bound of the cutoff window.
    #[arg(long, env = "CTS_CUTOFF_HIGH")]
    pub cutoff_high: Option<u32>,

    /// Stream one batch per tick instead of draining the volume at once.
    #[arg(long, default_value_t = false, env = "CTS_STAGGERED")]
    pub staggered: bool,

    /// Low-resolution blocks kept when the grid is cleared.
    #[arg(long, default_value_t = 0, env = "CTS_BLOCK_COUNT_L0")]
    pub block_count_l0: u32,

    /// Total blocks in the voxel grid.
    #[arg(long, default_value_t = 0, env = "CTS_TOTAL_BLOCK_COUNT")]
    pub total_block_count: u32,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl StreamConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.volume.validate()?;

        if self.staging_bytes == 0 {
            return Err("staging_bytes must be greater than 0".to_string());
        }
        if self.max_batch == Some(0) {
            return Err("max_batch must be greater than 0".to_string());
        }
        if let (Some(low), Some(high)) = (self.cutoff_low, self.cutoff_high) {
            if low > high {
                return Err(format!(
                    "cutoff_low ({low}) must not exceed cutoff_high ({high})"
                ));
            }
        }
        if self.block_count_l0 > self.total_block_count {
            return Err("block_count_l0 must not exceed total_block_count".to_string());
        }
        Ok(())
    }

    /// Scheduler settings derived from the arguments.
    pub fn streamer_config(&self) -> StreamerConfig {
        StreamerConfig {
            staging_capacity: self.staging_bytes,
            max_batch_size: self.max_batch,
            max_slices: self.volume.max_slices,
            block_count_l0: self.block_count_l0,
            total_block_count: self.total_block_count,
            staggered: self.staggered,
        }
    }

    /// Requested cutoff window, if either bound was given.
    pub fn cutoff(&self) -> Option<CutoffWindow> {
        if self.cutoff_low.is_none() && self.cutoff_high.is_none() {
            return None;
        }
        Some(CutoffWindow::new(
            self.cutoff_low.unwrap_or(0),
            self.cutoff_high.unwrap_or(u32::MAX),
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
