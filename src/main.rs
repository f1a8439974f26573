//! CT Slice Streamer - command-line front end.
//!
//! Lists catalog volumes, scans and decodes slices, and drives the batch
//! scheduler against a statistics sink.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ct_slice_streamer::{
    config::{Cli, Command, DecodeConfig, OutputFormat, ScanConfig, StreamConfig, VolumesConfig},
    decode_slice,
    volume::{VolumeCatalog, VolumeDescriptor, VolumeScanner},
    LocalSliceSource, SliceSource, SliceStreamer, StreamState, VoxelStatsSink,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Volumes(config) => run_volumes(config),
        Command::Scan(config) => run_scan(config).await,
        Command::Decode(config) => run_decode(config).await,
        Command::Stream(config) => run_stream(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "ct_slice_streamer=debug"
    } else {
        "ct_slice_streamer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load the catalog and pick a volume, reporting failures.
fn select_descriptor(catalog: &std::path::Path, index: usize) -> Result<VolumeDescriptor, String> {
    let catalog = VolumeCatalog::load(catalog).map_err(|e| e.to_string())?;
    catalog.get(index).cloned().ok_or_else(|| {
        format!(
            "volume index {} out of range, catalog has {} volume(s)",
            index,
            catalog.len()
        )
    })
}

// =============================================================================
// Volumes Command
// =============================================================================

fn run_volumes(config: VolumesConfig) -> ExitCode {
    let catalog = match VolumeCatalog::load(&config.catalog) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        OutputFormat::Json => print_json(&catalog.volumes()),
        OutputFormat::Text => {
            if catalog.is_empty() {
                println!("(no volumes in catalog)");
            }
            for (index, volume) in catalog.volumes().iter().enumerate() {
                println!("{:>3}  {}", index, volume);
            }
            ExitCode::SUCCESS
        }
    }
}

// =============================================================================
// Scan Command
// =============================================================================

async fn run_scan(config: ScanConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let descriptor = match select_descriptor(&config.volume.catalog, config.volume.volume) {
        Ok(d) => d,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let source = LocalSliceSource::new();
    let scan = match VolumeScanner::new(&source)
        .with_max_slices(config.volume.max_slices)
        .scan(&descriptor)
        .await
    {
        Ok(scan) => scan,
        Err(e) => {
            error!("Scan failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "volume": descriptor,
            "num_slices": scan.num_slices,
            "geometry": scan.geometry,
        })),
        OutputFormat::Text => {
            println!("Volume:  {}", descriptor);
            println!("Slices:  {}", scan.num_slices);
            match scan.geometry {
                Some(geometry) => {
                    println!("Slice:   {}", geometry);
                    println!(
                        "Size:    {:.2} MB per slice",
                        geometry.byte_size() as f64 / (1024.0 * 1024.0)
                    );
                }
                None => println!("Slice:   (no slices found)"),
            }
            ExitCode::SUCCESS
        }
    }
}

// =============================================================================
// Decode Command
// =============================================================================

async fn run_decode(config: DecodeConfig) -> ExitCode {
    init_logging(config.verbose);

    let source = LocalSliceSource::new();
    let data = match source.read(&config.file).await {
        Ok(data) => data,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let image = match decode_slice(data) {
        Ok(image) => image,
        Err(e) => {
            error!("Failed to decode {}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let range = image.intensity_range();

    match config.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "file": config.file,
            "geometry": image.geometry(),
            "bytes": image.pixels.len(),
            "intensity_range": range,
        })),
        OutputFormat::Text => {
            println!("File:      {}", config.file.display());
            println!("Slice:     {}", image.geometry());
            println!("Bytes:     {}", image.pixels.len());
            if let Some((lo, hi)) = range {
                println!("Intensity: {} .. {}", lo, hi);
            }
            ExitCode::SUCCESS
        }
    }
}

// =============================================================================
// Stream Command
// =============================================================================

async fn run_stream(config: StreamConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let descriptor = match select_descriptor(&config.volume.catalog, config.volume.volume) {
        Ok(d) => d,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut streamer = SliceStreamer::new(
        LocalSliceSource::new(),
        VoxelStatsSink::new(),
        config.streamer_config(),
    );

    let scan = match streamer.select_volume(descriptor.clone()).await {
        Ok(scan) => scan,
        Err(e) => {
            error!("Failed to select {}: {}", descriptor, e);
            return ExitCode::FAILURE;
        }
    };
    if scan.num_slices == 0 {
        warn!("Volume {} has no slices", descriptor);
    }

    if let Some(cutoff) = config.cutoff() {
        streamer.set_cutoff(cutoff);
    }

    let mut ticks = 0u32;
    loop {
        ticks += 1;
        match streamer.tick().await {
            Ok(report) => {
                for batch in &report.batches {
                    info!(
                        tick = ticks,
                        start_slice = batch.start_slice,
                        slice_count = batch.slice_count,
                        "streamed batch"
                    );
                }
                if report.state == StreamState::Idle {
                    break;
                }
            }
            Err(e) => {
                let cursor = streamer.cursor();
                error!(
                    "Streaming aborted at slice {}/{}: {}",
                    cursor.current_slice, cursor.num_slices, e
                );
                return ExitCode::FAILURE;
            }
        }
    }

    let cutoff = streamer.cutoff();
    let stats = streamer.sink().stats();

    match config.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "volume": descriptor,
            "ticks": ticks,
            "cutoff": cutoff,
            "stats": stats,
        })),
        OutputFormat::Text => {
            println!("Volume:     {}", descriptor);
            println!("Ticks:      {}", ticks);
            println!("Batches:    {}", stats.batches);
            println!("Slices:     {}", stats.slices);
            println!("Cutoff:     [{}, {}]", cutoff.low, cutoff.high);
            let pct = if stats.samples > 0 {
                100.0 * stats.samples_in_window as f64 / stats.samples as f64
            } else {
                0.0
            };
            println!(
                "In window:  {} / {} samples ({:.1}%)",
                stats.samples_in_window, stats.samples, pct
            );
            ExitCode::SUCCESS
        }
    }
}
