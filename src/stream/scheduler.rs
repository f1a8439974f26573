//! Batch streaming scheduler.
//!
//! The scheduler walks the slices of the selected volume in batches sized to
//! fit the staging buffer. Each batch is decoded, copied into the staging
//! buffer, and handed to the [`IngestionSink`]; the next batch is not
//! written until the sink's `ingest_batch` future has completed.
//!
//! # States
//!
//! ```text
//!              select_volume / set_cutoff (changed)
//!   ┌──────┐  ───────────────────────────────────▶  ┌─────────────┐
//!   │ Idle │                                         │ Invalidated │
//!   └──────┘  ◀──── last batch streamed ──┐          └──────┬──────┘
//!                                         │   tick: reset,  │
//!                                   ┌─────┴────┐ clear grid │
//!                                   │ Draining │ ◀──────────┘
//!                                   └──────────┘
//! ```
//!
//! In staggered mode a tick streams at most one batch and returns, leaving
//! the rest for later ticks. Otherwise a tick drains every remaining batch.
//! A failed tick drops straight to `Idle` without retrying.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::StreamError;
use crate::format::{decode_slice, SliceGeometry};
use crate::io::SliceSource;
use crate::volume::{VolumeDescriptor, VolumeScan, VolumeScanner, DEFAULT_MAX_SLICES};

use super::{CutoffWindow, IngestionSink, StagedBatch, StagingBuffer, StreamCursor, StreamState};

// =============================================================================
// Configuration
// =============================================================================

/// Default staging buffer capacity: 64MB
pub const DEFAULT_STAGING_CAPACITY: usize = 64 * 1024 * 1024;

/// Scheduler settings fixed for the lifetime of a streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Upper bound on the staging buffer size in bytes
    pub staging_capacity: usize,

    /// Optional cap on slices per batch
    pub max_batch_size: Option<u32>,

    /// Slices probed when scanning a volume
    pub max_slices: u32,

    /// Blocks of the low-resolution reserve kept across invalidations
    pub block_count_l0: u32,

    /// Total blocks in the voxel grid
    pub total_block_count: u32,

    /// Stream one batch per tick instead of draining
    pub staggered: bool,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            staging_capacity: DEFAULT_STAGING_CAPACITY,
            max_batch_size: None,
            max_slices: DEFAULT_MAX_SLICES,
            block_count_l0: 0,
            total_block_count: 0,
            staggered: false,
        }
    }
}

impl StreamerConfig {
    /// Slices per batch for slices of `slice_byte_size` bytes.
    pub fn batch_size_for(&self, slice_byte_size: usize) -> Result<u32, StreamError> {
        let cap = self.max_batch_size.unwrap_or(u32::MAX).max(1);
        if slice_byte_size == 0 {
            return Ok(1);
        }
        if slice_byte_size > self.staging_capacity {
            return Err(StreamError::StagingTooSmall {
                required: slice_byte_size,
                capacity: self.staging_capacity,
            });
        }
        let fit = (self.staging_capacity / slice_byte_size).min(u32::MAX as usize) as u32;
        Ok(fit.min(cap))
    }
}

// =============================================================================
// Reports
// =============================================================================

/// One batch handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub start_slice: u32,
    pub slice_count: u32,
    pub slice_byte_size: usize,
}

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Whether the voxel grid was cleared at the start of the tick
    pub cleared: bool,

    /// Batches streamed, in order
    pub batches: Vec<BatchReport>,

    /// State after the tick
    pub state: StreamState,
}

// =============================================================================
// SliceStreamer
// =============================================================================

/// The active volume and where its geometry came from.
#[derive(Debug, Clone)]
struct ActiveVolume {
    descriptor: VolumeDescriptor,
    geometry: Option<SliceGeometry>,
}

/// Streams slice batches of the selected volume into an [`IngestionSink`].
pub struct SliceStreamer<S: SliceSource, K: IngestionSink> {
    source: S,
    sink: K,
    config: StreamerConfig,
    volume: Option<ActiveVolume>,
    cursor: StreamCursor,
    state: StreamState,
    /// Window as last requested by the caller
    requested_cutoff: CutoffWindow,
    /// `requested_cutoff` clamped to the active volume's sample range
    cutoff: CutoffWindow,
    staging: StagingBuffer,
}

impl<S: SliceSource, K: IngestionSink> SliceStreamer<S, K> {
    pub fn new(source: S, sink: K, config: StreamerConfig) -> Self {
        Self {
            source,
            sink,
            config,
            volume: None,
            cursor: StreamCursor::default(),
            state: StreamState::Idle,
            requested_cutoff: CutoffWindow::default(),
            cutoff: CutoffWindow::default(),
            staging: StagingBuffer::default(),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }

    pub fn cutoff(&self) -> CutoffWindow {
        self.cutoff
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn set_staggered(&mut self, staggered: bool) {
        self.config.staggered = staggered;
    }

    /// Scan `volume` and make it the streaming target.
    ///
    /// Progress on the previous volume is discarded; the next tick clears
    /// the voxel grid and starts again from slice 0. On error the previous
    /// volume stays selected.
    pub async fn select_volume(
        &mut self,
        volume: VolumeDescriptor,
    ) -> Result<VolumeScan, StreamError> {
        let scan = VolumeScanner::new(&self.source)
            .with_max_slices(self.config.max_slices)
            .scan(&volume)
            .await?;

        let slice_byte_size = scan.geometry.map(|g| g.byte_size()).unwrap_or(0);
        let batch_size = self.config.batch_size_for(slice_byte_size)?;

        self.staging = StagingBuffer::new(batch_size, slice_byte_size);
        self.cursor = StreamCursor::new(scan.num_slices, batch_size, scan.geometry);
        self.cutoff = self.clamp_cutoff(self.requested_cutoff);
        self.volume = Some(ActiveVolume {
            descriptor: volume,
            geometry: scan.geometry,
        });
        self.state = StreamState::Invalidated;

        info!(
            num_slices = scan.num_slices,
            batch_size,
            staging_bytes = self.staging.capacity(),
            "volume selected"
        );
        Ok(scan)
    }

    /// Change the cutoff window.
    ///
    /// The window is clamped to the active volume's sample range and
    /// re-clamped whenever another volume is selected. A change of the
    /// clamped window invalidates all streamed progress.
    pub fn set_cutoff(&mut self, cutoff: CutoffWindow) {
        self.requested_cutoff = cutoff;
        let cutoff = self.clamp_cutoff(cutoff);
        if cutoff == self.cutoff {
            return;
        }

        debug!(low = cutoff.low, high = cutoff.high, "cutoff window changed");
        self.cutoff = cutoff;
        if self.volume.is_some() {
            self.state = StreamState::Invalidated;
        }
    }

    fn clamp_cutoff(&self, cutoff: CutoffWindow) -> CutoffWindow {
        match self.cursor.bytes_per_pixel {
            0 => cutoff,
            bytes_per_pixel => cutoff.clamped(bytes_per_pixel),
        }
    }

    /// Run one scheduler step.
    ///
    /// A failure is fatal for the current volume: the cursor stays where the
    /// last completed batch put it and the scheduler goes idle. Streaming
    /// resumes only after `select_volume` or a cutoff change.
    pub async fn tick(&mut self) -> Result<TickReport, StreamError> {
        let result = self.step().await;
        if let Err(e) = &result {
            warn!(
                current_slice = self.cursor.current_slice,
                error = %e,
                "streaming stopped"
            );
            if self.volume.is_some() {
                self.state = StreamState::Idle;
            }
        }
        result
    }

    async fn step(&mut self) -> Result<TickReport, StreamError> {
        if self.volume.is_none() {
            return Err(StreamError::NoVolume);
        }

        let mut report = TickReport::default();

        if self.state == StreamState::Invalidated {
            self.cursor.reset();
            let start = self.config.block_count_l0;
            let count = self
                .config
                .total_block_count
                .saturating_sub(self.config.block_count_l0);
            debug!(start_block = start, block_count = count, "clearing streamed blocks");
            self.sink.clear_region(start, count).await?;
            report.cleared = true;

            self.state = if self.cursor.num_slices > 0 {
                StreamState::Draining
            } else {
                StreamState::Idle
            };
        }

        while self.state == StreamState::Draining {
            let batch = self.stream_batch().await?;
            report.batches.push(batch);

            if self.cursor.is_complete() {
                info!(num_slices = self.cursor.num_slices, "volume fully streamed");
                self.state = StreamState::Idle;
            } else if self.config.staggered {
                break;
            }
        }

        report.state = self.state;
        Ok(report)
    }

    /// Tick until the scheduler is idle, returning every batch streamed.
    pub async fn run_to_idle(&mut self) -> Result<Vec<BatchReport>, StreamError> {
        let mut batches = Vec::new();
        loop {
            let report = self.tick().await?;
            batches.extend(report.batches);
            if report.state == StreamState::Idle {
                return Ok(batches);
            }
        }
    }

    async fn stream_batch(&mut self) -> Result<BatchReport, StreamError> {
        let active = self.volume.as_ref().ok_or(StreamError::NoVolume)?;
        let start_slice = self.cursor.current_slice;
        let slice_count = self.cursor.next_batch_len();
        let mut batch_geometry = None;

        for slot in 0..slice_count {
            let path = active.descriptor.slice_path(start_slice + slot);
            let data = self.source.read(&path).await?;
            let image = decode_slice(data).map_err(|source| StreamError::Tiff {
                path: path.clone(),
                source,
            })?;

            let geometry = image.geometry();
            check_geometry(&path, active.geometry, geometry)?;
            batch_geometry.get_or_insert(geometry);

            self.staging.write_slice(slot, &image.pixels)?;
        }

        let Some(geometry) = batch_geometry else {
            warn!(start_slice, "empty batch requested");
            return Ok(BatchReport {
                start_slice,
                slice_count: 0,
                slice_byte_size: 0,
            });
        };
        let slice_byte_size = geometry.byte_size();

        self.sink
            .ingest_batch(StagedBatch {
                bytes: self.staging.filled(slice_count),
                slice_byte_size,
                start_slice,
                slice_count,
                geometry,
                cutoff: self.cutoff,
            })
            .await?;

        self.cursor.advance(slice_count);
        debug!(
            start_slice,
            slice_count,
            current_slice = self.cursor.current_slice,
            "batch streamed"
        );

        Ok(BatchReport {
            start_slice,
            slice_count,
            slice_byte_size,
        })
    }
}

fn check_geometry(
    path: &Path,
    expected: Option<SliceGeometry>,
    actual: SliceGeometry,
) -> Result<(), StreamError> {
    match expected {
        Some(expected) if expected != actual => Err(StreamError::GeometryMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
        _ => Ok(()),
    }
}
