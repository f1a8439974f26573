//! Ingestion sink seam.
//!
//! The sink is whatever consumes staged slices: in a renderer, a compute
//! pass that voxelizes the staging buffer into the block grid. The
//! scheduler only needs two operations from it, and awaits each one; a
//! returned `ingest_batch` future is the signal that the staging bytes have
//! been fully read and may be overwritten.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::SinkError;
use crate::format::SliceGeometry;

use super::CutoffWindow;

/// One batch of slices as laid out in the staging buffer.
#[derive(Debug, Clone, Copy)]
pub struct StagedBatch<'a> {
    /// `slice_count * slice_byte_size` bytes, slice `i` at `i * slice_byte_size`
    pub bytes: &'a [u8],
    pub slice_byte_size: usize,
    /// Volume index of the first slice in the batch
    pub start_slice: u32,
    pub slice_count: u32,
    pub geometry: SliceGeometry,
    pub cutoff: CutoffWindow,
}

impl<'a> StagedBatch<'a> {
    /// Pixels of slice `index` within the batch.
    pub fn slice(&self, index: u32) -> Option<&'a [u8]> {
        if index >= self.slice_count {
            return None;
        }
        let start = index as usize * self.slice_byte_size;
        self.bytes.get(start..start + self.slice_byte_size)
    }
}

/// Consumer of staged slice batches.
#[async_trait]
pub trait IngestionSink: Send {
    /// Discard `block_count` voxel blocks starting at `start_block`.
    async fn clear_region(&mut self, start_block: u32, block_count: u32)
        -> Result<(), SinkError>;

    /// Consume a batch. Must not return before `batch.bytes` has been read.
    async fn ingest_batch<'a>(&mut self, batch: StagedBatch<'a>) -> Result<(), SinkError>;
}

// =============================================================================
// VoxelStatsSink
// =============================================================================

/// Running totals gathered by [`VoxelStatsSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoxelStats {
    pub batches: u64,
    pub slices: u64,
    pub samples: u64,
    pub samples_in_window: u64,
    pub clears: u64,
    pub cleared_blocks: u64,
}

/// Sink that thresholds each batch against its cutoff window and keeps counts.
///
/// Useful for dry runs of a volume without a GPU behind the scheduler.
#[derive(Debug, Default)]
pub struct VoxelStatsSink {
    stats: VoxelStats,
}

impl VoxelStatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> VoxelStats {
        self.stats
    }
}

/// Count samples of `bytes_per_channel` little-endian bytes inside `cutoff`.
pub fn count_in_window(bytes: &[u8], bytes_per_channel: u32, cutoff: CutoffWindow) -> (u64, u64) {
    let width = bytes_per_channel.clamp(1, 4) as usize;
    let stride = bytes_per_channel.max(1) as usize;
    let mut total = 0u64;
    let mut inside = 0u64;
    for sample in bytes.chunks_exact(stride) {
        let value = sample[..width]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        total += 1;
        if cutoff.contains(value) {
            inside += 1;
        }
    }
    (total, inside)
}

#[async_trait]
impl IngestionSink for VoxelStatsSink {
    async fn clear_region(
        &mut self,
        start_block: u32,
        block_count: u32,
    ) -> Result<(), SinkError> {
        debug!(start_block, block_count, "clearing voxel blocks");
        self.stats.clears += 1;
        self.stats.cleared_blocks += block_count as u64;
        Ok(())
    }

    async fn ingest_batch<'a>(&mut self, batch: StagedBatch<'a>) -> Result<(), SinkError> {
        let (mut total, mut inside) = (0u64, 0u64);
        for slice in (0..batch.slice_count).filter_map(|i| batch.slice(i)) {
            let (t, n) = count_in_window(slice, batch.geometry.bytes_per_channel, batch.cutoff);
            total += t;
            inside += n;
        }
        debug!(
            start_slice = batch.start_slice,
            slice_count = batch.slice_count,
            samples = total,
            in_window = inside,
            "ingested batch"
        );
        self.stats.batches += 1;
        self.stats.slices += batch.slice_count as u64;
        self.stats.samples += total;
        self.stats.samples_in_window += inside;
        Ok(())
    }
}
