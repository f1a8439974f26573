use std::fmt;

use serde::Serialize;

use crate::format::SliceGeometry;

// =============================================================================
// StreamState
// =============================================================================

/// Scheduler state between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StreamState {
    /// Nothing left to stream
    #[default]
    Idle,

    /// Batches remain before `num_slices` is reached
    Draining,

    /// Progress was discarded; the next tick clears the grid and restarts at 0
    Invalidated,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamState::Idle => "idle",
            StreamState::Draining => "draining",
            StreamState::Invalidated => "invalidated",
        })
    }
}

// =============================================================================
// CutoffWindow
// =============================================================================

/// Intensity window `[low, high]` applied downstream to voxel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CutoffWindow {
    pub low: u32,
    pub high: u32,
}

impl CutoffWindow {
    pub fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Largest representable sample for the given pixel width.
    pub fn max_value(bytes_per_pixel: u32) -> u32 {
        match bytes_per_pixel {
            0 => 0,
            1..=3 => (1u32 << (8 * bytes_per_pixel)) - 1,
            _ => u32::MAX,
        }
    }

    /// Clamp both bounds into `[0, 2^(8*bytes_per_pixel) - 1]`.
    pub fn clamped(self, bytes_per_pixel: u32) -> Self {
        let max = Self::max_value(bytes_per_pixel);
        Self::new(self.low.min(max), self.high.min(max))
    }

    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        value >= self.low && value <= self.high
    }
}

impl Default for CutoffWindow {
    fn default() -> Self {
        Self::new(0, u32::MAX)
    }
}

// =============================================================================
// StreamCursor
// =============================================================================

/// Progress of the active volume through the scheduler.
///
/// `current_slice <= num_slices` holds between batches; the index only moves
/// forward by the size of each streamed batch and returns to 0 only through
/// [`StreamCursor::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreamCursor {
    pub current_slice: u32,
    pub batch_size: u32,
    pub num_slices: u32,
    pub slice_width: u32,
    pub slice_height: u32,
    pub bytes_per_pixel: u32,
}

impl StreamCursor {
    pub fn new(num_slices: u32, batch_size: u32, geometry: Option<SliceGeometry>) -> Self {
        let geometry = geometry.unwrap_or(SliceGeometry {
            width: 0,
            height: 0,
            channels: 0,
            bytes_per_channel: 0,
        });
        Self {
            current_slice: 0,
            batch_size,
            num_slices,
            slice_width: geometry.width,
            slice_height: geometry.height,
            bytes_per_pixel: geometry.bytes_per_pixel(),
        }
    }

    pub fn reset(&mut self) {
        self.current_slice = 0;
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current_slice >= self.num_slices
    }

    /// Slices in the next batch: a full batch, or the tail.
    pub fn next_batch_len(&self) -> u32 {
        self.batch_size
            .min(self.num_slices.saturating_sub(self.current_slice))
    }

    pub fn advance(&mut self, count: u32) {
        debug_assert!(count <= self.next_batch_len());
        self.current_slice = (self.current_slice + count).min(self.num_slices);
    }
}
