//! Bounded batch streaming of decoded slices.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        driver (one tick per frame)      │
//! └────────────────────┬────────────────────┘
//!                      │ tick()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             SliceStreamer               │
//! │  (StreamCursor, CutoffWindow, state)    │
//! └─────────┬─────────────────────┬─────────┘
//!           │ read + decode       │ stage + ingest
//!           ▼                     ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │   SliceSource   │    │ StagingBuffer  ──▶  │
//! │  (slice files)  │    │   IngestionSink     │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod cursor;
mod scheduler;
mod sink;
mod staging;

pub use cursor::{CutoffWindow, StreamCursor, StreamState};
pub use scheduler::{
    BatchReport, SliceStreamer, StreamerConfig, TickReport, DEFAULT_STAGING_CAPACITY,
};
pub use sink::{count_in_window, IngestionSink, StagedBatch, VoxelStats, VoxelStatsSink};
pub use staging::StagingBuffer;
