//! # CT Slice Streamer
//!
//! Decode stacks of CT-scan slices stored as baseline TIFF files and stream
//! them, a bounded batch at a time, into a voxel ingestion pipeline.
//!
//! A scanned volume can hold thousands of slices, far more than fit in one
//! upload. This crate walks the slices in batches sized to a fixed staging
//! buffer and hands each batch to an [`IngestionSink`], either one batch per
//! driving tick or draining the whole volume in one call.
//!
//! ## Architecture
//!
//! - [`io`] - Bounds-checked byte cursor and slice file sources
//! - [`mod@format`] - Baseline TIFF decoding (directory walk, PackBits strips)
//! - [`volume`] - Volume naming, catalog file, and slice scanning
//! - [`stream`] - Batch streaming scheduler, staging buffer, sink seam
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use ct_slice_streamer::{
//!     LocalSliceSource, SliceStreamer, StreamerConfig, VolumeDescriptor, VoxelStatsSink,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut streamer = SliceStreamer::new(
//!         LocalSliceSource::new(),
//!         VoxelStatsSink::new(),
//!         StreamerConfig::default(),
//!     );
//!
//!     streamer
//!         .select_volume(VolumeDescriptor::new("/data/bison", "bison_", ".tif"))
//!         .await?;
//!     streamer.run_to_idle().await?;
//!
//!     println!("{:?}", streamer.sink().stats());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod stream;
pub mod volume;

// Re-export commonly used types
pub use config::{Cli, Command, DecodeConfig, OutputFormat, ScanConfig, StreamConfig, VolumesConfig};
pub use error::{ConfigError, IoError, ScanError, SinkError, StreamError, TiffError};
pub use format::tiff::{
    copy_raw, decode_slice, read_geometry, unpack_bits, Compression, DirectoryEntry, FieldType,
    ImageDirectory, SliceGeometry, SliceImage, StripArray, StripTable, TiffHeader, TiffTag,
};
pub use io::{ByteCursor, LeRead, LocalSliceSource, SeekGuard, SliceSource};
pub use stream::{
    BatchReport, CutoffWindow, IngestionSink, SliceStreamer, StagedBatch, StagingBuffer,
    StreamCursor, StreamState, StreamerConfig, TickReport, VoxelStats, VoxelStatsSink,
};
pub use volume::{VolumeCatalog, VolumeDescriptor, VolumeScan, VolumeScanner};
