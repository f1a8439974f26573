//! Slice file formats.
//!
//! Only baseline TIFF is supported. Use [`tiff::decode_slice`] to decode a
//! whole file buffer, or [`tiff::read_geometry`] to inspect its layout.

pub mod tiff;

pub use tiff::{decode_slice, read_geometry, SliceGeometry, SliceImage};
