//! Baseline TIFF decoder for CT slices.
//!
//! This module handles the narrow TIFF subset produced by CT scanners and
//! slice exporters: a single little-endian image stored as strips that are
//! either uncompressed or PackBits encoded.
//!
//! # Key Concepts
//!
//! - **Byte order**: only `II` (little-endian) files are accepted. Every
//!   multi-byte value is decoded through [`crate::io::ByteCursor`].
//!
//! - **Directory (IFD)**: a list of tagged fields describing the image.
//!   Chained directories are walked, later values overwrite earlier ones.
//!
//! - **Strips**: contiguous runs of rows, located through two parallel
//!   arrays (offsets and byte counts) whose element width follows the
//!   declared field type.

mod decoder;
mod directory;
mod packbits;
mod parser;
mod tags;

pub use decoder::{decode_slice, read_geometry, SliceGeometry, SliceImage};
pub use directory::{
    DirectoryEntry, ImageDirectory, StripArray, StripTable, IFD_ENTRY_SIZE, MAX_DIRECTORIES,
};
pub use packbits::{copy_raw, unpack_bits};
pub use parser::{TiffHeader, BYTE_ORDER_LITTLE_ENDIAN, VERSION_TIFF};
pub use tags::{Compression, FieldType, TiffTag};
