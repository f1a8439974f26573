//! Whole-slice decoding.
//!
//! Combines the directory walk with strip decompression to turn one file
//! buffer into a flat, row-major, channel-interleaved pixel buffer.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::error::TiffError;
use crate::io::ByteCursor;

use super::directory::{ImageDirectory, StripTable};
use super::packbits::{copy_raw, unpack_bits};
use super::tags::Compression;

// =============================================================================
// SliceGeometry
// =============================================================================

/// Pixel layout of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SliceGeometry {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub bytes_per_channel: u32,
}

impl SliceGeometry {
    /// Bytes per pixel across all channels, saturating at `u32::MAX`.
    #[inline]
    pub fn bytes_per_pixel(&self) -> u32 {
        self.channels.saturating_mul(self.bytes_per_channel)
    }

    /// Total byte size of one decoded slice, saturating at `usize::MAX`.
    ///
    /// Geometries returned by [`read_geometry`] and [`decode_slice`] never
    /// saturate.
    #[inline]
    pub fn byte_size(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(self.channels as usize)
            .saturating_mul(self.bytes_per_channel as usize)
    }
}

impl fmt::Display for SliceGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} x{} @ {} byte(s)",
            self.width, self.height, self.channels, self.bytes_per_channel
        )
    }
}

impl From<&ImageDirectory> for SliceGeometry {
    fn from(dir: &ImageDirectory) -> Self {
        SliceGeometry {
            width: dir.width,
            height: dir.height,
            channels: dir.channels,
            bytes_per_channel: dir.bytes_per_channel,
        }
    }
}

// =============================================================================
// SliceImage
// =============================================================================

/// A decoded slice; `pixels.len() == geometry.byte_size()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceImage {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub bytes_per_channel: u32,
    pub pixels: Bytes,
}

impl SliceImage {
    pub fn geometry(&self) -> SliceGeometry {
        SliceGeometry {
            width: self.width,
            height: self.height,
            channels: self.channels,
            bytes_per_channel: self.bytes_per_channel,
        }
    }

    /// Smallest and largest sample value, or `None` for an empty image.
    ///
    /// Multi-byte samples are read little-endian; widths above 4 bytes are
    /// truncated to their low 4 bytes.
    pub fn intensity_range(&self) -> Option<(u32, u32)> {
        let step = self.bytes_per_channel.clamp(1, 4) as usize;
        let stride = self.bytes_per_channel.max(1) as usize;
        self.pixels
            .chunks_exact(stride)
            .map(|sample| {
                sample[..step]
                    .iter()
                    .rev()
                    .fold(0u32, |acc, &b| (acc << 8) | b as u32)
            })
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Read only the directory of a file and report its geometry.
pub fn read_geometry(data: Bytes) -> Result<SliceGeometry, TiffError> {
    let mut cursor = ByteCursor::new(data);
    let dir = ImageDirectory::parse(&mut cursor)?;
    dir.expected_size()?;
    Ok(SliceGeometry::from(&dir))
}

/// Upper bound on the bytes the strips of `table` can expand to.
///
/// A 2-byte PackBits repeat run yields at most 128 bytes.
fn max_decoded_size(
    cursor: &mut ByteCursor,
    table: &StripTable,
    compression: Compression,
) -> Result<usize, TiffError> {
    let mut source = 0usize;
    for index in 0..table.strip_count() {
        let (_, byte_count) = table.strip(cursor, index)?;
        source = source.saturating_add(byte_count);
    }
    Ok(match compression {
        Compression::PackBits => source.saturating_mul(64),
        Compression::None => source,
    })
}

/// Decode a complete slice file.
///
/// # Errors
/// - `UnsupportedFormat` for byte order, version, bit depth or compression
///   outside the supported subset
/// - `MalformedDirectory` if no strips are described or the size overflows
/// - `OutOfBounds` if any structure or strip lies outside the buffer
/// - `BufferOverrun` if strips expand past the expected pixel size
/// - `TruncatedImage` if strips expand, or could expand, to less than the
///   expected pixel size
pub fn decode_slice(data: Bytes) -> Result<SliceImage, TiffError> {
    let mut cursor = ByteCursor::new(data);
    let dir = ImageDirectory::parse(&mut cursor)?;
    let table = dir.strip_table()?;

    let expected = dir.expected_size()?;
    let limit = max_decoded_size(&mut cursor, &table, dir.compression)?;
    if expected > limit {
        return Err(TiffError::TruncatedImage {
            expected,
            actual: limit,
        });
    }
    let mut pixels = vec![0u8; expected];
    let mut written = 0usize;

    debug!(
        width = dir.width,
        height = dir.height,
        channels = dir.channels,
        bytes_per_channel = dir.bytes_per_channel,
        strips = table.strip_count(),
        rows_per_strip = table.rows_per_strip,
        compression = dir.compression.name(),
        "decoding slice"
    );

    for index in 0..table.strip_count() {
        let (offset, byte_count) = table.strip(&mut cursor, index)?;
        written += match dir.compression {
            Compression::PackBits => {
                unpack_bits(&mut cursor, offset, byte_count, &mut pixels, written)?
            }
            Compression::None => copy_raw(&mut cursor, offset, byte_count, &mut pixels, written)?,
        };
    }

    if written != expected {
        return Err(TiffError::TruncatedImage {
            expected,
            actual: written,
        });
    }

    Ok(SliceImage {
        width: dir.width,
        height: dir.height,
        channels: dir.channels,
        bytes_per_channel: dir.bytes_per_channel,
        pixels: Bytes::from(pixels),
    })
}
