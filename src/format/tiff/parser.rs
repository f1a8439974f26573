//! TIFF header parsing.
//!
//! # Header Structure (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (must be 0x4949 = little-endian "II")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first directory (4 bytes)
//! ```
//!
//! Big-endian ("MM") files and BigTIFF (version 43) are rejected with
//! [`TiffError::UnsupportedFormat`].

use crate::error::TiffError;
use crate::io::ByteCursor;

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
pub const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Version number for classic TIFF
pub const VERSION_TIFF: u16 = 42;

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Offset to the first directory in the file
    pub first_ifd_offset: u32,
}

impl TiffHeader {
    /// Parse the header at the cursor's current position, leaving the
    /// cursor just past it.
    ///
    /// # Errors
    /// - `OutOfBounds` if fewer than 8 bytes remain
    /// - `UnsupportedFormat` if the byte order is not `II` or the version is not 42
    pub fn parse(cursor: &mut ByteCursor) -> Result<Self, TiffError> {
        let byte_order = cursor.read::<u16>()?;
        if byte_order != BYTE_ORDER_LITTLE_ENDIAN {
            return Err(TiffError::unsupported(format!(
                "byte order 0x{byte_order:04X}, only little-endian (0x4949) is supported"
            )));
        }

        let version = cursor.read::<u16>()?;
        if version != VERSION_TIFF {
            return Err(TiffError::unsupported(format!(
                "version {version}, expected {VERSION_TIFF}"
            )));
        }

        let first_ifd_offset = cursor.read::<u32>()?;
        Ok(TiffHeader { first_ifd_offset })
    }
}

// =============================================================================
// Tests
// =============================================================================
