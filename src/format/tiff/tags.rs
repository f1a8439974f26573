//! TIFF tag, field type and compression codes.
//!
//! Only the vocabulary needed to locate and interpret pixel strips of a
//! baseline little-endian slice is defined here. Anything else in a
//! directory is skipped during parsing.

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// The strip pointer stride depends on this: SHORT arrays use 2-byte
/// elements, everything else is read as 4-byte elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer (1 byte)
    Byte = 1,

    /// 8-bit ASCII character (1 byte)
    Ascii = 2,

    /// Unsigned 16-bit integer (2 bytes)
    Short = 3,

    /// Unsigned 32-bit integer (4 bytes)
    Long = 4,

    /// Two LONGs: numerator and denominator (8 bytes)
    Rational = 5,

    /// Undefined byte data (1 byte per element)
    Undefined = 7,
}

impl FieldType {
    /// Element stride used when indexing a strip pointer array.
    ///
    /// The raw type code is used so that unknown types fall back to 4 bytes.
    #[inline]
    pub const fn strip_stride(raw: u16) -> usize {
        if raw == FieldType::Short as u16 {
            2
        } else {
            4
        }
    }

    /// Maximum bytes that can be stored inline in a directory entry.
    pub const INLINE_THRESHOLD: usize = 4;
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs the slice decoder acts on.
///
/// Tags not listed here are ignored during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    /// Image width in pixels
    ImageWidth = 256,

    /// Image height (length) in pixels
    ImageLength = 257,

    /// Bits per sample (must be a multiple of 8)
    BitsPerSample = 258,

    /// Compression scheme used
    Compression = 259,

    /// Byte offsets of strips
    StripOffsets = 273,

    /// Number of components per pixel
    SamplesPerPixel = 277,

    /// Row count per strip
    RowsPerStrip = 278,

    /// Byte counts of strips
    StripByteCounts = 279,
}

impl TiffTag {
    /// Create a TiffTag from its numeric value.
    ///
    /// Returns `None` for unrecognized tags. Unknown tags are not an error;
    /// they are simply ignored during parsing.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            256 => Some(TiffTag::ImageWidth),
            257 => Some(TiffTag::ImageLength),
            258 => Some(TiffTag::BitsPerSample),
            259 => Some(TiffTag::Compression),
            273 => Some(TiffTag::StripOffsets),
            277 => Some(TiffTag::SamplesPerPixel),
            278 => Some(TiffTag::RowsPerStrip),
            279 => Some(TiffTag::StripByteCounts),
            _ => None,
        }
    }
}

// =============================================================================
// Compression Values
// =============================================================================

/// Strip compression schemes the decoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum Compression {
    /// Raw bytes, copied verbatim
    #[default]
    None = 1,

    /// Apple PackBits run-length encoding
    PackBits = 32773,
}

impl Compression {
    /// Create a Compression from its numeric value.
    ///
    /// Returns `None` for every scheme outside the supported subset.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            32773 => Some(Compression::PackBits),
            _ => None,
        }
    }

    /// Get a human-readable name for the compression scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::PackBits => "PackBits",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
