//! Image directory (IFD) walk and strip table resolution.
//!
//! # Directory Structure
//! ```text
//! 2 bytes:       entry count N
//! N * 12 bytes:  entries { tag: u16, type: u16, count: u32, value_or_offset: u32 }
//! 4 bytes:       offset of the next directory (0 = last)
//! ```
//!
//! Every directory in the chain is walked and each recognized tag overwrites
//! the value collected so far, so the last directory to mention a field wins.
//! Directories are not otherwise merged.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::TiffError;
use crate::io::ByteCursor;

use super::parser::TiffHeader;
use super::tags::{Compression, FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

/// Size of one directory entry in bytes
pub const IFD_ENTRY_SIZE: usize = 12;

/// Maximum number of chained directories to walk (safety limit)
pub const MAX_DIRECTORIES: usize = 64;

// =============================================================================
// DirectoryEntry
// =============================================================================

/// A single directory entry, consumed as soon as it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Raw tag ID
    pub tag: u16,

    /// Raw field type code
    pub field_type: u16,

    /// Number of values
    pub count: u32,

    /// Inline value, or offset of the value array
    pub value_or_offset: u32,
}

impl DirectoryEntry {
    /// Read one entry at the cursor position.
    pub fn read(cursor: &mut ByteCursor) -> Result<Self, TiffError> {
        Ok(DirectoryEntry {
            tag: cursor.read::<u16>()?,
            field_type: cursor.read::<u16>()?,
            count: cursor.read::<u32>()?,
            value_or_offset: cursor.read::<u32>()?,
        })
    }

    /// Whether the values fit in the 4-byte inline field.
    fn is_inline(&self, element_size: usize) -> bool {
        (self.count as usize).saturating_mul(element_size) <= FieldType::INLINE_THRESHOLD
    }

    /// The entry's scalar value, honoring SHORT left-justification.
    fn inline_scalar(&self) -> u32 {
        if self.field_type == FieldType::Short as u16 {
            self.value_or_offset & 0xFFFF
        } else {
            self.value_or_offset
        }
    }

    /// First value of the entry, following the offset when it does not fit inline.
    fn first_value(&self, cursor: &mut ByteCursor) -> Result<u32, TiffError> {
        let size = FieldType::strip_stride(self.field_type);
        if self.is_inline(size) {
            return Ok(self.inline_scalar());
        }
        let mut guard = cursor.seek_scoped(self.value_or_offset as usize)?;
        if size == 2 {
            Ok(guard.read::<u16>()? as u32)
        } else {
            guard.read::<u32>()
        }
    }
}

// =============================================================================
// StripArray / StripTable
// =============================================================================

/// Location of a strip offsets or byte counts array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripArray {
    /// Number of elements
    pub count: u32,

    /// Element size in bytes (2 for SHORT, otherwise 4)
    pub stride: usize,

    /// Inline values, or offset of the array in the file
    pub value_or_offset: u32,
}

impl StripArray {
    fn from_entry(entry: &DirectoryEntry) -> Self {
        StripArray {
            count: entry.count,
            stride: FieldType::strip_stride(entry.field_type),
            value_or_offset: entry.value_or_offset,
        }
    }

    fn is_inline(&self) -> bool {
        (self.count as usize).saturating_mul(self.stride) <= FieldType::INLINE_THRESHOLD
    }

    /// Element `index`, read without disturbing the cursor position.
    pub fn get(&self, cursor: &mut ByteCursor, index: u32) -> Result<u32, TiffError> {
        if index >= self.count {
            return Err(TiffError::malformed(format!(
                "strip index {index} outside array of {} entries",
                self.count
            )));
        }

        if self.is_inline() {
            return Ok(match self.stride {
                2 => (self.value_or_offset >> (16 * index)) & 0xFFFF,
                _ => self.value_or_offset,
            });
        }

        let offset = self.value_or_offset as usize + index as usize * self.stride;
        let mut guard = cursor.seek_scoped(offset)?;
        match self.stride {
            2 => Ok(guard.read::<u16>()? as u32),
            _ => guard.read::<u32>(),
        }
    }
}

/// Per-strip offsets and byte counts for one decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripTable {
    pub offsets: StripArray,
    pub byte_counts: StripArray,
    pub rows_per_strip: u32,
}

impl StripTable {
    /// Number of strips in the image.
    #[inline]
    pub fn strip_count(&self) -> u32 {
        self.offsets.count
    }

    /// `(source offset, byte count)` for strip `index`.
    pub fn strip(&self, cursor: &mut ByteCursor, index: u32) -> Result<(usize, usize), TiffError> {
        let byte_count = self.byte_counts.get(cursor, index)?;
        let offset = self.offsets.get(cursor, index)?;
        Ok((offset as usize, byte_count as usize))
    }
}

// =============================================================================
// ImageDirectory
// =============================================================================

/// Fields collected from the directory chain of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDirectory {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub bytes_per_channel: u32,
    pub compression: Compression,
    pub rows_per_strip: Option<u32>,
    pub strip_offsets: Option<StripArray>,
    pub strip_byte_counts: Option<StripArray>,
}

impl Default for ImageDirectory {
    fn default() -> Self {
        ImageDirectory {
            width: 0,
            height: 0,
            channels: 1,
            bytes_per_channel: 1,
            compression: Compression::None,
            rows_per_strip: None,
            strip_offsets: None,
            strip_byte_counts: None,
        }
    }
}

impl ImageDirectory {
    /// Parse the header and walk every directory in the file.
    pub fn parse(cursor: &mut ByteCursor) -> Result<Self, TiffError> {
        cursor.seek(0)?;
        let header = TiffHeader::parse(cursor)?;

        let mut dir = ImageDirectory::default();
        let mut visited = HashSet::new();
        let mut next = header.first_ifd_offset;

        while next != 0 {
            if !visited.insert(next) {
                return Err(TiffError::malformed(format!(
                    "directory chain loops back to offset {next}"
                )));
            }
            if visited.len() > MAX_DIRECTORIES {
                return Err(TiffError::malformed(format!(
                    "more than {MAX_DIRECTORIES} chained directories"
                )));
            }

            cursor.seek(next as usize)?;
            let entry_count = cursor.read::<u16>()?;
            let table_len = entry_count as usize * IFD_ENTRY_SIZE + 4;
            if cursor.remaining() < table_len {
                return Err(TiffError::OutOfBounds {
                    offset: cursor.position(),
                    requested: table_len,
                    len: cursor.len(),
                });
            }
            debug!(offset = next, entries = entry_count, "reading directory");

            for _ in 0..entry_count {
                let entry = DirectoryEntry::read(cursor)?;
                dir.apply(cursor, &entry)?;
            }

            next = cursor.read::<u32>()?;
        }

        Ok(dir)
    }

    fn apply(&mut self, cursor: &mut ByteCursor, entry: &DirectoryEntry) -> Result<(), TiffError> {
        let Some(tag) = TiffTag::from_u16(entry.tag) else {
            trace!(tag = entry.tag, "skipping unrecognized tag");
            return Ok(());
        };

        match tag {
            TiffTag::ImageWidth => self.width = entry.inline_scalar(),
            TiffTag::ImageLength => self.height = entry.inline_scalar(),
            TiffTag::BitsPerSample => {
                let bits = entry.first_value(cursor)?;
                if bits == 0 || bits % 8 != 0 {
                    return Err(TiffError::unsupported(format!(
                        "{bits} bits per sample is not byte aligned"
                    )));
                }
                self.bytes_per_channel = bits >> 3;
            }
            TiffTag::Compression => {
                let code = entry.inline_scalar();
                self.compression = Compression::from_u32(code).ok_or_else(|| {
                    TiffError::unsupported(format!(
                        "compression {code}, only none (1) and PackBits (32773) are supported"
                    ))
                })?;
            }
            TiffTag::StripOffsets => self.strip_offsets = Some(StripArray::from_entry(entry)),
            TiffTag::SamplesPerPixel => self.channels = entry.inline_scalar(),
            TiffTag::RowsPerStrip => self.rows_per_strip = Some(entry.inline_scalar()),
            TiffTag::StripByteCounts => {
                self.strip_byte_counts = Some(StripArray::from_entry(entry))
            }
        }
        Ok(())
    }

    /// Total pixel bytes the strips must decode to.
    ///
    /// Fails with `MalformedDirectory` when the dimensions overflow `usize`.
    pub fn expected_size(&self) -> Result<usize, TiffError> {
        [self.height, self.channels, self.bytes_per_channel]
            .iter()
            .try_fold(self.width as usize, |acc, &n| acc.checked_mul(n as usize))
            .ok_or_else(|| {
                TiffError::malformed(format!(
                    "image size {}x{} x{} @ {} byte(s) overflows",
                    self.width, self.height, self.channels, self.bytes_per_channel
                ))
            })
    }

    /// Resolve the strip table; zero strips is the only rejected layout.
    pub fn strip_table(&self) -> Result<StripTable, TiffError> {
        let offsets = self
            .strip_offsets
            .filter(|a| a.count > 0)
            .ok_or_else(|| TiffError::malformed("no strips"))?;
        let byte_counts = self
            .strip_byte_counts
            .ok_or_else(|| TiffError::malformed("strip byte counts missing"))?;

        Ok(StripTable {
            offsets,
            byte_counts,
            rows_per_strip: self.rows_per_strip.unwrap_or(self.height),
        })
    }
}
