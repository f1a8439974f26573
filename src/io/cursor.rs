//! Bounds-checked cursor over an in-memory file buffer.
//!
//! Every multi-byte read decodes little-endian bytes field by field, so
//! structures are never reinterpreted in place and misaligned or truncated
//! buffers surface as [`TiffError::OutOfBounds`] instead of undefined reads.

use std::ops::{Deref, DerefMut};

use bytes::Bytes;

use crate::error::TiffError;

// =============================================================================
// Typed Reads
// =============================================================================

/// A fixed-size value that can be decoded from little-endian bytes.
pub trait LeRead: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decode from exactly `SIZE` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

impl LeRead for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl LeRead for i8 {
    const SIZE: usize = 1;

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }
}

impl LeRead for u16 {
    const SIZE: usize = 2;

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl LeRead for u32 {
    const SIZE: usize = 4;

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

// =============================================================================
// ByteCursor
// =============================================================================

/// Seekable read position over an immutable byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    pos: usize,
}

impl ByteCursor {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Current absolute position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn check(&self, offset: usize, requested: usize) -> Result<(), TiffError> {
        match offset.checked_add(requested) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(TiffError::OutOfBounds {
                offset,
                requested,
                len: self.data.len(),
            }),
        }
    }

    /// Jump to an absolute offset.
    ///
    /// Seeking to exactly the buffer length is allowed (end of data).
    pub fn seek(&mut self, offset: usize) -> Result<(), TiffError> {
        if offset > self.data.len() {
            return Err(TiffError::OutOfBounds {
                offset,
                requested: 0,
                len: self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Read a value at the current position without advancing.
    pub fn peek<T: LeRead>(&self) -> Result<T, TiffError> {
        self.check(self.pos, T::SIZE)?;
        Ok(T::from_le_slice(&self.data[self.pos..self.pos + T::SIZE]))
    }

    /// Read a value at the current position and advance past it.
    pub fn read<T: LeRead>(&mut self) -> Result<T, TiffError> {
        let value = self.peek::<T>()?;
        self.pos += T::SIZE;
        Ok(value)
    }

    /// Borrow `len` bytes at the current position and advance past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], TiffError> {
        self.check(self.pos, len)?;
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..start + len])
    }

    /// Temporarily move to `offset`; the returned guard restores the
    /// current position when dropped, whether or not the nested reads succeed.
    pub fn seek_scoped(&mut self, offset: usize) -> Result<SeekGuard<'_>, TiffError> {
        let saved = self.pos;
        self.seek(offset)?;
        Ok(SeekGuard {
            cursor: self,
            saved,
        })
    }
}

/// Restores a cursor's position on drop.
///
/// Derefs to the wrapped [`ByteCursor`] so nested lookups read through it.
#[derive(Debug)]
pub struct SeekGuard<'a> {
    cursor: &'a mut ByteCursor,
    saved: usize,
}

impl Deref for SeekGuard<'_> {
    type Target = ByteCursor;

    fn deref(&self) -> &ByteCursor {
        self.cursor
    }
}

impl DerefMut for SeekGuard<'_> {
    fn deref_mut(&mut self) -> &mut ByteCursor {
        self.cursor
    }
}

impl Drop for SeekGuard<'_> {
    fn drop(&mut self) {
        self.cursor.pos = self.saved;
    }
}
