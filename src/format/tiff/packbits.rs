//! PackBits run-length decoding and raw strip copies.
//!
//! Each control byte `n` (read as `i8`) selects one of:
//!
//! | `n`          | Meaning                                         |
//! |--------------|-------------------------------------------------|
//! | `0..=127`    | copy the next `n + 1` bytes verbatim            |
//! | `-127..=-1`  | repeat the next byte `1 - n` times              |
//! | `-128`       | no-op padding                                   |
//!
//! Decoding stops once the strip's declared source byte count is consumed.

use crate::error::TiffError;
use crate::io::ByteCursor;

fn reserve(dest: &[u8], offset: usize, requested: usize) -> Result<(), TiffError> {
    match offset.checked_add(requested) {
        Some(end) if end <= dest.len() => Ok(()),
        _ => Err(TiffError::BufferOverrun {
            offset,
            requested,
            capacity: dest.len(),
        }),
    }
}

/// Expand a PackBits strip of `byte_count` source bytes at `src_offset`
/// into `dest` starting at `dest_offset`.
///
/// Returns the number of bytes written. The cursor position is left
/// unchanged.
pub fn unpack_bits(
    cursor: &mut ByteCursor,
    src_offset: usize,
    byte_count: usize,
    dest: &mut [u8],
    dest_offset: usize,
) -> Result<usize, TiffError> {
    let mut src = cursor.seek_scoped(src_offset)?;
    let src_end = src_offset + byte_count;
    let mut written = 0usize;

    while src.position() < src_end {
        let n = src.read::<i8>()?;
        let at = dest_offset + written;

        if n == -128 {
            continue;
        } else if n < 0 {
            let run = (1 - n as isize) as usize;
            let value = src.read::<u8>()?;
            reserve(dest, at, run)?;
            dest[at..at + run].fill(value);
            written += run;
        } else {
            let run = n as usize + 1;
            let literal = src.read_bytes(run)?;
            reserve(dest, at, run)?;
            dest[at..at + run].copy_from_slice(literal);
            written += run;
        }
    }

    Ok(written)
}

/// Copy an uncompressed strip verbatim.
pub fn copy_raw(
    cursor: &mut ByteCursor,
    src_offset: usize,
    byte_count: usize,
    dest: &mut [u8],
    dest_offset: usize,
) -> Result<usize, TiffError> {
    let mut src = cursor.seek_scoped(src_offset)?;
    let bytes = src.read_bytes(byte_count)?;
    reserve(dest, dest_offset, byte_count)?;
    dest[dest_offset..dest_offset + byte_count].copy_from_slice(bytes);
    Ok(byte_count)
}
