use crate::error::StreamError;

/// Fixed-size upload region shared between the scheduler and the sink.
///
/// Slot `i` of a batch lives at byte offset `i * slice_byte_size`. The
/// allocation is made once per volume and reused for every batch.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    data: Vec<u8>,
    slice_byte_size: usize,
}

impl StagingBuffer {
    /// Allocate room for `slots` slices of `slice_byte_size` bytes each.
    pub fn new(slots: u32, slice_byte_size: usize) -> Self {
        Self {
            data: vec![0u8; slots as usize * slice_byte_size],
            slice_byte_size,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Copy one slice's pixels into `slot`.
    pub fn write_slice(&mut self, slot: u32, pixels: &[u8]) -> Result<(), StreamError> {
        let start = slot as usize * self.slice_byte_size;
        let end = start + pixels.len();
        if pixels.len() > self.slice_byte_size || end > self.data.len() {
            return Err(StreamError::StagingTooSmall {
                required: end,
                capacity: self.data.len(),
            });
        }
        self.data[start..end].copy_from_slice(pixels);
        Ok(())
    }

    /// The first `slots` slices, as handed to the sink.
    pub fn filled(&self, slots: u32) -> &[u8] {
        let end = (slots as usize * self.slice_byte_size).min(self.data.len());
        &self.data[..end]
    }
}
