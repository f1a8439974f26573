//! Test utilities for integration tests.
//!
//! This module provides mock slice sources, a recording ingestion sink, and
//! builders for synthetic little-endian TIFF slices.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use ct_slice_streamer::error::{IoError, SinkError};
use ct_slice_streamer::io::SliceSource;
use ct_slice_streamer::stream::{CutoffWindow, IngestionSink, StagedBatch};
use ct_slice_streamer::volume::VolumeDescriptor;

// =============================================================================
// TIFF Builder
// =============================================================================

const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_PACKBITS: u16 = 32773;

/// Builds a single-image little-endian TIFF with strip storage.
#[derive(Debug, Clone)]
pub struct TiffBuilder {
    width: u32,
    height: u32,
    bits_per_sample: u16,
    samples_per_pixel: u16,
    rows_per_strip: u32,
    packbits: bool,
    short_strip_arrays: bool,
    pixels: Vec<u8>,
}

impl TiffBuilder {
    /// 8-bit single-channel image with the given raw pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bits_per_sample: 8,
            samples_per_pixel: 1,
            rows_per_strip: height.max(1),
            packbits: false,
            short_strip_arrays: false,
            pixels,
        }
    }

    pub fn bits_per_sample(mut self, bits: u16) -> Self {
        self.bits_per_sample = bits;
        self
    }

    pub fn samples_per_pixel(mut self, samples: u16) -> Self {
        self.samples_per_pixel = samples;
        self
    }

    pub fn rows_per_strip(mut self, rows: u32) -> Self {
        self.rows_per_strip = rows.max(1);
        self
    }

    pub fn packbits(mut self) -> Self {
        self.packbits = true;
        self
    }

    /// Store strip offsets and byte counts as SHORT instead of LONG.
    pub fn short_strip_arrays(mut self) -> Self {
        self.short_strip_arrays = true;
        self
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.samples_per_pixel as usize * (self.bits_per_sample as usize / 8)
    }

    /// Encoded strips, in order.
    fn strips(&self) -> Vec<Vec<u8>> {
        let strip_bytes = (self.row_bytes() * self.rows_per_strip as usize).max(1);
        self.pixels
            .chunks(strip_bytes)
            .map(|raw| {
                if self.packbits {
                    pack_bits(raw)
                } else {
                    raw.to_vec()
                }
            })
            .collect()
    }

    pub fn build(&self) -> Vec<u8> {
        let strips = self.strips();
        let strip_count = strips.len() as u32;
        let (array_type, stride) = if self.short_strip_arrays {
            (3u16, 2usize)
        } else {
            (4u16, 4usize)
        };

        let entry_count = 8usize;
        let mut pos = 8 + 2 + entry_count * 12 + 4;

        // BitsPerSample array when more than two SHORTs
        let bits_offset = if self.samples_per_pixel > 2 {
            let at = pos;
            pos += 2 * self.samples_per_pixel as usize;
            Some(at)
        } else {
            None
        };

        let arrays_inline = strip_count as usize * stride <= 4;
        let (offsets_at, counts_at) = if arrays_inline {
            (None, None)
        } else {
            let o = pos;
            pos += strip_count as usize * stride;
            let c = pos;
            pos += strip_count as usize * stride;
            (Some(o), Some(c))
        };

        let mut strip_offsets = Vec::new();
        for strip in &strips {
            strip_offsets.push(pos as u32);
            pos += strip.len();
        }
        let strip_counts: Vec<u32> = strips.iter().map(|s| s.len() as u32).collect();

        let pack_inline = |values: &[u32]| -> u32 {
            if stride == 2 {
                values
                    .iter()
                    .enumerate()
                    .fold(0u32, |acc, (i, v)| acc | ((v & 0xFFFF) << (16 * i)))
            } else {
                values.first().copied().unwrap_or(0)
            }
        };

        let bits_value = match bits_offset {
            Some(at) => at as u32,
            None if self.samples_per_pixel == 2 => {
                self.bits_per_sample as u32 | ((self.bits_per_sample as u32) << 16)
            }
            None => self.bits_per_sample as u32,
        };
        let compression = if self.packbits {
            COMPRESSION_PACKBITS
        } else {
            COMPRESSION_NONE
        };

        let entries: [(u16, u16, u32, u32); 8] = [
            (256, 4, 1, self.width),
            (257, 4, 1, self.height),
            (258, 3, self.samples_per_pixel as u32, bits_value),
            (259, 3, 1, compression as u32),
            (
                273,
                array_type,
                strip_count,
                offsets_at.map_or_else(|| pack_inline(&strip_offsets), |at| at as u32),
            ),
            (277, 3, 1, self.samples_per_pixel as u32),
            (278, 4, 1, self.rows_per_strip),
            (
                279,
                array_type,
                strip_count,
                counts_at.map_or_else(|| pack_inline(&strip_counts), |at| at as u32),
            ),
        ];

        let mut data = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
        data.extend_from_slice(&(entry_count as u16).to_le_bytes());
        for (tag, typ, count, value) in entries {
            data.extend_from_slice(&tag.to_le_bytes());
            data.extend_from_slice(&typ.to_le_bytes());
            data.extend_from_slice(&count.to_le_bytes());
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&0u32.to_le_bytes());

        if bits_offset.is_some() {
            for _ in 0..self.samples_per_pixel {
                data.extend_from_slice(&self.bits_per_sample.to_le_bytes());
            }
        }

        let push_array = |data: &mut Vec<u8>, values: &[u32]| {
            for &v in values {
                if stride == 2 {
                    data.extend_from_slice(&(v as u16).to_le_bytes());
                } else {
                    data.extend_from_slice(&v.to_le_bytes());
                }
            }
        };
        if !arrays_inline {
            push_array(&mut data, &strip_offsets);
            push_array(&mut data, &strip_counts);
        }

        for strip in &strips {
            data.extend_from_slice(strip);
        }
        data
    }
}

/// PackBits-encode `raw`, using repeat runs for 3+ identical bytes.
pub fn pack_bits(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let mut run = 1;
        while i + run < raw.len() && raw[i + run] == raw[i] && run < 128 {
            run += 1;
        }

        if run >= 3 {
            out.push((1 - run as i16) as i8 as u8);
            out.push(raw[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < raw.len() && i - start < 128 {
            if i + 2 < raw.len() && raw[i] == raw[i + 1] && raw[i] == raw[i + 2] {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&raw[start..i]);
    }
    out
}

/// 8-bit square slice filled with `value`.
pub fn uniform_slice(size: u32, value: u8) -> Vec<u8> {
    TiffBuilder::new(size, size, vec![value; (size * size) as usize]).build()
}

// =============================================================================
// Memory Slice Source
// =============================================================================

/// In-memory slice source that counts reads and existence checks.
#[derive(Clone, Default)]
pub struct MemorySliceSource {
    files: Arc<RwLock<HashMap<PathBuf, Bytes>>>,
    reads: Arc<AtomicUsize>,
    exists_checks: Arc<AtomicUsize>,
}

impl MemorySliceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.write().await.insert(path.into(), Bytes::from(data));
    }

    pub async fn remove(&self, path: &Path) {
        self.files.write().await.remove(path);
    }

    /// Insert `count` slices of `volume`, each uniform with its index as value.
    pub async fn with_volume(self, volume: &VolumeDescriptor, count: u32, size: u32) -> Self {
        for i in 0..count {
            self.insert(volume.slice_path(i), uniform_slice(size, i as u8))
                .await;
        }
        self
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn exists_count(&self) -> usize {
        self.exists_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SliceSource for MemorySliceSource {
    async fn exists(&self, path: &Path) -> Result<bool, IoError> {
        self.exists_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.read().await.contains_key(path))
    }

    async fn read(&self, path: &Path) -> Result<Bytes, IoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| IoError::NotFound(path.to_path_buf()))
    }
}

// =============================================================================
// Recording Sink
// =============================================================================

/// A call made on the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Clear {
        start_block: u32,
        block_count: u32,
    },
    Ingest {
        start_slice: u32,
        slice_count: u32,
        slice_byte_size: usize,
        bytes: Vec<u8>,
        cutoff: CutoffWindow,
    },
}

/// Sink that records every call, optionally failing the n-th ingest.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
    fail_on_ingest: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_ingest(n: usize) -> Self {
        Self {
            events: Vec::new(),
            fail_on_ingest: Some(n),
        }
    }

    pub fn clear_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Clear { .. }))
            .count()
    }

    /// `(start_slice, slice_count)` of every ingested batch.
    pub fn ingested(&self) -> Vec<(u32, u32)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Ingest {
                    start_slice,
                    slice_count,
                    ..
                } => Some((*start_slice, *slice_count)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl IngestionSink for RecordingSink {
    async fn clear_region(
        &mut self,
        start_block: u32,
        block_count: u32,
    ) -> Result<(), SinkError> {
        self.events.push(SinkEvent::Clear {
            start_block,
            block_count,
        });
        Ok(())
    }

    async fn ingest_batch<'a>(&mut self, batch: StagedBatch<'a>) -> Result<(), SinkError> {
        let ingests = self.ingested().len();
        if self.fail_on_ingest == Some(ingests) {
            return Err(SinkError::Ingest("device lost".to_string()));
        }
        self.events.push(SinkEvent::Ingest {
            start_slice: batch.start_slice,
            slice_count: batch.slice_count,
            slice_byte_size: batch.slice_byte_size,
            bytes: batch.bytes.to_vec(),
            cutoff: batch.cutoff,
        });
        Ok(())
    }
}
