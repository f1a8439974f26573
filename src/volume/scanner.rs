//! Volume directory scanning.
//!
//! A volume is the run of consecutively numbered slice files starting at
//! index 0. Only the first file is decoded (to learn the slice geometry);
//! the rest are existence-checked so that selecting a large volume stays
//! cheap. The first missing index ends the volume.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{IoError, ScanError};
use crate::format::{decode_slice, SliceGeometry};
use crate::io::SliceSource;

use super::VolumeDescriptor;

/// Default upper bound on probed slices (4-digit slice numbering).
pub const DEFAULT_MAX_SLICES: u32 = 10_000;

/// Result of scanning a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeScan {
    /// Count of consecutive slice files from index 0
    pub num_slices: u32,

    /// Geometry of slice 0, `None` when the volume is empty
    pub geometry: Option<SliceGeometry>,
}

impl VolumeScan {
    pub fn empty() -> Self {
        Self {
            num_slices: 0,
            geometry: None,
        }
    }
}

/// Scans volumes through a [`SliceSource`].
pub struct VolumeScanner<'a, S: SliceSource> {
    source: &'a S,
    max_slices: u32,
}

impl<'a, S: SliceSource> VolumeScanner<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            max_slices: DEFAULT_MAX_SLICES,
        }
    }

    pub fn with_max_slices(mut self, max_slices: u32) -> Self {
        self.max_slices = max_slices;
        self
    }

    /// Count the slices of `volume` and read the geometry of slice 0.
    ///
    /// A missing file terminates the scan; any other I/O failure, or a
    /// first slice that does not decode, is an error.
    pub async fn scan(&self, volume: &VolumeDescriptor) -> Result<VolumeScan, ScanError> {
        if self.max_slices == 0 {
            return Ok(VolumeScan::empty());
        }

        let first = volume.slice_path(0);
        let data = match self.source.read(&first).await {
            Ok(data) => data,
            Err(IoError::NotFound(_)) => {
                info!(volume = %volume, "volume has no slices");
                return Ok(VolumeScan::empty());
            }
            Err(e) => return Err(e.into()),
        };

        let image = decode_slice(data).map_err(|source| ScanError::Tiff {
            path: first,
            source,
        })?;
        let geometry = image.geometry();

        let mut num_slices = 1;
        while num_slices < self.max_slices {
            let path = volume.slice_path(num_slices);
            if !self.source.exists(&path).await? {
                debug!(path = %path.display(), "first missing slice");
                break;
            }
            num_slices += 1;
        }

        info!(
            volume = %volume,
            num_slices,
            geometry = %geometry,
            "scanned volume"
        );

        Ok(VolumeScan {
            num_slices,
            geometry: Some(geometry),
        })
    }
}
