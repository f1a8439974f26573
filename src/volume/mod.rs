//! Volumes: named stacks of slice files.
//!
//! - [`VolumeDescriptor`] names the files of one volume
//! - [`VolumeCatalog`] loads the list of selectable volumes
//! - [`VolumeScanner`] counts slices and reads the slice geometry

mod catalog;
mod descriptor;
mod scanner;

pub use catalog::VolumeCatalog;
pub use descriptor::VolumeDescriptor;
pub use scanner::{VolumeScan, VolumeScanner, DEFAULT_MAX_SLICES};
