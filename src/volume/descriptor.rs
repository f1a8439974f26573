use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Where a volume's slice files live and how they are named.
///
/// Slice `i` is `{folder}/{file_template}{i:04}{extension}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeDescriptor {
    pub folder: String,
    pub file_template: String,
    pub extension: String,
}

impl VolumeDescriptor {
    pub fn new(
        folder: impl Into<String>,
        file_template: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            folder: folder.into(),
            file_template: file_template.into(),
            extension: extension.into(),
        }
    }

    /// File name of slice `index`, without the folder.
    pub fn slice_file_name(&self, index: u32) -> String {
        format!("{}{:04}{}", self.file_template, index, self.extension)
    }

    /// Full path of slice `index`.
    pub fn slice_path(&self, index: u32) -> PathBuf {
        PathBuf::from(&self.folder).join(self.slice_file_name(index))
    }
}

impl fmt::Display for VolumeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}####{}",
            self.folder, self.file_template, self.extension
        )
    }
}
