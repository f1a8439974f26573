use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::IoError;

/// Trait for fetching whole slice files by path.
///
/// This abstraction lets the scanner and the streaming scheduler run against
/// a local directory or an in-memory fixture without knowing the difference.
/// A missing file must be reported as [`IoError::NotFound`]; the scanner
/// relies on it to find the end of a volume.
#[async_trait]
pub trait SliceSource: Send + Sync {
    /// Check whether a file exists without reading it.
    async fn exists(&self, path: &Path) -> Result<bool, IoError>;

    /// Read the complete contents of a file.
    async fn read(&self, path: &Path) -> Result<Bytes, IoError>;
}

// =============================================================================
// Local Filesystem Source
// =============================================================================

/// [`SliceSource`] backed by the local filesystem via `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalSliceSource {
    root: Option<PathBuf>,
}

impl LocalSliceSource {
    /// Resolve paths as given (absolute or relative to the working directory).
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl SliceSource for LocalSliceSource {
    async fn exists(&self, path: &Path) -> Result<bool, IoError> {
        let full = self.resolve(path);
        tokio::fs::try_exists(&full).await.map_err(|e| IoError::Read {
            path: full,
            message: e.to_string(),
        })
    }

    async fn read(&self, path: &Path) -> Result<Bytes, IoError> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(data) => {
                debug!(path = %full.display(), bytes = data.len(), "read slice file");
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(IoError::NotFound(full)),
            Err(e) => Err(IoError::Read {
                path: full,
                message: e.to_string(),
            }),
        }
    }
}
