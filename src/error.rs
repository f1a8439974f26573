use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading slice files
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Slice file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Underlying read failed for a reason other than absence
    #[error("Failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
}

/// Errors that can occur when decoding a TIFF slice
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TiffError {
    /// A read ran past the end of the file buffer
    #[error("Read out of bounds: requested {requested} bytes at offset {offset}, buffer is {len}")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        len: usize,
    },

    /// Byte order, magic, bit depth or compression outside the supported subset
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Directory structure could not be used to locate pixel strips
    #[error("Malformed directory: {reason}")]
    MalformedDirectory { reason: String },

    /// Strips did not decode to exactly the expected pixel byte count
    #[error("Truncated image: expected {expected} bytes, decoded {actual}")]
    TruncatedImage { expected: usize, actual: usize },

    /// Decompression would write past the destination buffer
    #[error("Buffer overrun: writing {requested} bytes at offset {offset} exceeds capacity {capacity}")]
    BufferOverrun {
        offset: usize,
        requested: usize,
        capacity: usize,
    },
}

impl TiffError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        TiffError::UnsupportedFormat {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        TiffError::MalformedDirectory {
            reason: reason.into(),
        }
    }
}

/// Errors raised while scanning a volume directory
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// I/O error other than the terminating missing file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The first slice could not be decoded
    #[error("TIFF error in {}: {source}", path.display())]
    Tiff {
        path: PathBuf,
        #[source]
        source: TiffError,
    },
}

/// Errors reported by an ingestion sink
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// The sink refused or failed to consume a batch
    #[error("Ingestion failed: {0}")]
    Ingest(String),

    /// The sink failed to clear a block region
    #[error("Clear failed: {0}")]
    Clear(String),
}

/// Errors that abort a streaming tick
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Tick was requested before a volume was selected
    #[error("No volume selected")]
    NoVolume,

    /// A slice promised by the scan is gone
    #[error("Missing slice file: {}", .0.display())]
    MissingFile(PathBuf),

    /// I/O error while reading a slice
    #[error("I/O error: {0}")]
    Io(IoError),

    /// Slice failed to decode
    #[error("TIFF error in {}: {source}", path.display())]
    Tiff {
        path: PathBuf,
        #[source]
        source: TiffError,
    },

    /// Slice geometry differs from the geometry of the scanned volume
    #[error(
        "Geometry mismatch in {}: expected {expected}, got {actual}",
        path.display()
    )]
    GeometryMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The staging buffer cannot hold the requested slice bytes
    #[error("Staging buffer too small: need {required} bytes, capacity is {capacity}")]
    StagingTooSmall { required: usize, capacity: usize },

    /// Ingestion sink failure
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Volume selection failed
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

impl From<IoError> for StreamError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::NotFound(path) => StreamError::MissingFile(path),
            other => StreamError::Io(other),
        }
    }
}

/// Errors in the volume catalog file
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Catalog file could not be read
    #[error("Failed to read catalog {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// A catalog line is not three quoted strings
    #[error("Invalid catalog line {line}: {message}")]
    InvalidLine { line: usize, message: String },
}
