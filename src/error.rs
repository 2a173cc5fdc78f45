//! Error types for the visual complexity engine and its batch driver.

use std::path::PathBuf;
use thiserror::Error;

/// A raster that the metric engine refuses to analyze.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The image has no pixels at all.
    #[error("image has zero pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    /// Only grayscale (1) and RGB (3) rasters are accepted.
    #[error("unsupported channel count {0} (expected 1 or 3)")]
    UnsupportedChannels(u8),

    /// The sample buffer does not match `width * height * channels`.
    #[error("sample buffer holds {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },
}

/// Main error type for the visual_complexity library.
#[derive(Error, Debug)]
pub enum Error {
    /// The image handed to the analyzer has an invalid shape.
    #[error("invalid image shape for {filename}: {source}")]
    InvalidImageShape {
        filename: String,
        #[source]
        source: ShapeError,
    },

    /// The image loader could not decode a file.
    #[error("failed to decode image {path}: {source}")]
    DecodeUnavailable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A metrics record could not be written to disk.
    #[error("failed to write metrics record {path}: {source}")]
    RecordWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two images in one batch would write the same record file.
    #[error("record {record} for {image} is already claimed by {owner}")]
    RecordCollision {
        image: PathBuf,
        record: PathBuf,
        owner: PathBuf,
    },

    /// A batch input names a path that does not exist.
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    /// A metrics record could not be serialized.
    #[error("failed to serialize metrics record: {0}")]
    RecordSerialize(#[from] serde_json::Error),

    /// The batch worker pool stopped before answering.
    #[error("worker pool unavailable: {0}")]
    WorkerUnavailable(&'static str),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Tags a core shape violation with the image it came from.
    pub fn shape(filename: &str, source: ShapeError) -> Self {
        Error::InvalidImageShape {
            filename: filename.to_string(),
            source,
        }
    }
}

/// Result type alias for visual_complexity operations.
pub type Result<T> = std::result::Result<T, Error>;
