//! Geonews Dataset - Tabular I/O around the extraction pipeline
//!
//! Provides:
//! - Source dataset loading with encoding detection and delimiter sniffing
//! - Append-only output sink with a frozen column order
//! - Checkpoint store for resumable runs
//! - GeoJSON export of the output dataset for the map front-end

use std::path::PathBuf;

use thiserror::Error;

pub mod checkpoint;
pub mod encoding;
pub mod geojson;
pub mod reader;
pub mod sink;

pub use checkpoint::CheckpointStore;
pub use encoding::TextEncoding;
pub use geojson::{export_geojson, ExportSummary};
pub use reader::{sniff_delimiter, SourceDataset};
pub use sink::OutputSink;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while reading or writing datasets
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Input file does not exist
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// IO error while reading or writing a file
    #[error("IO error on file: {}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No configured encoding decodes the input
    #[error("Could not decode {} with any of: {}", path.display(), tried.join(", "))]
    UndecodableInput { path: PathBuf, tried: Vec<String> },

    /// Encoding name not supported
    #[error("Unsupported encoding: {0}")]
    UnknownEncoding(String),

    /// Required column absent from the header
    #[error("Missing column '{column}' (found: {})", found.join(", "))]
    MissingColumn { column: String, found: Vec<String> },

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Checkpoint file does not hold a record number
    #[error("Corrupt checkpoint {}: {value:?}", path.display())]
    CorruptCheckpoint { path: PathBuf, value: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

impl From<DatasetError> for geonews_core::GeoNewsError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::CorruptCheckpoint { .. } => Self::CheckpointError(err.to_string()),
            other => Self::DatasetError(other.to_string()),
        }
    }
}
