//! Checkpoint persistence
//!
//! The checkpoint is the sequence number of the last fully processed
//! record, stored as plain text. A missing file means nothing has been
//! processed yet.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{DatasetError, Result};

/// File-backed progress marker
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last processed record, or 0 when no checkpoint exists
    pub fn load(&self) -> Result<u64> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(DatasetError::io(&self.path, e)),
        };

        let value = content.trim();
        let last = value
            .parse::<u64>()
            .map_err(|_| DatasetError::CorruptCheckpoint {
                path: self.path.clone(),
                value: value.to_string(),
            })?;

        debug!(path = %self.path.display(), last, "Loaded checkpoint");
        Ok(last)
    }

    /// Record `sequence` as the last processed record
    pub fn save(&self, sequence: u64) -> Result<()> {
        std::fs::write(&self.path, sequence.to_string())
            .map_err(|e| DatasetError::io(&self.path, e))
    }
}
