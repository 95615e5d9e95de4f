//! Append-only output sink
//!
//! Rows are appended to the output CSV and flushed before the caller
//! advances the checkpoint, so a crash never leaves a checkpoint ahead of
//! the data. The header is written only when the file is created.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::debug;

use geonews_core::{OutputRow, OUTPUT_COLUMNS};

use crate::{DatasetError, Result};

/// Output dataset writer
pub struct OutputSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows_written: usize,
}

impl OutputSink {
    /// Open the output file for appending, creating it with a header if absent
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_new = !path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DatasetError::io(path, e))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(OUTPUT_COLUMNS)?;
            writer.flush().map_err(|e| DatasetError::io(path, e))?;
            debug!(path = %path.display(), "Created output dataset");
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows_written: 0,
        })
    }

    /// Append rows and flush them to disk
    pub fn write_rows(&mut self, rows: &[OutputRow]) -> Result<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer
            .flush()
            .map_err(|e| DatasetError::io(&self.path, e))?;
        self.rows_written += rows.len();
        Ok(())
    }

    /// Rows appended through this sink
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
