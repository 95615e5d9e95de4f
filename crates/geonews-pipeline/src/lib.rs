//! Geonews Pipeline - News text to geolocated event rows
//!
//! Drives each source record through extraction, geocoding and row
//! assembly, appending rows to the output dataset and advancing the
//! checkpoint after every record. Optionally publishes the dataset with git.
//!
//! Author: hephaex@gmail.com

pub mod pipeline;
pub mod publish;

pub use pipeline::{Pipeline, RecordStage, RunSummary};
pub use publish::{GitPublisher, PublishOutcome, PublishStage};
