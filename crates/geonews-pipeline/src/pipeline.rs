//! Pipeline orchestrator
//!
//! Records are processed strictly in order, one location at a time. Per
//! record the work moves through [`RecordStage`]s; rows are flushed to the
//! sink before the checkpoint is saved, so an interrupted run resumes at the
//! first record whose rows were not fully written.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, trace};

use geonews_core::{AnnotatedDoc, Annotator, AppConfig, OutputRow, Result, SourceRecord};
use geonews_dataset::{CheckpointStore, OutputSink, SourceDataset};
use geonews_extractor::{
    attach_context, create_annotator, EventClassifier, GeoContextDetector, LocationExtractor,
    PatternLibrary,
};
use geonews_geocode::{create_geocoder, CoordinateResolver};

// ============================================================================
// Record Stages
// ============================================================================

/// Progress of a single record through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordStage {
    Pending,
    ModelProcessed,
    LocationsExtracted,
    RowsAssembled,
}

impl std::fmt::Display for RecordStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::ModelProcessed => "model-processed",
            Self::LocationsExtracted => "locations-extracted",
            Self::RowsAssembled => "rows-assembled",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Run Summary
// ============================================================================

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Records in the source dataset
    pub records_seen: usize,
    /// Checkpoint found at start
    pub resumed_from: u64,
    /// Records run through extraction
    pub records_processed: usize,
    /// Records skipped for empty text
    pub records_skipped_empty: usize,
    /// Rows appended to the output dataset
    pub rows_written: usize,
    /// Checkpoint at end of run
    pub last_checkpoint: u64,
}

impl RunSummary {
    /// Whether the run had any new records to handle
    pub fn has_new_records(&self) -> bool {
        self.records_processed + self.records_skipped_empty > 0
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Extraction and resolution pipeline over injected oracles
pub struct Pipeline {
    annotator: Arc<dyn Annotator>,
    resolver: CoordinateResolver,
    library: Arc<PatternLibrary>,
}

impl Pipeline {
    pub fn new(
        annotator: Arc<dyn Annotator>,
        resolver: CoordinateResolver,
        library: Arc<PatternLibrary>,
    ) -> Self {
        Self {
            annotator,
            resolver,
            library,
        }
    }

    /// Build the pipeline with the configured oracle backends
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let library = Arc::new(PatternLibrary::peru());
        let annotator = create_annotator(&config.nlp);
        let geocoder = create_geocoder(&config.geocoder)?;
        let resolver = CoordinateResolver::new(geocoder, library.clone(), &config.geocoder);

        info!(
            annotator = annotator.name(),
            geocoder = resolver.geocoder_name(),
            "Pipeline initialized"
        );
        Ok(Self::new(annotator, resolver, library))
    }

    /// Process one record into its output rows
    ///
    /// Blank records yield no rows. Rows follow location order: model
    /// entities first, then regex addresses, duplicates removed.
    pub async fn process_record(&self, record: &SourceRecord) -> Result<Vec<OutputRow>> {
        if record.is_blank() {
            debug!(sequence = record.sequence, "Empty text, no rows");
            return Ok(Vec::new());
        }

        let mut stage = RecordStage::Pending;
        let result = self.run_stages(record, &mut stage).await;
        if let Err(e) = &result {
            error!(sequence = record.sequence, %stage, error = %e, "Record failed");
        }
        result
    }

    async fn run_stages(
        &self,
        record: &SourceRecord,
        stage: &mut RecordStage,
    ) -> Result<Vec<OutputRow>> {
        let text = record.text.as_str();

        let date = self.library.extract_date(text);
        let event_type = EventClassifier::with_library(&self.library).classify(text);
        let geo_context = GeoContextDetector::with_library(&self.library).detect(text);

        let doc: AnnotatedDoc = self.annotator.annotate(text).await?;
        advance(record, stage, RecordStage::ModelProcessed);

        let locations = LocationExtractor::with_library(&self.library).extract(text, &doc);
        advance(record, stage, RecordStage::LocationsExtracted);
        debug!(
            sequence = record.sequence,
            %event_type,
            geo_context = geo_context.as_ref().map(|c| c.as_str()),
            locations = locations.len(),
            "Extracted locations"
        );

        let mut rows = Vec::with_capacity(locations.len());
        let mut unresolved = 0;
        for location in &locations {
            let resolved = self
                .resolver
                .resolve(&location.text, geo_context.as_ref())
                .await?;
            if !resolved.is_resolved() {
                unresolved += 1;
            }
            let context = attach_context(&doc, location);
            rows.push(OutputRow::assemble(
                record,
                resolved,
                event_type,
                &date,
                context.as_ref(),
            ));
        }
        advance(record, stage, RecordStage::RowsAssembled);
        debug!(
            sequence = record.sequence,
            rows = rows.len(),
            unresolved,
            "Rows assembled"
        );

        Ok(rows)
    }

    /// Process every record after the checkpoint, appending rows to `output`
    ///
    /// The output file is only opened when there is at least one pending
    /// record. The checkpoint advances past every handled record, blank
    /// ones included.
    pub async fn run(
        &self,
        dataset: &SourceDataset,
        output: &Path,
        checkpoint: &CheckpointStore,
    ) -> Result<RunSummary> {
        let resumed_from = checkpoint.load()?;
        let mut summary = RunSummary {
            records_seen: dataset.len(),
            resumed_from,
            last_checkpoint: resumed_from,
            ..Default::default()
        };

        let mut pending = dataset.pending(resumed_from).peekable();
        if pending.peek().is_none() {
            info!(checkpoint = resumed_from, "No new records to process");
            return Ok(summary);
        }

        let mut sink = OutputSink::open(output)?;
        info!(
            checkpoint = resumed_from,
            pending = dataset.len().saturating_sub(resumed_from as usize),
            output = %sink.path().display(),
            "Processing new records"
        );

        for record in pending {
            if record.is_blank() {
                summary.records_skipped_empty += 1;
            } else {
                let rows = self.process_record(record).await?;
                sink.write_rows(&rows)?;
                summary.records_processed += 1;
                info!(
                    sequence = record.sequence,
                    outlet = %record.outlet,
                    rows = rows.len(),
                    "Record processed"
                );
            }

            checkpoint.save(record.sequence)?;
            summary.last_checkpoint = record.sequence;
            summary.rows_written = sink.rows_written();
        }

        info!(
            processed = summary.records_processed,
            skipped_empty = summary.records_skipped_empty,
            rows = summary.rows_written,
            checkpoint = summary.last_checkpoint,
            "Run complete"
        );
        Ok(summary)
    }
}

fn advance(record: &SourceRecord, stage: &mut RecordStage, next: RecordStage) {
    trace!(sequence = record.sequence, from = %stage, to = %next, "Stage");
    *stage = next;
}
