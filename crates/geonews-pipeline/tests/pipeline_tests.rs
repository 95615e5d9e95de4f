//! End-to-end pipeline tests with deterministic oracles
//!
//! The rule-based annotator stands in for the language model; geocoding is
//! answered from a script so runs are offline and repeatable.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use geonews_core::{
    AnnotatedDoc, Annotator, Coordinate, EntitySpan, EventType, GeoNewsError, GeocodeOutcome,
    Geocoder, GeocoderConfig, Result, Sentence, SourceRecord, Token, DATE_NOT_FOUND,
    LOCATION_LABEL,
};
use geonews_dataset::{CheckpointStore, SourceDataset};
use geonews_extractor::{PatternLibrary, RuleBasedAnnotator};
use geonews_geocode::CoordinateResolver;
use geonews_pipeline::Pipeline;

// ============================================================================
// Fakes
// ============================================================================

/// Geocoder answering from a query table; unknown queries get no match
#[derive(Default)]
struct ScriptedGeocoder {
    answers: HashMap<String, GeocodeOutcome>,
    /// Queries containing this text fail with a transport error
    fail_on: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedGeocoder {
    fn new() -> Self {
        let mut answers = HashMap::new();
        answers.insert(
            "Lima, Lima, Perú".to_string(),
            GeocodeOutcome::Found {
                latitude: -12.0464,
                longitude: -77.0428,
            },
        );
        answers.insert(
            "Av. Arequipa cdra. 20, Lima, Perú".to_string(),
            GeocodeOutcome::Found {
                latitude: -12.0931,
                longitude: -77.0465,
            },
        );
        answers.insert(
            "Cusco, Cusco, Perú".to_string(),
            GeocodeOutcome::Found {
                latitude: -13.5319,
                longitude: -71.9675,
            },
        );
        Self {
            answers,
            ..Default::default()
        }
    }

    fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    fn with_answer(mut self, query: &str, outcome: GeocodeOutcome) -> Self {
        self.answers.insert(query.to_string(), outcome);
        self
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for ScriptedGeocoder {
    async fn geocode(&self, query: &str) -> Result<GeocodeOutcome> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(fail_on) = &self.fail_on {
            if query.contains(fail_on.as_str()) {
                return Err(GeoNewsError::GeocodingError("connection refused".to_string()));
            }
        }
        Ok(self
            .answers
            .get(query)
            .cloned()
            .unwrap_or(GeocodeOutcome::NoMatch))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Annotator returning one fixed parse
struct FixedAnnotator(AnnotatedDoc);

#[async_trait]
impl Annotator for FixedAnnotator {
    async fn annotate(&self, _text: &str) -> Result<AnnotatedDoc> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

// ============================================================================
// Helpers
// ============================================================================

const NEWS: &str = "\
medio,texto
RPP,Un choque ocurrió en la Av. Arequipa cdra. 20 en Lima
Canal N,
La República,\"Cientos de manifestantes protestaron en Cusco el 15/03/2024. La marcha llegó a la Plaza de Armas de Cusco.\"
Exitosa,Incendio en Lima y otra vez en Lima el 2 de marzo de 2024
";

fn resolver(geocoder: Arc<ScriptedGeocoder>, library: Arc<PatternLibrary>) -> CoordinateResolver {
    CoordinateResolver::new(geocoder, library, &GeocoderConfig::default())
        .with_min_interval(Duration::ZERO)
}

fn pipeline(geocoder: Arc<ScriptedGeocoder>) -> Pipeline {
    let library = Arc::new(PatternLibrary::peru());
    Pipeline::new(
        Arc::new(RuleBasedAnnotator::new()),
        resolver(geocoder, library.clone()),
        library,
    )
}

fn dataset(content: &str) -> SourceDataset {
    SourceDataset::parse(content).unwrap()
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

// ============================================================================
// Record Processing
// ============================================================================

#[tokio::test]
async fn test_street_address_query_uses_city_context() {
    let geocoder = Arc::new(ScriptedGeocoder::new());
    let pipeline = pipeline(geocoder.clone());
    let record = SourceRecord::new(
        "RPP",
        "Un choque ocurrió en la Av. Arequipa cdra. 20 en Lima",
        1,
    );

    let rows = pipeline.process_record(&record).await.unwrap();

    let locations: Vec<&str> = rows.iter().map(|r| r.location.as_str()).collect();
    assert_eq!(locations, vec!["Lima", "Av. Arequipa cdra. 20"]);
    assert!(geocoder
        .queries()
        .contains(&"Av. Arequipa cdra. 20, Lima, Perú".to_string()));

    for row in &rows {
        assert_eq!(row.event_type, EventType::Accident);
        assert_eq!(row.date, DATE_NOT_FOUND);
        assert_eq!(row.record_id, 1);
        assert_eq!(row.source_record, row.record_id);
        assert_eq!(row.outlet, "RPP");
    }
    assert_eq!(rows[1].latitude, Coordinate::Known(-12.0931));
}

#[tokio::test]
async fn test_locations_are_unique_per_record() {
    let pipeline = pipeline(Arc::new(ScriptedGeocoder::new()));
    let record = SourceRecord::new("Exitosa", "Incendio en Lima y otra vez en Lima", 4);

    let rows = pipeline.process_record(&record).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].location, "Lima");
    assert_eq!(rows[0].event_type, EventType::Emergency);
}

#[tokio::test]
async fn test_geocoding_failure_still_yields_row() {
    let geocoder = ScriptedGeocoder::new().with_answer(
        "Huaraz, Huaraz, Perú",
        GeocodeOutcome::Unavailable("timeout".to_string()),
    );
    let pipeline = pipeline(Arc::new(geocoder));
    let record = SourceRecord::new("RPP", "Hubo un derrumbe en Huaraz", 9);

    let rows = pipeline.process_record(&record).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].location, "Huaraz");
    assert_eq!(rows[0].latitude, Coordinate::Unknown);
    assert_eq!(rows[0].longitude, Coordinate::Unknown);
}

#[tokio::test]
async fn test_blank_record_yields_no_rows() {
    let geocoder = Arc::new(ScriptedGeocoder::new());
    let pipeline = pipeline(geocoder.clone());

    let rows = pipeline
        .process_record(&SourceRecord::new("RPP", "  ", 2))
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert!(geocoder.queries().is_empty());
}

#[tokio::test]
async fn test_context_carries_subject_of_main_verb() {
    // "La policía detuvo a sujetos en Ate ."
    let tokens = vec![
        Token::new("La", 1).with_pos("DET").with_dep("det"),
        Token::new("policía", 2).with_pos("NOUN").with_dep("nsubj"),
        Token::new("detuvo", 2).with_pos("VERB").with_dep("ROOT"),
        Token::new("a", 4).with_pos("ADP").with_dep("case"),
        Token::new("sujetos", 2).with_pos("NOUN").with_dep("obj"),
        Token::new("en", 6).with_pos("ADP").with_dep("case"),
        Token::new("Ate", 2).with_pos("PROPN").with_dep("obl"),
        Token::new(".", 2).with_pos("PUNCT").with_dep("punct"),
    ];
    let doc = AnnotatedDoc {
        tokens,
        sentences: vec![Sentence {
            start: 0,
            end: 8,
            text: "La policía detuvo a sujetos en Ate.".to_string(),
        }],
        entities: vec![EntitySpan {
            text: "Ate".to_string(),
            label: LOCATION_LABEL.to_string(),
            start: 6,
            end: 7,
        }],
    };

    let library = Arc::new(PatternLibrary::peru());
    let pipeline = Pipeline::new(
        Arc::new(FixedAnnotator(doc)),
        resolver(Arc::new(ScriptedGeocoder::new()), library.clone()),
        library,
    );
    let record = SourceRecord::new("Canal N", "La policía detuvo a sujetos en Ate.", 5);

    let rows = pipeline.process_record(&record).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].actors, "policía");
    assert_eq!(rows[0].context, "La policía detuvo a sujetos en Ate.");
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_run_writes_rows_and_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ubicaciones_extraidas.csv");
    let checkpoint = CheckpointStore::new(dir.path().join(".procesamiento_checkpoint.txt"));
    let pipeline = pipeline(Arc::new(ScriptedGeocoder::new()));

    let summary = pipeline.run(&dataset(NEWS), &output, &checkpoint).await.unwrap();

    assert_eq!(summary.records_seen, 4);
    assert_eq!(summary.records_processed, 3);
    assert_eq!(summary.records_skipped_empty, 1);
    assert_eq!(summary.rows_written, 4);
    assert_eq!(summary.last_checkpoint, 4);
    assert_eq!(checkpoint.load().unwrap(), 4);

    let rows = read_rows(&output);
    assert_eq!(rows.len(), 4);
    let sources: Vec<&str> = rows.iter().map(|r| r[9].as_str()).collect();
    assert_eq!(sources, vec!["1", "1", "3", "4"]);

    let cusco = &rows[2];
    assert_eq!(cusco[1], "Cusco");
    assert_eq!(cusco[4], "protesta");
    assert_eq!(cusco[7], "15/03/2024");
    assert_eq!(cusco[8], "La República");
    assert_eq!(rows[3][7], "2 de marzo de 2024");
}

#[tokio::test]
async fn test_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let checkpoint = CheckpointStore::new(dir.path().join("cp.txt"));
    let pipeline = pipeline(Arc::new(ScriptedGeocoder::new()));
    let news = dataset(NEWS);

    pipeline.run(&news, &output, &checkpoint).await.unwrap();
    let first = std::fs::read_to_string(&output).unwrap();

    let summary = pipeline.run(&news, &output, &checkpoint).await.unwrap();

    assert_eq!(summary.rows_written, 0);
    assert!(!summary.has_new_records());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), first);
}

#[tokio::test]
async fn test_resume_matches_uninterrupted_run() {
    let news = dataset(NEWS);

    let full_dir = tempfile::tempdir().unwrap();
    let full_output = full_dir.path().join("out.csv");
    pipeline(Arc::new(ScriptedGeocoder::new()))
        .run(&news, &full_output, &CheckpointStore::new(full_dir.path().join("cp.txt")))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let checkpoint = CheckpointStore::new(dir.path().join("cp.txt"));

    // Record 3 is the only one geocoding Cusco
    let crashing = pipeline(Arc::new(ScriptedGeocoder::new().failing_on("Cusco")));
    assert!(crashing.run(&news, &output, &checkpoint).await.is_err());
    assert_eq!(checkpoint.load().unwrap(), 2);
    assert_eq!(read_rows(&output).len(), 2);

    let summary = pipeline(Arc::new(ScriptedGeocoder::new()))
        .run(&news, &output, &checkpoint)
        .await
        .unwrap();

    assert_eq!(summary.resumed_from, 2);
    assert_eq!(summary.records_processed, 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        std::fs::read_to_string(&full_output).unwrap()
    );
}

#[tokio::test]
async fn test_blank_record_advances_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let checkpoint = CheckpointStore::new(dir.path().join("cp.txt"));
    let pipeline = pipeline(Arc::new(ScriptedGeocoder::new()));

    let summary = pipeline
        .run(&dataset("medio,texto\nRPP,\n"), &output, &checkpoint)
        .await
        .unwrap();

    assert_eq!(summary.records_skipped_empty, 1);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(checkpoint.load().unwrap(), 1);
    assert!(read_rows(&output).is_empty());
}

#[tokio::test]
async fn test_nothing_pending_leaves_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let checkpoint = CheckpointStore::new(dir.path().join("cp.txt"));
    checkpoint.save(10).unwrap();

    let summary = pipeline(Arc::new(ScriptedGeocoder::new()))
        .run(&dataset(NEWS), &output, &checkpoint)
        .await
        .unwrap();

    assert_eq!(summary.resumed_from, 10);
    assert_eq!(summary.last_checkpoint, 10);
    assert!(!output.exists());
}
