//! Geonews Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout geonews:
//! - Record models (source records, extracted locations, output rows)
//! - Coordinate values with an explicit "unknown" sentinel
//! - Annotated document model produced by the language-model oracle
//! - Common error types
//! - Oracle traits for annotation and geocoding
//! - Configuration management
//!
//! Author: hephaex@gmail.com

pub mod config;
pub mod document;

pub use config::{
    AppConfig, ConfigError, GeocoderConfig, InputConfig, LoggingConfig, NlpBackend, NlpConfig,
    OutputConfig, PublishConfig,
};
pub use document::{AnnotatedDoc, EntitySpan, Sentence, Token, LOCATION_LABEL};

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Sentinel written in place of a coordinate the geocoder could not resolve
pub const UNKNOWN_COORDINATE: &str = "desconocido";

/// Sentinel written when no date pattern matches
pub const DATE_NOT_FOUND: &str = "Fecha no encontrada";

/// Outlet name used when the input row has no outlet field
pub const UNKNOWN_OUTLET: &str = "Desconocido";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for geonews operations
#[derive(Error, Debug)]
pub enum GeoNewsError {
    #[error("Dataset error: {0}")]
    DatasetError(String),

    #[error("NLP oracle error: {0}")]
    NlpError(String),

    #[error("Geocoding error: {0}")]
    GeocodingError(String),

    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GeoNewsError>;

// ============================================================================
// Input Records
// ============================================================================

/// One row of the source dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// News outlet that published the text
    pub outlet: String,

    /// Free text of the news item
    pub text: String,

    /// 1-based position of the row in the dataset
    pub sequence: u64,
}

impl SourceRecord {
    /// Create a new source record
    pub fn new(outlet: impl Into<String>, text: impl Into<String>, sequence: u64) -> Self {
        Self {
            outlet: outlet.into(),
            text: text.into(),
            sequence,
        }
    }

    /// Whether the record carries no text worth processing
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ============================================================================
// Extraction Models
// ============================================================================

/// Where a location mention came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationOrigin {
    /// Location-type entity from the language model
    Ner,
    /// Street address or intersection matched by regex
    RegexAddress,
}

/// A location mention found in one record's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedLocation {
    /// Literal text as it appears in the source
    pub text: String,

    /// Extraction path
    pub origin: LocationOrigin,

    /// Starting token of the entity (NER only)
    pub token_start: Option<usize>,
}

impl ExtractedLocation {
    /// Location produced by the language model
    pub fn from_entity(text: impl Into<String>, token_start: usize) -> Self {
        Self {
            text: text.into(),
            origin: LocationOrigin::Ner,
            token_start: Some(token_start),
        }
    }

    /// Location produced by the address patterns
    pub fn from_address(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: LocationOrigin::RegexAddress,
            token_start: None,
        }
    }
}

/// Dominant region or city inferred for a whole text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GeoContext(String);

impl GeoContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GeoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sentence surrounding a location, with the governing verb and its subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextInfo {
    /// Sentence text, trimmed
    pub sentence: String,

    /// Main verb of the sentence
    pub verb: Option<String>,

    /// Grammatical subject of that verb
    pub subject: Option<String>,
}

impl ContextInfo {
    /// Context with a sentence only
    pub fn sentence_only(sentence: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            verb: None,
            subject: None,
        }
    }

    /// Actors surfaced in the output: the subject, or empty
    pub fn actors(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }
}

/// Event category assigned to a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    #[serde(rename = "accidente")]
    Accident,
    #[serde(rename = "delito")]
    Crime,
    #[serde(rename = "protesta")]
    Protest,
    #[serde(rename = "inauguracion")]
    Inauguration,
    #[serde(rename = "emergencia")]
    Emergency,
    #[serde(rename = "obra")]
    Construction,
    #[serde(rename = "otro")]
    Other,
}

impl EventType {
    /// Label written to the output dataset
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accident => "accidente",
            Self::Crime => "delito",
            Self::Protest => "protesta",
            Self::Inauguration => "inauguracion",
            Self::Emergency => "emergencia",
            Self::Construction => "obra",
            Self::Other => "otro",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Geocoding Models
// ============================================================================

/// A latitude or longitude value, or the recorded "unknown" sentinel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coordinate {
    Known(f64),
    Unknown,
}

impl Coordinate {
    /// Parse a value as written to the output dataset
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == UNKNOWN_COORDINATE {
            return Some(Self::Unknown);
        }
        value.parse::<f64>().ok().map(Self::Known)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Known(v) => Some(*v),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(v) => write!(f, "{v}"),
            Self::Unknown => f.write_str(UNKNOWN_COORDINATE),
        }
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => serializer.serialize_f64(*v),
            Self::Unknown => serializer.serialize_str(UNKNOWN_COORDINATE),
        }
    }
}

/// A location with its resolved (or unknown) coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub location: String,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
}

impl ResolvedLocation {
    pub fn found(location: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            location: location.into(),
            latitude: Coordinate::Known(latitude),
            longitude: Coordinate::Known(longitude),
        }
    }

    /// Sentinel pair for a failed lookup
    pub fn unknown(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            latitude: Coordinate::Unknown,
            longitude: Coordinate::Unknown,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Coordinate::Known(_), Coordinate::Known(_))
        )
    }
}

// ============================================================================
// Output Rows
// ============================================================================

/// Column order of the output dataset
pub const OUTPUT_COLUMNS: [&str; 10] = [
    "id_fila",
    "ubicacion",
    "latitud",
    "longitud",
    "tipo_evento",
    "actores",
    "contexto",
    "fecha",
    "medio",
    "fila_fuente",
];

/// One denormalized row of the output dataset
///
/// Field order matches [`OUTPUT_COLUMNS`]. `record_id` and `source_record`
/// always hold the same sequence number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    #[serde(rename = "id_fila")]
    pub record_id: u64,

    #[serde(rename = "ubicacion")]
    pub location: String,

    #[serde(rename = "latitud")]
    pub latitude: Coordinate,

    #[serde(rename = "longitud")]
    pub longitude: Coordinate,

    #[serde(rename = "tipo_evento")]
    pub event_type: EventType,

    #[serde(rename = "actores")]
    pub actors: String,

    #[serde(rename = "contexto")]
    pub context: String,

    #[serde(rename = "fecha")]
    pub date: String,

    #[serde(rename = "medio")]
    pub outlet: String,

    #[serde(rename = "fila_fuente")]
    pub source_record: u64,
}

impl OutputRow {
    /// Combine record metadata with one resolved location
    pub fn assemble(
        record: &SourceRecord,
        resolved: ResolvedLocation,
        event_type: EventType,
        date: &str,
        context: Option<&ContextInfo>,
    ) -> Self {
        Self {
            record_id: record.sequence,
            location: resolved.location,
            latitude: resolved.latitude,
            longitude: resolved.longitude,
            event_type,
            actors: context.map(|c| c.actors().to_string()).unwrap_or_default(),
            context: context.map(|c| c.sentence.clone()).unwrap_or_default(),
            date: date.to_string(),
            outlet: record.outlet.clone(),
            source_record: record.sequence,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Language-model oracle: sentences, tokens with dependency info, entities
#[async_trait::async_trait]
pub trait Annotator: Send + Sync {
    /// Annotate a text
    async fn annotate(&self, text: &str) -> Result<AnnotatedDoc>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Result of a single geocoding query
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    /// Best match coordinates
    Found { latitude: f64, longitude: f64 },
    /// The service answered with no result
    NoMatch,
    /// Timeout or service-side error
    Unavailable(String),
}

/// Geocoding oracle: free-text query to zero or one coordinate
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a query string
    async fn geocode(&self, query: &str) -> Result<GeocodeOutcome>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_record() {
        assert!(SourceRecord::new("RPP", "   \n\t", 3).is_blank());
        assert!(SourceRecord::new("RPP", "", 3).is_blank());
        assert!(!SourceRecord::new("RPP", "Choque en Lima", 3).is_blank());
    }

    #[test]
    fn test_coordinate_display_and_parse() {
        assert_eq!(Coordinate::Unknown.to_string(), "desconocido");
        assert_eq!(Coordinate::Known(-12.0464).to_string(), "-12.0464");
        assert_eq!(Coordinate::parse("desconocido"), Some(Coordinate::Unknown));
        assert_eq!(Coordinate::parse(" -77.04 "), Some(Coordinate::Known(-77.04)));
        assert_eq!(Coordinate::parse("n/a"), None);
    }

    #[test]
    fn test_assemble_duplicates_sequence() {
        let record = SourceRecord::new("El Comercio", "texto", 42);
        let context = ContextInfo {
            sentence: "La policía detuvo al sujeto en Surco.".to_string(),
            verb: Some("detuvo".to_string()),
            subject: Some("policía".to_string()),
        };

        let row = OutputRow::assemble(
            &record,
            ResolvedLocation::unknown("Surco"),
            EventType::Crime,
            DATE_NOT_FOUND,
            Some(&context),
        );

        assert_eq!(row.record_id, 42);
        assert_eq!(row.source_record, row.record_id);
        assert_eq!(row.actors, "policía");
        assert_eq!(row.latitude, Coordinate::Unknown);
        assert_eq!(row.outlet, "El Comercio");
    }

    #[test]
    fn test_assemble_without_context() {
        let record = SourceRecord::new("RPP", "texto", 1);
        let row = OutputRow::assemble(
            &record,
            ResolvedLocation::found("Lima", -12.0, -77.0),
            EventType::Other,
            "2024-01-15",
            None,
        );
        assert_eq!(row.actors, "");
        assert_eq!(row.context, "");
    }

    #[test]
    fn test_actors_ignore_verb() {
        let context = ContextInfo {
            sentence: "Ocurrió un choque.".to_string(),
            verb: Some("Ocurrió".to_string()),
            subject: None,
        };
        assert_eq!(context.actors(), "");
    }

    #[test]
    fn test_event_type_labels() {
        assert_eq!(EventType::Inauguration.to_string(), "inauguracion");
        assert_eq!(
            serde_json::to_value(EventType::Construction).unwrap(),
            serde_json::json!("obra")
        );
    }

    #[test]
    fn test_row_json_keeps_sentinel() {
        let row = OutputRow::assemble(
            &SourceRecord::new("RPP", "texto", 3),
            ResolvedLocation::unknown("Ate"),
            EventType::Other,
            DATE_NOT_FOUND,
            None,
        );
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["latitud"], "desconocido");
        assert_eq!(value["fila_fuente"], 3);
    }

    struct FixedGeocoder;

    #[async_trait::async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, query: &str) -> Result<GeocodeOutcome> {
            if query.is_empty() {
                return Ok(GeocodeOutcome::NoMatch);
            }
            Ok(GeocodeOutcome::Found {
                latitude: -12.0,
                longitude: -77.0,
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_geocoder_trait_object() {
        let geocoder: std::sync::Arc<dyn Geocoder> = std::sync::Arc::new(FixedGeocoder);
        assert_eq!(geocoder.name(), "fixed");
        assert_eq!(
            tokio_test::block_on(geocoder.geocode("")).unwrap(),
            GeocodeOutcome::NoMatch
        );
        assert!(matches!(
            tokio_test::block_on(geocoder.geocode("Lima, Perú")).unwrap(),
            GeocodeOutcome::Found { .. }
        ));
    }
}
