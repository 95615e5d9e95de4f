//! Geonews Extractor - Text annotation pipeline stages
//!
//! Implements the heuristic stages that turn one news text into located
//! mentions: pattern library, event classification, geographic context
//! detection, entity & address extraction and context attachment, plus
//! the language-model oracle backends.

pub mod annotator;
pub mod context;
pub mod event;
pub mod geo_context;
pub mod ner;
pub mod patterns;

pub use annotator::{create_annotator, HttpAnnotator, RuleBasedAnnotator};
pub use context::attach_context;
pub use event::{classify_event, EventClassifier};
pub use geo_context::{detect_geo_context, GeoContextDetector};
pub use ner::{deduplicate, LocationExtractor};
pub use patterns::{PatternLibrary, PERU};
