//! Event classification
//!
//! Keyword classifier over a fixed, ordered category table. The first
//! category (in declared order) owning a keyword found anywhere in the
//! lowercased text wins. Keywords match as plain substrings, so "paro"
//! also fires inside "disparo".

use geonews_core::EventType;

use crate::patterns::{PatternLibrary, PERU};

/// Keyword-based event classifier
#[derive(Debug, Clone, Copy)]
pub struct EventClassifier<'a> {
    library: &'a PatternLibrary,
}

impl EventClassifier<'static> {
    /// Classifier over the Peruvian keyword table
    pub fn new() -> Self {
        Self { library: &PERU }
    }
}

impl Default for EventClassifier<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> EventClassifier<'a> {
    /// Classifier over a custom library
    pub fn with_library(library: &'a PatternLibrary) -> Self {
        Self { library }
    }

    /// Classify a text into exactly one event category
    pub fn classify(&self, text: &str) -> EventType {
        let lower = text.to_lowercase();

        self.library
            .event_keywords()
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|(event_type, _)| *event_type)
            .unwrap_or(EventType::Other)
    }
}

/// Classify with the default keyword table
pub fn classify_event(text: &str) -> EventType {
    EventClassifier::new().classify(text)
}
