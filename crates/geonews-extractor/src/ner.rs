//! Entity & address extraction
//!
//! Combines location-type entities from the language model with regex
//! address matches. The union is deduplicated by exact literal text: no
//! case, accent or whitespace normalization, first occurrence kept.
//! Entities come before addresses, so a literal found by both keeps its
//! entity origin and token position.

use std::collections::HashSet;

use geonews_core::{AnnotatedDoc, ExtractedLocation};

use crate::patterns::{PatternLibrary, PERU};

/// Location extractor
#[derive(Debug, Clone, Copy)]
pub struct LocationExtractor<'a> {
    library: &'a PatternLibrary,
}

impl LocationExtractor<'static> {
    pub fn new() -> Self {
        Self { library: &PERU }
    }
}

impl Default for LocationExtractor<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> LocationExtractor<'a> {
    pub fn with_library(library: &'a PatternLibrary) -> Self {
        Self { library }
    }

    /// Location entities from the annotated document, in document order
    pub fn extract_entities(&self, doc: &AnnotatedDoc) -> Vec<ExtractedLocation> {
        doc.location_entities()
            .map(|e| ExtractedLocation::from_entity(e.text.clone(), e.start))
            .collect()
    }

    /// Address and intersection matches in the raw text
    pub fn extract_addresses(&self, text: &str) -> Vec<ExtractedLocation> {
        self.library
            .find_addresses(text)
            .into_iter()
            .map(ExtractedLocation::from_address)
            .collect()
    }

    /// Deduplicated union of entity and address locations
    pub fn extract(&self, text: &str, doc: &AnnotatedDoc) -> Vec<ExtractedLocation> {
        let candidates = self
            .extract_entities(doc)
            .into_iter()
            .chain(self.extract_addresses(text));

        deduplicate(candidates)
    }
}

/// Keep the first occurrence of every literal text
pub fn deduplicate(
    locations: impl IntoIterator<Item = ExtractedLocation>,
) -> Vec<ExtractedLocation> {
    let mut seen: HashSet<String> = HashSet::new();

    locations
        .into_iter()
        .filter(|loc| seen.insert(loc.text.clone()))
        .collect()
}
