//! Geographic context detection
//!
//! Infers the dominant region or city of a text by substring search for
//! prepositional phrases ("en Puno", "de Cusco", "región Ica", ...).
//! Regions are checked before cities; within a table the earlier entry wins.

use geonews_core::GeoContext;

use crate::patterns::{PatternLibrary, PERU};

const REGION_PREFIXES: [&str; 4] = ["en ", "de ", "región ", "departamento de "];
const CITY_PREFIXES: [&str; 3] = ["en ", "de ", "ciudad de "];

/// Region/city detector
#[derive(Debug, Clone, Copy)]
pub struct GeoContextDetector<'a> {
    library: &'a PatternLibrary,
}

impl GeoContextDetector<'static> {
    pub fn new() -> Self {
        Self { library: &PERU }
    }
}

impl Default for GeoContextDetector<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> GeoContextDetector<'a> {
    pub fn with_library(library: &'a PatternLibrary) -> Self {
        Self { library }
    }

    /// Detect the geographic context of a text
    pub fn detect(&self, text: &str) -> Option<GeoContext> {
        let lower = text.to_lowercase();

        first_mentioned(&lower, self.library.regions(), &REGION_PREFIXES)
            .or_else(|| first_mentioned(&lower, self.library.cities(), &CITY_PREFIXES))
            .map(GeoContext::new)
    }
}

fn first_mentioned<'n>(lower: &str, names: &'n [String], prefixes: &[&str]) -> Option<&'n str> {
    names
        .iter()
        .find(|name| {
            let name = name.to_lowercase();
            prefixes
                .iter()
                .any(|prefix| lower.contains(&format!("{prefix}{name}")))
        })
        .map(String::as_str)
}

/// Detect with the default region and city tables
pub fn detect_geo_context(text: &str) -> Option<GeoContext> {
    GeoContextDetector::new().detect(text)
}
