//! Pattern library
//!
//! Static tables driving the heuristic extractors: address and date regexes,
//! event keywords, administrative regions, principal cities and street-type
//! words. Tables are built once; [`PERU`] holds the Peruvian Spanish set.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::warn;

use geonews_core::{EventType, DATE_NOT_FOUND};

/// Pattern library for Peruvian Spanish news
pub static PERU: Lazy<PatternLibrary> = Lazy::new(PatternLibrary::peru);

// Character class for place-name words
const NAME_CHARS: &str = "A-ZÁÉÍÓÚÑa-záéíóúñ";

/// Regexes and keyword tables used by the extractors
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    /// Street addresses and intersections, scanned in order
    address_patterns: Vec<Regex>,
    /// Date formats in priority order
    date_patterns: Vec<Regex>,
    /// Event categories in priority order, each with ordered keywords
    event_keywords: Vec<(EventType, Vec<String>)>,
    /// Administrative regions, checked before cities
    regions: Vec<String>,
    /// Principal cities
    cities: Vec<String>,
    /// Lowercase street-type words and abbreviations
    street_words: Vec<String>,
}

impl PatternLibrary {
    /// Library with no patterns or tables
    pub fn empty() -> Self {
        Self::default()
    }

    /// Library for Peruvian Spanish news
    pub fn peru() -> Self {
        let mut lib = Self::empty();
        lib.init_address_patterns();
        lib.init_date_patterns();
        lib.init_event_keywords();
        lib.init_geography();
        lib
    }

    fn init_address_patterns(&mut self) {
        let street = r"(?:Av\.|Avenida|Jr\.|Jirón|Calle|Ca\.|Psje\.|Pasaje)";
        let name = format!(r"[{NAME_CHARS}\s\.]+");

        // Block-qualified form first so the name does not swallow "cdra."
        self.add_address_pattern(&format!(
            r"{street}\s+{name}\s+(?:cdra\.|cuadra)\s+\d+|{street}\s+{name}"
        ));

        let corner = r"(?:cruce|esquina|intersección)";
        let street_name = format!(r"[{NAME_CHARS}\s]+");
        self.add_address_pattern(&format!(
            r"{corner}\s+(?:de\s+)?{street_name}\s+(?:con|y)\s+{street_name}"
        ));
    }

    fn init_date_patterns(&mut self) {
        let months = "enero|febrero|marzo|abril|mayo|junio|julio|agosto|\
                      septiembre|octubre|noviembre|diciembre";
        self.add_date_pattern(&format!(r"\d{{1,2}}\s+de\s+(?:{months})\s+(?:de\s+)?\d{{4}}"));
        self.add_date_pattern(r"\d{1,2}/\d{1,2}/\d{4}");
        self.add_date_pattern(r"\d{4}-\d{2}-\d{2}");
    }

    fn init_event_keywords(&mut self) {
        self.add_event(
            EventType::Accident,
            &["choque", "atropello", "colisión", "accidente", "impacto", "despiste"],
        );
        self.add_event(
            EventType::Crime,
            &[
                "robo",
                "asalto",
                "hurto",
                "asesinato",
                "homicidio",
                "balacera",
                "sicario",
                "delincuente",
            ],
        );
        self.add_event(
            EventType::Protest,
            &["marcha", "manifestación", "paro", "protesta", "bloqueo", "plantón"],
        );
        self.add_event(
            EventType::Inauguration,
            &["inauguró", "inauguración", "abrió", "apertura", "estreno", "presentó"],
        );
        self.add_event(
            EventType::Emergency,
            &["incendio", "explosión", "derrumbe", "deslizamiento", "inundación", "sismo"],
        );
        self.add_event(
            EventType::Construction,
            &["construcción", "edificación", "obra", "proyecto", "remodelación"],
        );
    }

    fn init_geography(&mut self) {
        for region in [
            "Amazonas",
            "Áncash",
            "Apurímac",
            "Arequipa",
            "Ayacucho",
            "Cajamarca",
            "Callao",
            "Cusco",
            "Huancavelica",
            "Huánuco",
            "Ica",
            "Junín",
            "La Libertad",
            "Lambayeque",
            "Lima",
            "Loreto",
            "Madre de Dios",
            "Moquegua",
            "Pasco",
            "Piura",
            "Puno",
            "San Martín",
            "Tacna",
            "Tumbes",
            "Ucayali",
        ] {
            self.add_region(region);
        }

        for city in [
            "Trujillo",
            "Chiclayo",
            "Iquitos",
            "Piura",
            "Cusco",
            "Arequipa",
            "Huancayo",
            "Tacna",
            "Ica",
            "Pucallpa",
            "Chimbote",
            "Juliaca",
            "Tarapoto",
            "Huaraz",
            "Cajamarca",
        ] {
            self.add_city(city);
        }

        for word in ["avenida", "av.", "jirón", "jr.", "calle", "ca.", "pasaje", "psje."] {
            self.add_street_word(word);
        }
    }

    /// Add a case-insensitive address pattern; returns false if it does not compile
    pub fn add_address_pattern(&mut self, pattern: &str) -> bool {
        match case_insensitive(pattern) {
            Some(regex) => {
                self.address_patterns.push(regex);
                true
            }
            None => false,
        }
    }

    /// Add a case-insensitive date pattern; returns false if it does not compile
    pub fn add_date_pattern(&mut self, pattern: &str) -> bool {
        match case_insensitive(pattern) {
            Some(regex) => {
                self.date_patterns.push(regex);
                true
            }
            None => false,
        }
    }

    /// Append an event category with its keywords
    pub fn add_event(&mut self, event_type: EventType, keywords: &[&str]) {
        self.event_keywords.push((
            event_type,
            keywords.iter().map(|k| k.to_lowercase()).collect(),
        ));
    }

    pub fn add_region(&mut self, name: &str) {
        self.regions.push(name.to_string());
    }

    pub fn add_city(&mut self, name: &str) {
        self.cities.push(name.to_string());
    }

    pub fn add_street_word(&mut self, word: &str) {
        self.street_words.push(word.to_lowercase());
    }

    pub fn event_keywords(&self) -> &[(EventType, Vec<String>)] {
        &self.event_keywords
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// Lowercase street-type words, abbreviations keeping their dot
    pub fn street_words(&self) -> &[String] {
        &self.street_words
    }

    /// First date found, scanning patterns in priority order
    ///
    /// Returns the "not found" sentinel when no pattern matches.
    pub fn extract_date(&self, text: &str) -> String {
        self.date_patterns
            .iter()
            .find_map(|p| p.find(text))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| DATE_NOT_FOUND.to_string())
    }

    /// All address and intersection matches, trimmed, in pattern order
    pub fn find_addresses(&self, text: &str) -> Vec<String> {
        self.address_patterns
            .iter()
            .flat_map(|p| p.find_iter(text))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whether a location contains a street-type word (case-insensitive substring)
    pub fn is_street_address(&self, location: &str) -> bool {
        let lower = location.to_lowercase();
        self.street_words.iter().any(|w| lower.contains(w.as_str()))
    }
}

fn case_insensitive(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(pattern, error = %e, "Ignoring invalid pattern");
            None
        }
    }
}
