//! Language-model oracle backends
//!
//! Provides two [`Annotator`] implementations:
//! - Rule-based: offline tokenizer, sentence splitter and gazetteer/preposition
//!   location tagger (no part-of-speech or dependency parse)
//! - HTTP: a model served by an annotation sidecar returning an
//!   [`AnnotatedDoc`] as JSON
//!
//! Author: hephaex@gmail.com

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use geonews_core::{
    AnnotatedDoc, Annotator, EntitySpan, GeoNewsError, NlpBackend, NlpConfig, Result, Sentence,
    Token, LOCATION_LABEL,
};

use crate::patterns::{PatternLibrary, PERU};

// ============================================================================
// Rule-based Annotator
// ============================================================================

const SENTENCE_END: [&str; 4] = [".", "!", "?", "…"];
const LOCATIVES: [&str; 4] = ["en", "desde", "hacia", "hasta"];
const ARTICLES: [&str; 4] = ["el", "la", "los", "las"];
const CONNECTORS: [&str; 6] = ["de", "del", "el", "la", "los", "las"];
const EXTRA_ABBREVIATIONS: [&str; 11] = [
    "cdra", "sr", "sra", "dr", "dra", "ing", "urb", "mz", "lt", "nro", "st",
];

/// Offline annotator built from the pattern library tables
#[derive(Debug, Clone)]
pub struct RuleBasedAnnotator {
    /// Region and city names, tokenized and lowercased
    gazetteer: Vec<Vec<String>>,
    /// Street-type words without trailing dot
    street_words: HashSet<String>,
    /// Words whose trailing dot does not end a sentence
    abbreviations: HashSet<String>,
}

impl RuleBasedAnnotator {
    /// Create an annotator over the Peruvian tables
    pub fn new() -> Self {
        Self::with_library(&PERU)
    }

    /// Create an annotator over a custom library
    pub fn with_library(library: &PatternLibrary) -> Self {
        let mut gazetteer: Vec<Vec<String>> = Vec::new();
        for name in library.regions().iter().chain(library.cities()) {
            let words: Vec<String> = tokenize(name)
                .iter()
                .map(|(s, e)| name[*s..*e].to_lowercase())
                .collect();
            if !words.is_empty() && !gazetteer.contains(&words) {
                gazetteer.push(words);
            }
        }

        let street_words: HashSet<String> = library
            .street_words()
            .iter()
            .map(|w| w.trim_end_matches('.').to_string())
            .filter(|w| !w.is_empty())
            .collect();

        let abbreviations = street_words
            .iter()
            .cloned()
            .chain(EXTRA_ABBREVIATIONS.iter().map(|w| w.to_string()))
            .collect();

        Self {
            gazetteer,
            street_words,
            abbreviations,
        }
    }

    /// Annotate synchronously
    pub fn annotate_text(&self, text: &str) -> AnnotatedDoc {
        let spans = tokenize(text);
        let words: Vec<&str> = spans.iter().map(|(s, e)| &text[*s..*e]).collect();

        let tokens = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i).with_pos(guess_pos(w)))
            .collect();

        let sentences = self
            .split_sentences(&spans, &words)
            .into_iter()
            .map(|(start, end)| Sentence {
                start,
                end,
                text: text[spans[start].0..spans[end - 1].1].to_string(),
            })
            .collect();

        let entities = self
            .tag_locations(&words)
            .into_iter()
            .map(|(start, end)| EntitySpan {
                text: text[spans[start].0..spans[end - 1].1].to_string(),
                label: LOCATION_LABEL.to_string(),
                start,
                end,
            })
            .collect();

        AnnotatedDoc {
            tokens,
            sentences,
            entities,
        }
    }

    /// Token ranges of sentences
    fn split_sentences(&self, spans: &[(usize, usize)], words: &[&str]) -> Vec<(usize, usize)> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for i in 0..words.len() {
            if !SENTENCE_END.contains(&words[i]) {
                continue;
            }

            // "Av." / "cdra." and similar
            if words[i] == "."
                && i > 0
                && spans[i - 1].1 == spans[i].0
                && self.abbreviations.contains(&words[i - 1].to_lowercase())
            {
                continue;
            }

            if let Some(next) = words.get(i + 1) {
                if !starts_sentence(next) {
                    continue;
                }
            }

            sentences.push((start, i + 1));
            start = i + 1;
        }

        if start < words.len() {
            sentences.push((start, words.len()));
        }

        sentences
    }

    /// Token ranges of location mentions, non-overlapping, in order
    fn tag_locations(&self, words: &[&str]) -> Vec<(usize, usize)> {
        let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let mut spans = Vec::new();

        // Capitalized names introduced by a locative preposition
        for i in 0..words.len() {
            if !LOCATIVES.contains(&lower[i].as_str()) {
                continue;
            }
            let mut j = i + 1;
            if j < words.len() && ARTICLES.contains(&lower[j].as_str()) {
                j += 1;
            }
            if j >= words.len()
                || !is_capitalized(words[j])
                || self.street_words.contains(&lower[j])
            {
                continue;
            }

            let mut end = j + 1;
            loop {
                if end < words.len() && is_capitalized(words[end]) {
                    end += 1;
                } else if end + 1 < words.len()
                    && CONNECTORS.contains(&lower[end].as_str())
                    && is_capitalized(words[end + 1])
                {
                    end += 2;
                } else {
                    break;
                }
            }
            spans.push((j, end));
        }

        // Known regions and cities outside street names
        for name in &self.gazetteer {
            if name.len() > lower.len() {
                continue;
            }
            for i in 0..=(lower.len() - name.len()) {
                if lower[i..i + name.len()] == name[..] && !self.follows_street_word(&lower, i) {
                    spans.push((i, i + name.len()));
                }
            }
        }

        // Longest span first at each start; drop overlaps
        spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        let mut result: Vec<(usize, usize)> = Vec::new();
        for span in spans {
            if result.last().map_or(true, |last| span.0 >= last.1) {
                result.push(span);
            }
        }
        result
    }

    fn follows_street_word(&self, lower: &[String], i: usize) -> bool {
        match i {
            0 => false,
            1 => self.street_words.contains(&lower[0]),
            _ => {
                self.street_words.contains(&lower[i - 1])
                    || (lower[i - 1] == "." && self.street_words.contains(&lower[i - 2]))
            }
        }
    }
}

impl Default for RuleBasedAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Annotator for RuleBasedAnnotator {
    async fn annotate(&self, text: &str) -> Result<AnnotatedDoc> {
        Ok(self.annotate_text(text))
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// Byte ranges of word and punctuation tokens
fn tokenize(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c.is_alphanumeric() {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            spans.push((start, i));
        }
        if !c.is_whitespace() {
            spans.push((i, i + c.len_utf8()));
        }
    }
    if let Some(start) = word_start {
        spans.push((start, text.len()));
    }

    spans
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn starts_sentence(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || "¿¡\"«“(".contains(c))
}

fn guess_pos(word: &str) -> &'static str {
    if word.chars().all(|c| !c.is_alphanumeric()) {
        "PUNCT"
    } else if word.chars().all(char::is_numeric) {
        "NUM"
    } else if is_capitalized(word) {
        "PROPN"
    } else {
        "X"
    }
}

// ============================================================================
// HTTP Annotator
// ============================================================================

/// Client for an annotation sidecar (`POST {base_url}/parse`)
pub struct HttpAnnotator {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
    text: &'a str,
}

impl HttpAnnotator {
    /// Create a new HTTP annotator
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from config
    pub fn from_config(config: &NlpConfig) -> Self {
        Self::new(config.url.clone())
    }
}

#[async_trait]
impl Annotator for HttpAnnotator {
    async fn annotate(&self, text: &str) -> Result<AnnotatedDoc> {
        let response = self
            .client
            .post(format!("{}/parse", self.base_url))
            .json(&ParseRequest { text })
            .send()
            .await
            .map_err(|e| GeoNewsError::NlpError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeoNewsError::NlpError(format!(
                "Annotator returned {status}: {error_text}"
            )));
        }

        let doc: AnnotatedDoc = response
            .json()
            .await
            .map_err(|e| GeoNewsError::NlpError(format!("Failed to parse response: {e}")))?;

        debug!(
            tokens = doc.tokens.len(),
            entities = doc.entities.len(),
            "Annotated text"
        );
        Ok(doc)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Create an annotator from configuration
pub fn create_annotator(config: &NlpConfig) -> Arc<dyn Annotator> {
    match config.backend {
        NlpBackend::Rules => Arc::new(RuleBasedAnnotator::new()),
        NlpBackend::Http => Arc::new(HttpAnnotator::from_config(config)),
    }
}

// ============================================================================
// Tests
// ============================================================================
