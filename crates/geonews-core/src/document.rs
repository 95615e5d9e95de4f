//! Annotated document model
//!
//! Output of the language-model oracle: sentence boundaries, tokens with
//! part-of-speech and dependency annotations, and labelled entity spans.
//! All positions are token indices; sentence and entity ranges are
//! half-open (`start..end`).

use serde::{Deserialize, Serialize};

/// Entity label consumed as a location
pub const LOCATION_LABEL: &str = "LOC";

/// A single token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Surface text
    pub text: String,

    /// Coarse part-of-speech tag (e.g. `VERB`, `NOUN`)
    #[serde(default)]
    pub pos: String,

    /// Dependency label (e.g. `ROOT`, `nsubj`)
    #[serde(default)]
    pub dep: String,

    /// Index of the syntactic head; a root token points at itself
    pub head: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, head: usize) -> Self {
        Self {
            text: text.into(),
            pos: String::new(),
            dep: String::new(),
            head,
        }
    }

    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = pos.into();
        self
    }

    pub fn with_dep(mut self, dep: impl Into<String>) -> Self {
        self.dep = dep.into();
        self
    }
}

/// A sentence span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Sentence {
    pub fn contains(&self, token: usize) -> bool {
        self.start <= token && token < self.end
    }
}

/// A labelled entity span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl EntitySpan {
    pub fn is_location(&self) -> bool {
        self.label == LOCATION_LABEL
    }
}

/// A fully annotated text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedDoc {
    #[serde(default)]
    pub tokens: Vec<Token>,

    #[serde(default)]
    pub sentences: Vec<Sentence>,

    #[serde(default)]
    pub entities: Vec<EntitySpan>,
}

impl AnnotatedDoc {
    /// Sentence containing the given token
    pub fn sentence_of(&self, token: usize) -> Option<&Sentence> {
        self.sentences.iter().find(|s| s.contains(token))
    }

    /// Tokens of a sentence in order, with their document indices
    pub fn sentence_tokens<'a>(
        &'a self,
        sentence: &Sentence,
    ) -> impl Iterator<Item = (usize, &'a Token)> + 'a {
        let end = sentence.end.min(self.tokens.len());
        let start = sentence.start.min(end);
        (start..end).map(move |i| (i, &self.tokens[i]))
    }

    /// Syntactic children of a token, in document order
    pub fn children(&self, head: usize) -> impl Iterator<Item = (usize, &Token)> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .filter(move |(i, t)| t.head == head && *i != head)
    }

    /// Entities labelled as locations, in document order
    pub fn location_entities(&self) -> impl Iterator<Item = &EntitySpan> {
        self.entities.iter().filter(|e| e.is_location())
    }
}
