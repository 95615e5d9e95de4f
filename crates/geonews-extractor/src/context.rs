//! Context attachment
//!
//! Finds the sentence a location appears in and, for entity locations,
//! the subject of the sentence's main verb ("who did what" near the place).

use geonews_core::{AnnotatedDoc, ContextInfo, ExtractedLocation};

// Dependency labels of a governing verb
const VERB_DEPS: [&str; 3] = ["ROOT", "ccomp", "xcomp"];
// Dependency labels of its subject
const SUBJECT_DEPS: [&str; 3] = ["nsubj", "nsubjpass", "nsubj:pass"];

/// Attach sentence context to a location
///
/// Entity locations use the sentence of their starting token. Other
/// locations fall back to the first sentence containing the location text
/// (case-insensitive), without verb or subject. Returns `None` when no
/// sentence is found.
pub fn attach_context(doc: &AnnotatedDoc, location: &ExtractedLocation) -> Option<ContextInfo> {
    location
        .token_start
        .and_then(|token| context_from_entity(doc, token))
        .or_else(|| context_from_text(doc, &location.text))
}

fn context_from_entity(doc: &AnnotatedDoc, token: usize) -> Option<ContextInfo> {
    let sentence = doc.sentence_of(token)?;

    let verb = doc
        .sentence_tokens(sentence)
        .find(|(_, t)| t.pos == "VERB" && is_verb_dep(&t.dep));

    let (verb, subject) = match verb {
        Some((idx, verb_token)) => {
            let subject = doc
                .children(idx)
                .find(|(_, t)| SUBJECT_DEPS.contains(&t.dep.as_str()))
                .map(|(_, t)| t.text.clone());
            (Some(verb_token.text.clone()), subject)
        }
        None => (None, None),
    };

    Some(ContextInfo {
        sentence: sentence.text.trim().to_string(),
        verb,
        subject,
    })
}

fn context_from_text(doc: &AnnotatedDoc, location: &str) -> Option<ContextInfo> {
    let needle = location.to_lowercase();

    doc.sentences
        .iter()
        .find(|s| s.text.to_lowercase().contains(&needle))
        .map(|s| ContextInfo::sentence_only(s.text.trim()))
}

fn is_verb_dep(dep: &str) -> bool {
    VERB_DEPS.iter().any(|d| d.eq_ignore_ascii_case(dep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geonews_core::{Sentence, Token};

    /// "La policía capturó a dos sujetos en Comas ."
    /// "Luego hubo un choque en la Av. Túpac Amaru ."
    fn sample_doc() -> AnnotatedDoc {
        let tokens = vec![
            Token::new("La", 1).with_pos("DET").with_dep("det"),
            Token::new("policía", 2).with_pos("NOUN").with_dep("nsubj"),
            Token::new("capturó", 2).with_pos("VERB").with_dep("ROOT"),
            Token::new("a", 5).with_pos("ADP").with_dep("case"),
            Token::new("dos", 5).with_pos("NUM").with_dep("nummod"),
            Token::new("sujetos", 2).with_pos("NOUN").with_dep("obj"),
            Token::new("en", 7).with_pos("ADP").with_dep("case"),
            Token::new("Comas", 2).with_pos("PROPN").with_dep("obl"),
            Token::new(".", 2).with_pos("PUNCT").with_dep("punct"),
            Token::new("Luego", 10).with_pos("ADV").with_dep("advmod"),
            Token::new("hubo", 10).with_pos("AUX").with_dep("ROOT"),
            Token::new("un", 12).with_pos("DET").with_dep("det"),
            Token::new("choque", 10).with_pos("NOUN").with_dep("obj"),
        ];
        AnnotatedDoc {
            tokens,
            sentences: vec![
                Sentence {
                    start: 0,
                    end: 9,
                    text: "La policía capturó a dos sujetos en Comas. ".to_string(),
                },
                Sentence {
                    start: 9,
                    end: 13,
                    text: "Luego hubo un choque en la Av. Túpac Amaru.".to_string(),
                },
            ],
            entities: vec![],
        }
    }

    #[test]
    fn test_entity_context_with_subject() {
        let doc = sample_doc();
        let context = attach_context(&doc, &ExtractedLocation::from_entity("Comas", 7)).unwrap();

        assert_eq!(context.sentence, "La policía capturó a dos sujetos en Comas.");
        assert_eq!(context.verb.as_deref(), Some("capturó"));
        assert_eq!(context.subject.as_deref(), Some("policía"));
        assert_eq!(context.actors(), "policía");
    }

    #[test]
    fn test_entity_context_without_verb() {
        // "hubo" is tagged AUX, so no governing verb is found
        let doc = sample_doc();
        let context = attach_context(&doc, &ExtractedLocation::from_entity("choque", 12)).unwrap();

        assert_eq!(context.sentence, "Luego hubo un choque en la Av. Túpac Amaru.");
        assert!(context.verb.is_none());
        assert!(context.subject.is_none());
    }

    #[test]
    fn test_verb_without_subject() {
        let mut doc = sample_doc();
        doc.tokens[1].dep = "obj".to_string();

        let context = attach_context(&doc, &ExtractedLocation::from_entity("Comas", 7)).unwrap();
        assert_eq!(context.verb.as_deref(), Some("capturó"));
        assert!(context.subject.is_none());
        assert_eq!(context.actors(), "");
    }

    #[test]
    fn test_first_subject_wins() {
        let mut doc = sample_doc();
        doc.tokens[5].dep = "nsubj".to_string();

        let context = attach_context(&doc, &ExtractedLocation::from_entity("Comas", 7)).unwrap();
        assert_eq!(context.subject.as_deref(), Some("policía"));
    }

    #[test]
    fn test_address_falls_back_to_sentence_search() {
        let doc = sample_doc();
        let context =
            attach_context(&doc, &ExtractedLocation::from_address("AV. TÚPAC AMARU")).unwrap();

        assert_eq!(context.sentence, "Luego hubo un choque en la Av. Túpac Amaru.");
        assert!(context.verb.is_none());
        assert!(context.subject.is_none());
    }

    #[test]
    fn test_entity_outside_sentences_falls_back() {
        let doc = sample_doc();
        let context = attach_context(&doc, &ExtractedLocation::from_entity("Comas", 40)).unwrap();

        assert_eq!(context.sentence, "La policía capturó a dos sujetos en Comas.");
        assert!(context.verb.is_none());
    }

    #[test]
    fn test_no_sentence_found() {
        let doc = sample_doc();
        assert!(attach_context(&doc, &ExtractedLocation::from_address("Jr. Ica")).is_none());
    }
}
