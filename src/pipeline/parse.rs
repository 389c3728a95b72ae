//! Interpretation of the model's free-text answer.
//!
//! Models are asked for a bare JSON object but regularly wrap it in
//! markdown fences or a sentence of commentary. The rule is deliberately
//! simple: take everything from the first `{` to the last `}` and parse
//! that. Anything that does not yield a non-empty object means "not an
//! ACORD 25", never an error.

use crate::output::{Certificate, ExtractionOutcome, NotRecognizedReason};
use crate::prompts::NOT_RECOGNIZED_LITERAL;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

// Greedy on purpose: nested objects must stay inside the match.
static RE_JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Turn raw model output into an [`ExtractionOutcome`].
pub fn interpret_response(text: &str) -> ExtractionOutcome {
    let Some(span) = RE_JSON_OBJECT.find(text) else {
        let reason = if is_null_literal(text) {
            NotRecognizedReason::ExplicitNull
        } else {
            NotRecognizedReason::NoJsonObject
        };
        debug!("Model answer not recognised: {}", reason);
        return ExtractionOutcome::NotRecognized(reason);
    };

    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(map)) if map.is_empty() => {
            ExtractionOutcome::NotRecognized(NotRecognizedReason::Empty)
        }
        Ok(Value::Object(map)) => ExtractionOutcome::Recognized(Certificate::from_object(map)),
        Ok(other) => {
            warn!("Model answer parsed to a non-object: {}", other);
            ExtractionOutcome::NotRecognized(NotRecognizedReason::Malformed)
        }
        Err(e) => {
            warn!(
                "Failed to parse model JSON ({} bytes): {}",
                span.as_str().len(),
                e
            );
            ExtractionOutcome::NotRecognized(NotRecognizedReason::Malformed)
        }
    }
}

fn is_null_literal(text: &str) -> bool {
    text.trim()
        .trim_matches('`')
        .trim()
        .eq_ignore_ascii_case(NOT_RECOGNIZED_LITERAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reason(text: &str) -> NotRecognizedReason {
        match interpret_response(text) {
            ExtractionOutcome::NotRecognized(r) => r,
            ExtractionOutcome::Recognized(c) => panic!("unexpectedly recognised: {:?}", c.raw()),
        }
    }

    #[test]
    fn null_literal_variants() {
        assert_eq!(reason("null"), NotRecognizedReason::ExplicitNull);
        assert_eq!(reason("  `null`\n"), NotRecognizedReason::ExplicitNull);
        assert_eq!(reason("NULL"), NotRecognizedReason::ExplicitNull);
    }

    #[test]
    fn prose_without_object() {
        assert_eq!(
            reason("This looks like a W-9, not a certificate."),
            NotRecognizedReason::NoJsonObject
        );
        assert_eq!(reason(""), NotRecognizedReason::NoJsonObject);
    }

    #[test]
    fn malformed_and_empty() {
        assert_eq!(reason("{ \"insurers\": [ }"), NotRecognizedReason::Malformed);
        assert_eq!(reason("{}"), NotRecognizedReason::Empty);
        assert_eq!(reason("```json\n{ }\n```"), NotRecognizedReason::Empty);
    }

    #[test]
    fn fenced_object_is_recognised() {
        let text = "Here you go:\n```json\n{\"certificate_information\": {\"certificate_holder\": \"City of Springfield\"}}\n```";
        let outcome = interpret_response(text);
        let cert = outcome.certificate().expect("recognised");
        assert_eq!(
            cert.raw().get("certificate_information"),
            Some(&json!({ "certificate_holder": "City of Springfield" }))
        );
    }

    #[test]
    fn greedy_span_keeps_nested_objects() {
        let text = r#"{"a": {"b": {"c": 1}}, "d": [ {"e": 2} ]} trailing"#;
        let cert = interpret_response(text);
        let raw = cert.certificate().unwrap().raw();
        assert_eq!(raw.get("d"), Some(&json!([{ "e": 2 }])));
    }

    #[test]
    fn two_objects_are_malformed() {
        // First `{` to last `}` spans both objects, which is not valid JSON.
        assert_eq!(reason(r#"{"a": 1} and {"b": 2}"#), NotRecognizedReason::Malformed);
    }

    #[test]
    fn array_of_objects_is_malformed() {
        assert_eq!(reason(r#"[{"a": 1}, {"b": 2}]"#), NotRecognizedReason::Malformed);
    }
}
