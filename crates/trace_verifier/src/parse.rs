use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde_json::Value as Json;

/// Why a submission never reached execution. Anything here scores the
/// parse-failure reward.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseError {
    Json(String),
    NotAnObject,
    TraceMissing,
    TraceNotArray,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "invalid JSON: {msg}"),
            Self::NotAnObject => write!(f, "submission must be a JSON object"),
            Self::TraceMissing => write!(f, "submission has no trace field"),
            Self::TraceNotArray => write!(f, "trace field must be an array"),
        }
    }
}

impl Error for ParseError {}

/// A submission after the outer envelope check. Steps stay raw so a single
/// malformed step is an execution failure, not a parse failure.
#[derive(Clone, Debug)]
pub struct RawSubmission {
    pub expert: String,
    pub query: Option<String>,
    pub steps: Vec<Json>,
}

/// Parse the outer envelope of an untrusted submission: well-formed JSON,
/// an object, with a `trace` array. A missing expert name defaults to
/// "unknown" so it can still fail the expert check downstream.
pub fn parse_submission(text: &str) -> Result<RawSubmission, ParseError> {
    let value: Json = serde_json::from_str(text).map_err(|e| ParseError::Json(e.to_string()))?;
    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    let expert = object
        .get("expert")
        .and_then(Json::as_str)
        .unwrap_or("unknown")
        .to_string();
    let query = object
        .get("query")
        .and_then(Json::as_str)
        .map(str::to_string);
    let steps = match object.get("trace") {
        None => return Err(ParseError::TraceMissing),
        Some(Json::Array(steps)) => steps.clone(),
        Some(_) => return Err(ParseError::TraceNotArray),
    };

    Ok(RawSubmission {
        expert,
        query,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_fields_are_extracted() {
        let raw = parse_submission(
            r#"{"expert": "arithmetic", "query": "2+2?", "trace": [{"query": {"var": "x"}}]}"#,
        )
        .unwrap();
        assert_eq!(raw.expert, "arithmetic");
        assert_eq!(raw.query.as_deref(), Some("2+2?"));
        assert_eq!(raw.steps.len(), 1);
    }

    #[test]
    fn missing_expert_defaults_to_unknown() {
        let raw = parse_submission(r#"{"trace": []}"#).unwrap();
        assert_eq!(raw.expert, "unknown");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            parse_submission("{not json").unwrap_err(),
            ParseError::Json(_)
        ));
    }

    #[test]
    fn non_object_submission_is_rejected() {
        assert_eq!(
            parse_submission(r#"[1, 2]"#).unwrap_err(),
            ParseError::NotAnObject
        );
    }

    #[test]
    fn trace_must_be_present_and_an_array() {
        assert_eq!(
            parse_submission(r#"{"expert": "arithmetic"}"#).unwrap_err(),
            ParseError::TraceMissing
        );
        assert_eq!(
            parse_submission(r#"{"trace": "steps"}"#).unwrap_err(),
            ParseError::TraceNotArray
        );
    }
}
