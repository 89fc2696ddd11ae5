use serde::{Deserialize, Serialize};

use crate::value::{State, Value};

/// Outcome of executing one trace against a fresh state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    pub success: bool,
    pub answer: Option<Value>,
    pub state: State,
    pub error: Option<String>,
    pub expert: String,
    pub steps_executed: usize,
}

impl TraceResult {
    pub fn failure(expert: &str, error: String, state: State, steps_executed: usize) -> Self {
        Self {
            success: false,
            answer: None,
            state,
            error: Some(error),
            expert: expert.to_string(),
            steps_executed,
        }
    }
}

/// Outcome of verifying an untrusted submission, including the graduated
/// reward used as a training signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub parsed: bool,
    pub expert: Option<String>,
    pub trace_valid: bool,
    pub trace_error: Option<String>,
    pub computed_answer: Option<Value>,
    pub expected_answer: Option<Value>,
    pub answer_correct: bool,
    pub final_state: State,
    pub reward: f64,
}

impl Default for VerificationResult {
    fn default() -> Self {
        Self {
            parsed: false,
            expert: None,
            trace_valid: false,
            trace_error: None,
            computed_answer: None,
            expected_answer: None,
            answer_correct: false,
            final_state: State::new(),
            reward: 0.0,
        }
    }
}
