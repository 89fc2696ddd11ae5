use trace_model::{DEFAULT_TOLERANCE, State, Step, TraceResult, Value, VerificationResult};
use trace_solver::{ExpertRegistry, run_trace};

use crate::parse::{ParseError, RawSubmission, parse_submission};

/// Submission never parsed as a trace.
pub const REWARD_PARSE_FAILURE: f64 = 0.0;
/// Trace named a different expert than the task demands.
pub const REWARD_WRONG_EXPERT: f64 = 0.3;
/// Trace reached the interpreter but failed during execution.
pub const REWARD_EXECUTION_FAILURE: f64 = 0.5;
/// Trace executed cleanly but the answer is wrong or unscored.
pub const REWARD_WRONG_ANSWER: f64 = 0.7;
/// Trace executed cleanly and the answer matches.
pub const REWARD_CORRECT: f64 = 1.0;

/// Scores untrusted trace submissions against a registry of experts. The
/// graduated reward separates "can't parse" from "parsed but crashed" from
/// "ran but wrong", so a trainer always knows which skill to improve.
pub struct TraceVerifier<'a> {
    registry: &'a ExpertRegistry,
    tolerance: f64,
}

impl<'a> TraceVerifier<'a> {
    pub fn new(registry: &'a ExpertRegistry) -> Self {
        TraceVerifier {
            registry,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify a raw submission, optionally pinning the expert it must use
    /// and the answer it must produce.
    pub fn verify(
        &self,
        text: &str,
        expected_expert: Option<&str>,
        expected_answer: Option<&Value>,
    ) -> VerificationResult {
        let raw = match parse_submission(text) {
            Ok(raw) => raw,
            Err(err) => {
                return VerificationResult {
                    trace_error: Some(err.to_string()),
                    expected_answer: expected_answer.cloned(),
                    reward: REWARD_PARSE_FAILURE,
                    ..VerificationResult::default()
                };
            }
        };

        let mut result = VerificationResult {
            parsed: true,
            expert: Some(raw.expert.clone()),
            expected_answer: expected_answer.cloned(),
            ..VerificationResult::default()
        };

        if let Some(expected) = expected_expert {
            if expected != raw.expert {
                result.trace_error = Some(format!(
                    "wrong expert: expected {expected}, got {}",
                    raw.expert
                ));
                result.reward = REWARD_WRONG_EXPERT;
                return result;
            }
        }

        let run = self.execute_raw(&raw);
        result.computed_answer = run.answer.clone();
        result.final_state = run.state;
        if !run.success {
            result.trace_error = run.error;
            result.reward = REWARD_EXECUTION_FAILURE;
            return result;
        }

        result.trace_valid = true;
        match expected_answer {
            Some(expected) => {
                let correct = run
                    .answer
                    .as_ref()
                    .is_some_and(|answer| answers_match(answer, expected, self.tolerance));
                result.answer_correct = correct;
                result.reward = if correct {
                    REWARD_CORRECT
                } else {
                    REWARD_WRONG_ANSWER
                };
            }
            // Nothing to grade against: valid execution earns the
            // valid-but-unconfirmed tier, never full credit.
            None => result.reward = REWARD_WRONG_ANSWER,
        }
        result
    }

    /// Run a submission without scoring it. Parse failures surface as
    /// errors; execution failures come back inside the result.
    pub fn execute(&self, text: &str) -> Result<TraceResult, ParseError> {
        let raw = parse_submission(text)?;
        Ok(self.execute_raw(&raw))
    }

    fn execute_raw(&self, raw: &RawSubmission) -> TraceResult {
        let Some(expert) = self.registry.get(&raw.expert) else {
            return TraceResult::failure(
                &raw.expert,
                format!("expert '{}' not found in registry", raw.expert),
                State::new(),
                0,
            );
        };

        let mut steps = Vec::with_capacity(raw.steps.len());
        for (i, value) in raw.steps.iter().enumerate() {
            match serde_json::from_value::<Step>(value.clone()) {
                Ok(step) => steps.push(step),
                Err(err) => {
                    return TraceResult::failure(
                        &raw.expert,
                        format!("step {i}: invalid step: {err}"),
                        State::new(),
                        0,
                    );
                }
            }
        }

        run_trace(expert, &steps)
    }
}

/// Numeric answers compare within `tolerance`; everything else falls back to
/// trimmed textual equality.
pub fn answers_match(computed: &Value, expected: &Value, tolerance: f64) -> bool {
    match (computed.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() <= tolerance,
        _ => computed.to_string().trim() == expected.to_string().trim(),
    }
}
