use serde::{Deserialize, Serialize};

use trace_model::{Trace, TraceExample};

use crate::verifier::{REWARD_PARSE_FAILURE, TraceVerifier};

/// Aggregate counters over a batch of verified examples.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub parsed: usize,
    pub valid: usize,
    pub correct: usize,
}

impl BatchReport {
    /// Fraction of examples that executed cleanly.
    pub fn valid_rate(&self) -> f64 {
        ratio(self.valid, self.total)
    }

    /// Fraction of examples that produced the expected answer.
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

impl TraceVerifier<'_> {
    /// Verify one example by routing it through the same submission pipeline
    /// as untrusted text.
    pub fn verify_example(&self, example: &TraceExample) -> trace_model::VerificationResult {
        let submission = Trace {
            expert: example.expert.clone(),
            query: Some(example.query.clone()),
            trace: example.trace.clone(),
        };
        match serde_json::to_string(&submission) {
            Ok(text) => self.verify(&text, Some(&example.expert), example.answer.as_ref()),
            Err(err) => trace_model::VerificationResult {
                trace_error: Some(format!("invalid JSON: {err}")),
                reward: REWARD_PARSE_FAILURE,
                ..trace_model::VerificationResult::default()
            },
        }
    }

    /// Verify every example and tally the batch counters.
    pub fn verify_batch(&self, examples: &[TraceExample]) -> BatchReport {
        let mut report = BatchReport {
            total: examples.len(),
            ..BatchReport::default()
        };
        for example in examples {
            let result = self.verify_example(example);
            if result.parsed {
                report.parsed += 1;
            }
            if result.trace_valid {
                report.valid += 1;
            }
            if result.answer_correct {
                report.correct += 1;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_handle_an_empty_batch() {
        let report = BatchReport::default();
        assert_eq!(report.valid_rate(), 0.0);
        assert_eq!(report.accuracy(), 0.0);
    }

    #[test]
    fn rates_divide_by_total() {
        let report = BatchReport {
            total: 4,
            parsed: 4,
            valid: 3,
            correct: 2,
        };
        assert!((report.valid_rate() - 0.75).abs() < 1e-12);
        assert!((report.accuracy() - 0.5).abs() < 1e-12);
    }
}
