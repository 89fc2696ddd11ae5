//! Graduated-reward verification of untrusted trace submissions.
//!
//! The reward ladder is strict: parse failure < wrong expert < execution
//! failure < valid-but-wrong answer < correct. Each tier is worth strictly
//! more than the one below, so partial progress is always rewarded.

mod batch;
mod lint;
mod parse;
mod verifier;

pub use batch::BatchReport;
pub use lint::lint_formulas;
pub use parse::{ParseError, RawSubmission, parse_submission};
pub use verifier::{
    REWARD_CORRECT, REWARD_EXECUTION_FAILURE, REWARD_PARSE_FAILURE, REWARD_WRONG_ANSWER,
    REWARD_WRONG_EXPERT, TraceVerifier, answers_match,
};
