use std::error::Error;
use std::fmt::{self, Display, Formatter};

use trace_model::ComputeOp;

/// First failure raised while executing a trace. Execution stops at the
/// failing step; the verifier maps every variant into the reward taxonomy.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveError {
    VarNotFound(String),
    NotNumeric(String),
    BadArity {
        op: ComputeOp,
        expected: &'static str,
        got: usize,
    },
    DivisionByZero,
    Math(String),
    AssertMismatch {
        var: String,
        expected: f64,
        actual: f64,
    },
    EntityNotInitialized(String),
    Insufficient {
        entity: String,
        have: f64,
        need: f64,
    },
    UnknownStep(&'static str),
    Domain(String),
}

impl Display for SolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::VarNotFound(name) => write!(f, "variable not found: {name}"),
            Self::NotNumeric(name) => write!(f, "variable {name} is not numeric"),
            Self::BadArity { op, expected, got } => {
                write!(f, "compute op {op} expects {expected}, got {got}")
            }
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::Math(msg) => write!(f, "{msg}"),
            Self::AssertMismatch {
                var,
                expected,
                actual,
            } => write!(
                f,
                "state assert failed for {var}: expected {expected}, actual {actual}"
            ),
            Self::EntityNotInitialized(entity) => write!(f, "entity {entity} not initialized"),
            Self::Insufficient { entity, have, need } => {
                write!(f, "insufficient {entity}: have {have}, need {need}")
            }
            Self::UnknownStep(kind) => write!(f, "unknown step: {kind}"),
            Self::Domain(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for SolveError {}
