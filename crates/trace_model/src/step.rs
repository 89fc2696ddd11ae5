use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Operator codes accepted by `compute` and `compare` steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Sqrt,
    Abs,
    Min,
    Max,
}

impl fmt::Display for ComputeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComputeOp::Add => "add",
            ComputeOp::Sub => "sub",
            ComputeOp::Mul => "mul",
            ComputeOp::Div => "div",
            ComputeOp::Mod => "mod",
            ComputeOp::Pow => "pow",
            ComputeOp::Sqrt => "sqrt",
            ComputeOp::Abs => "abs",
            ComputeOp::Min => "min",
            ComputeOp::Max => "max",
        };
        write!(f, "{name}")
    }
}

/// A step argument: either a numeric literal or a reference to a prior
/// variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Number(f64),
    Var(String),
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Number(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Var(value.to_string())
    }
}

/// One typed instruction within a trace.
///
/// The serialized form is the externally tagged encoding: every step object
/// has exactly one key naming the operation, paired with its fields. Missing
/// required fields or unknown operation keys fail deserialization, so a
/// malformed step never reaches the interpreter.
///
/// The first six variants are the core vocabulary every interpreter handles;
/// the rest belong to domain experts and are routed through the extension
/// hook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Init {
        var: String,
        value: Value,
    },
    Given {
        values: BTreeMap<String, f64>,
    },
    Compute {
        op: ComputeOp,
        args: Vec<Operand>,
        #[serde(default)]
        var: Option<String>,
    },
    Formula {
        expression: String,
    },
    Query {
        var: String,
    },
    #[serde(rename = "state")]
    StateAssert {
        assertions: BTreeMap<String, f64>,
    },

    // Entity tracking
    Transfer {
        from: String,
        to: String,
        amount: Operand,
    },
    Consume {
        entity: String,
        amount: Operand,
    },
    AddEntity {
        entity: String,
        amount: Operand,
    },

    // Percentages
    PercentOff {
        base: Operand,
        rate: Operand,
        #[serde(default)]
        var: Option<String>,
    },
    PercentIncrease {
        base: Operand,
        rate: Operand,
        #[serde(default)]
        var: Option<String>,
    },
    PercentOf {
        base: Operand,
        rate: Operand,
        #[serde(default)]
        var: Option<String>,
    },

    // Comparisons
    Compare {
        op: ComputeOp,
        args: Vec<Operand>,
        #[serde(default)]
        var: Option<String>,
    },

    // Tree search
    InitSearch {
        env: String,
        #[serde(default)]
        params: BTreeMap<String, f64>,
    },
    Search {
        #[serde(default = "default_iterations")]
        iterations: u32,
        #[serde(default = "default_exploration")]
        exploration: f64,
        #[serde(default)]
        seed: Option<u64>,
        #[serde(default = "default_result_var")]
        var: String,
    },
    Apply {
        #[serde(default)]
        action: Option<Value>,
        #[serde(default)]
        action_var: Option<String>,
    },
    Evaluate {
        #[serde(default = "default_iterations")]
        iterations: u32,
        #[serde(default)]
        seed: Option<u64>,
        #[serde(default = "default_result_var")]
        var: String,
    },
}

fn default_iterations() -> u32 {
    1000
}

fn default_exploration() -> f64 {
    1.41
}

fn default_result_var() -> String {
    "result".to_string()
}

impl Step {
    /// Wire name of the operation, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Init { .. } => "init",
            Step::Given { .. } => "given",
            Step::Compute { .. } => "compute",
            Step::Formula { .. } => "formula",
            Step::Query { .. } => "query",
            Step::StateAssert { .. } => "state",
            Step::Transfer { .. } => "transfer",
            Step::Consume { .. } => "consume",
            Step::AddEntity { .. } => "add_entity",
            Step::PercentOff { .. } => "percent_off",
            Step::PercentIncrease { .. } => "percent_increase",
            Step::PercentOf { .. } => "percent_of",
            Step::Compare { .. } => "compare",
            Step::InitSearch { .. } => "init_search",
            Step::Search { .. } => "search",
            Step::Apply { .. } => "apply",
            Step::Evaluate { .. } => "evaluate",
        }
    }

    /// Whether the step belongs to the core vocabulary handled by every
    /// interpreter, as opposed to a domain extension.
    pub fn is_core(&self) -> bool {
        matches!(
            self,
            Step::Init { .. }
                | Step::Given { .. }
                | Step::Compute { .. }
                | Step::Formula { .. }
                | Step::Query { .. }
                | Step::StateAssert { .. }
        )
    }
}

/// An ordered step sequence with its target expert and originating query.
/// Immutable once parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub expert: String,
    #[serde(default)]
    pub query: Option<String>,
    pub trace: Vec<Step>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_serialize_as_single_key_objects() {
        let step = Step::Init {
            var: "x".to_string(),
            value: Value::Int(16),
        };
        let json = serde_json::to_value(&step).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("init"));
    }

    #[test]
    fn compute_step_round_trips() {
        let text = r#"{"compute": {"op": "mul", "args": ["x", 2], "var": "revenue"}}"#;
        let step: Step = serde_json::from_str(text).unwrap();
        assert_eq!(
            step,
            Step::Compute {
                op: ComputeOp::Mul,
                args: vec![Operand::from("x"), Operand::from(2.0)],
                var: Some("revenue".to_string()),
            }
        );
    }

    #[test]
    fn unknown_operation_key_is_rejected() {
        let err = serde_json::from_str::<Step>(r#"{"teleport": {"var": "x"}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = serde_json::from_str::<Step>(r#"{"compute": {"op": "add"}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn unknown_operator_code_is_rejected() {
        let err = serde_json::from_str::<Step>(r#"{"compute": {"op": "cube", "args": [2]}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn state_assert_uses_state_key() {
        let step: Step = serde_json::from_str(r#"{"state": {"assertions": {"x": 10}}}"#).unwrap();
        assert_eq!(step.kind(), "state");
        assert!(step.is_core());
    }

    #[test]
    fn search_step_fills_defaults() {
        let step: Step = serde_json::from_str(r#"{"search": {}}"#).unwrap();
        match step {
            Step::Search {
                iterations,
                exploration,
                seed,
                var,
            } => {
                assert_eq!(iterations, 1000);
                assert!((exploration - 1.41).abs() < 1e-12);
                assert_eq!(seed, None);
                assert_eq!(var, "result");
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }
}
