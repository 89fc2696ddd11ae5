use trace_model::{ComputeOp, DEFAULT_TOLERANCE, Operand, State, Step, TraceResult, Value};

use crate::error::SolveError;

/// A named bundle of domain step semantics layered on the shared
/// interpreter. Core steps are handled by `run_trace`; everything else is
/// routed through `extension_step`.
///
/// Implementations must reject steps they do not recognize with
/// `SolveError::UnknownStep`, never silently skip them.
pub trait Expert: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn extension_step(&self, step: &Step, state: &mut State) -> Result<(), SolveError>;
}

/// Execute an ordered step sequence against a fresh state.
///
/// Single-threaded and strictly in submission order; the first failure stops
/// execution and is reported with its step index. The pending query variable
/// resolves after the last step, with near-integer floats reported as
/// machine integers.
pub fn run_trace(expert: &dyn Expert, steps: &[Step]) -> TraceResult {
    let mut state = State::new();
    let mut query_var: Option<String> = None;
    let mut executed = 0usize;

    for (i, step) in steps.iter().enumerate() {
        let outcome = match step {
            Step::Init { var, value } => {
                state.insert(var.clone(), value.clone());
                Ok(())
            }
            Step::Given { values } => {
                for (name, value) in values {
                    state.insert(name.clone(), Value::Float(*value));
                }
                Ok(())
            }
            Step::Compute { op, args, var } => compute_into(*op, args, var.as_deref(), &mut state),
            Step::Formula { .. } => Ok(()),
            Step::Query { var } => {
                query_var = Some(var.clone());
                Ok(())
            }
            Step::StateAssert { assertions } => check_assertions(assertions, &state),
            extension => expert.extension_step(extension, &mut state),
        };

        if let Err(err) = outcome {
            return TraceResult::failure(expert.name(), format!("step {i}: {err}"), state, executed);
        }
        executed += 1;
    }

    let answer = query_var
        .and_then(|var| state.get(&var).cloned())
        .map(|value| value.rounded_to_int(DEFAULT_TOLERANCE));

    TraceResult {
        success: true,
        answer,
        state,
        error: None,
        expert: expert.name().to_string(),
        steps_executed: executed,
    }
}

/// Resolve a step argument: a literal is itself, a name looks up the state.
/// Numeric text falls back to a literal so traces may quote numbers.
pub fn resolve(operand: &Operand, state: &State) -> Result<f64, SolveError> {
    match operand {
        Operand::Number(n) => Ok(*n),
        Operand::Var(name) => match state.get(name) {
            Some(value) => value
                .as_f64()
                .ok_or_else(|| SolveError::NotNumeric(name.clone())),
            None => name
                .parse::<f64>()
                .map_err(|_| SolveError::VarNotFound(name.clone())),
        },
    }
}

/// Apply a named operator to resolved arguments.
pub fn apply_compute(op: ComputeOp, args: &[f64]) -> Result<f64, SolveError> {
    let arity = |expected: &'static str, ok: bool| {
        if ok {
            Ok(())
        } else {
            Err(SolveError::BadArity {
                op,
                expected,
                got: args.len(),
            })
        }
    };

    match op {
        ComputeOp::Add => {
            arity("at least 1 argument", !args.is_empty())?;
            Ok(args.iter().sum())
        }
        ComputeOp::Sub => {
            arity("at least 2 arguments", args.len() >= 2)?;
            Ok(args[0] - args[1..].iter().sum::<f64>())
        }
        ComputeOp::Mul => {
            arity("at least 1 argument", !args.is_empty())?;
            Ok(args.iter().product())
        }
        ComputeOp::Div => {
            arity("exactly 2 arguments", args.len() == 2)?;
            if args[1] == 0.0 {
                return Err(SolveError::DivisionByZero);
            }
            Ok(args[0] / args[1])
        }
        ComputeOp::Mod => {
            arity("exactly 2 arguments", args.len() == 2)?;
            if args[1] == 0.0 {
                return Err(SolveError::DivisionByZero);
            }
            let (a, b) = (args[0], args[1]);
            Ok(a - b * (a / b).floor())
        }
        ComputeOp::Pow => {
            arity("exactly 2 arguments", args.len() == 2)?;
            Ok(args[0].powf(args[1]))
        }
        ComputeOp::Sqrt => {
            arity("exactly 1 argument", args.len() == 1)?;
            if args[0] < 0.0 {
                return Err(SolveError::Math(format!(
                    "square root of negative number {}",
                    args[0]
                )));
            }
            Ok(args[0].sqrt())
        }
        ComputeOp::Abs => {
            arity("exactly 1 argument", args.len() == 1)?;
            Ok(args[0].abs())
        }
        ComputeOp::Min => {
            arity("at least 1 argument", !args.is_empty())?;
            Ok(args.iter().copied().fold(f64::INFINITY, f64::min))
        }
        ComputeOp::Max => {
            arity("at least 1 argument", !args.is_empty())?;
            Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        }
    }
}

fn compute_into(
    op: ComputeOp,
    args: &[Operand],
    var: Option<&str>,
    state: &mut State,
) -> Result<(), SolveError> {
    let resolved = args
        .iter()
        .map(|arg| resolve(arg, state))
        .collect::<Result<Vec<f64>, SolveError>>()?;
    let result = apply_compute(op, &resolved)?;
    if let Some(var) = var {
        state.insert(var.to_string(), Value::Float(result));
    }
    Ok(())
}

fn check_assertions(
    assertions: &std::collections::BTreeMap<String, f64>,
    state: &State,
) -> Result<(), SolveError> {
    for (var, expected) in assertions {
        let actual = match state.get(var) {
            Some(value) => value
                .as_f64()
                .ok_or_else(|| SolveError::NotNumeric(var.clone()))?,
            None => 0.0,
        };
        if (actual - expected).abs() > DEFAULT_TOLERANCE {
            return Err(SolveError::AssertMismatch {
                var: var.clone(),
                expected: *expected,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_model::Step;

    struct CoreOnly;

    impl Expert for CoreOnly {
        fn name(&self) -> &str {
            "core_only"
        }

        fn extension_step(&self, step: &Step, _state: &mut State) -> Result<(), SolveError> {
            Err(SolveError::UnknownStep(step.kind()))
        }
    }

    fn steps(text: &str) -> Vec<Step> {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn init_then_query_returns_the_value_exactly() {
        let trace = steps(r#"[{"init": {"var": "x", "value": 42}}, {"query": {"var": "x"}}]"#);
        let result = run_trace(&CoreOnly, &trace);
        assert!(result.success);
        assert_eq!(result.answer, Some(Value::Int(42)));
        assert_eq!(result.steps_executed, 2);
    }

    #[test]
    fn compute_chain_with_variables() {
        let trace = steps(
            r#"[
                {"given": {"values": {"a": 10, "b": 5}}},
                {"compute": {"op": "mul", "args": ["b", 2], "var": "double"}},
                {"compute": {"op": "add", "args": ["a", "double"], "var": "total"}},
                {"query": {"var": "total"}}
            ]"#,
        );
        let result = run_trace(&CoreOnly, &trace);
        assert!(result.success);
        assert_eq!(result.answer, Some(Value::Int(20)));
    }

    #[test]
    fn missing_variable_stops_execution() {
        let trace = steps(
            r#"[
                {"init": {"var": "x", "value": 1}},
                {"compute": {"op": "add", "args": ["x", "ghost"], "var": "y"}},
                {"query": {"var": "y"}}
            ]"#,
        );
        let result = run_trace(&CoreOnly, &trace);
        assert!(!result.success);
        assert_eq!(result.steps_executed, 1);
        assert_eq!(
            result.error.as_deref(),
            Some("step 1: variable not found: ghost")
        );
        assert_eq!(result.answer, None);
    }

    #[test]
    fn division_by_zero_in_compute_is_an_error() {
        for op in ["div", "mod"] {
            let trace = steps(&format!(
                r#"[{{"compute": {{"op": "{op}", "args": [1, 0], "var": "y"}}}}]"#
            ));
            let result = run_trace(&CoreOnly, &trace);
            assert!(!result.success, "{op}");
            assert_eq!(result.error.as_deref(), Some("step 0: division by zero"));
        }
    }

    #[test]
    fn state_assert_mismatch_names_variable_and_values() {
        let trace = steps(
            r#"[
                {"init": {"var": "x", "value": 7}},
                {"state": {"assertions": {"x": 10}}}
            ]"#,
        );
        let result = run_trace(&CoreOnly, &trace);
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("step 1: state assert failed for x: expected 10, actual 7")
        );
        assert_eq!(result.steps_executed, 1);
    }

    #[test]
    fn last_query_wins() {
        let trace = steps(
            r#"[
                {"init": {"var": "a", "value": 1}},
                {"init": {"var": "b", "value": 2}},
                {"query": {"var": "a"}},
                {"query": {"var": "b"}}
            ]"#,
        );
        let result = run_trace(&CoreOnly, &trace);
        assert_eq!(result.answer, Some(Value::Int(2)));
    }

    #[test]
    fn formula_is_a_no_op() {
        let trace = steps(
            r#"[
                {"init": {"var": "x", "value": 3}},
                {"formula": {"expression": "distance = speed * time"}},
                {"query": {"var": "x"}}
            ]"#,
        );
        let result = run_trace(&CoreOnly, &trace);
        assert!(result.success);
        assert_eq!(result.state.len(), 1);
    }

    #[test]
    fn unrecognized_extension_step_is_rejected() {
        let trace = steps(r#"[{"consume": {"entity": "x", "amount": 1}}]"#);
        let result = run_trace(&CoreOnly, &trace);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("step 0: unknown step: consume"));
    }

    #[test]
    fn rerun_is_idempotent() {
        let trace = steps(
            r#"[
                {"init": {"var": "x", "value": 16}},
                {"compute": {"op": "mul", "args": ["x", 2], "var": "y"}},
                {"query": {"var": "y"}}
            ]"#,
        );
        let first = run_trace(&CoreOnly, &trace);
        let second = run_trace(&CoreOnly, &trace);
        assert_eq!(first, second);
    }

    #[test]
    fn arity_violations_are_reported() {
        let err = apply_compute(ComputeOp::Div, &[1.0]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "compute op div expects exactly 2 arguments, got 1"
        );
        assert!(apply_compute(ComputeOp::Sqrt, &[4.0, 9.0]).is_err());
        assert!(apply_compute(ComputeOp::Add, &[]).is_err());
    }

    #[test]
    fn numeric_text_operand_falls_back_to_literal() {
        let state = State::new();
        assert_eq!(resolve(&Operand::from("2.5"), &state).unwrap(), 2.5);
        assert_eq!(
            resolve(&Operand::from("ghost"), &state).unwrap_err(),
            SolveError::VarNotFound("ghost".to_string())
        );
    }
}
