use trace_model::{State, Step};
use trace_solver::{Expert, SolveError};

/// Pure arithmetic chains. Uses only the core vocabulary, so every
/// extension step is rejected.
pub struct ArithmeticExpert;

impl Expert for ArithmeticExpert {
    fn name(&self) -> &str {
        "arithmetic"
    }

    fn description(&self) -> &str {
        "Computes arithmetic chains (cost totals, sums, products)"
    }

    fn extension_step(&self, step: &Step, _state: &mut State) -> Result<(), SolveError> {
        Err(SolveError::UnknownStep(step.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_model::Value;
    use trace_solver::run_trace;

    #[test]
    fn cost_total_chain() {
        let trace: Vec<Step> = serde_json::from_str(
            r#"[
                {"given": {"values": {"apples": 3, "apple_price": 2, "pears": 4, "pear_price": 1.5}}},
                {"compute": {"op": "mul", "args": ["apples", "apple_price"], "var": "apple_cost"}},
                {"compute": {"op": "mul", "args": ["pears", "pear_price"], "var": "pear_cost"}},
                {"compute": {"op": "add", "args": ["apple_cost", "pear_cost"], "var": "total"}},
                {"query": {"var": "total"}}
            ]"#,
        )
        .unwrap();
        let result = run_trace(&ArithmeticExpert, &trace);
        assert!(result.success);
        assert_eq!(result.answer, Some(Value::Int(12)));
    }
}
