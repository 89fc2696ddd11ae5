use trace_model::{State, Step};
use trace_solver::{Expert, SolveError};

/// Rate and formula problems (speed, distance, time, work). The formula
/// annotation is handled by the interpreter core, so no extra vocabulary is
/// needed here.
pub struct RateEquationExpert;

impl Expert for RateEquationExpert {
    fn name(&self) -> &str {
        "rate_equation"
    }

    fn description(&self) -> &str {
        "Solves rate/formula problems (speed, distance, time, work)"
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
    fn distance_from_speed_and_time() {
        let trace: Vec<Step> = serde_json::from_str(
            r#"[
                {"given": {"values": {"speed": 60, "time": 2.5}}},
                {"formula": {"expression": "distance = speed * time"}},
                {"compute": {"op": "mul", "args": ["speed", "time"], "var": "distance"}},
                {"query": {"var": "distance"}}
            ]"#,
        )
        .unwrap();
        let result = run_trace(&RateEquationExpert, &trace);
        assert!(result.success);
        assert_eq!(result.answer, Some(Value::Int(150)));
    }
}
