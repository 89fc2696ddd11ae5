use trace_model::{State, Step, Value};
use trace_solver::{Expert, SolveError, resolve};

/// Percentage discounts, increases, and proportions. Rates are given in
/// percent, not fractions.
pub struct PercentageExpert;

impl Expert for PercentageExpert {
    fn name(&self) -> &str {
        "percentage"
    }

    fn description(&self) -> &str {
        "Computes percentage discounts, increases, and proportions"
    }

    fn extension_step(&self, step: &Step, state: &mut State) -> Result<(), SolveError> {
        let (base, rate, var, scale) = match step {
            Step::PercentOff { base, rate, var } => (base, rate, var, Scale::Off),
            Step::PercentIncrease { base, rate, var } => (base, rate, var, Scale::Increase),
            Step::PercentOf { base, rate, var } => (base, rate, var, Scale::Of),
            other => return Err(SolveError::UnknownStep(other.kind())),
        };

        let base = resolve(base, state)?;
        let rate = resolve(rate, state)?;
        let result = match scale {
            Scale::Off => base * (1.0 - rate / 100.0),
            Scale::Increase => base * (1.0 + rate / 100.0),
            Scale::Of => base * rate / 100.0,
        };

        if let Some(var) = var {
            state.insert(var.clone(), Value::Float(result));
        }
        Ok(())
    }
}

enum Scale {
    Off,
    Increase,
    Of,
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_solver::run_trace;

    fn steps(text: &str) -> Vec<Step> {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn percent_off_discounts_the_base() {
        let trace = steps(
            r#"[
                {"init": {"var": "price", "value": 80}},
                {"percent_off": {"base": "price", "rate": 25, "var": "sale"}},
                {"query": {"var": "sale"}}
            ]"#,
        );
        let result = run_trace(&PercentageExpert, &trace);
        assert_eq!(result.answer, Some(Value::Int(60)));
    }

    #[test]
    fn percent_increase_grows_the_base() {
        let trace = steps(
            r#"[
                {"percent_increase": {"base": 200, "rate": 10, "var": "raised"}},
                {"query": {"var": "raised"}}
            ]"#,
        );
        let result = run_trace(&PercentageExpert, &trace);
        assert_eq!(result.answer, Some(Value::Int(220)));
    }

    #[test]
    fn percent_of_takes_a_proportion() {
        let trace = steps(
            r#"[
                {"percent_of": {"base": 60, "rate": 15, "var": "part"}},
                {"query": {"var": "part"}}
            ]"#,
        );
        let result = run_trace(&PercentageExpert, &trace);
        assert_eq!(result.answer, Some(Value::Int(9)));
    }

    #[test]
    fn entity_step_is_not_recognized_here() {
        let trace = steps(r#"[{"consume": {"entity": "x", "amount": 1}}]"#);
        let result = run_trace(&PercentageExpert, &trace);
        assert_eq!(result.error.as_deref(), Some("step 0: unknown step: consume"));
    }
}
