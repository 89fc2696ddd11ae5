use trace_model::{State, Step, Value};
use trace_solver::{Expert, SolveError, apply_compute, resolve};

/// Differences, ratios, and comparisons between quantities. The `compare`
/// step shares the compute mechanics; the separate tag keeps the trace
/// vocabulary honest about intent.
pub struct ComparisonExpert;

impl Expert for ComparisonExpert {
    fn name(&self) -> &str {
        "comparison"
    }

    fn description(&self) -> &str {
        "Computes differences, ratios, and comparisons between quantities"
    }

    fn extension_step(&self, step: &Step, state: &mut State) -> Result<(), SolveError> {
        match step {
            Step::Compare { op, args, var } => {
                let resolved = args
                    .iter()
                    .map(|arg| resolve(arg, state))
                    .collect::<Result<Vec<f64>, SolveError>>()?;
                let result = apply_compute(*op, &resolved)?;
                if let Some(var) = var {
                    state.insert(var.clone(), Value::Float(result));
                }
                Ok(())
            }
            other => Err(SolveError::UnknownStep(other.kind())),
        }
    }
}
