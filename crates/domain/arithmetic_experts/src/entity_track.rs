use trace_model::{DEFAULT_TOLERANCE, State, Step, Value};
use trace_solver::{Expert, SolveError, resolve};

/// Tracks entity quantities through transfers, consumption, and additions.
///
/// `transfer` and `add_entity` create missing entities at zero; `consume`
/// of an uninitialized entity is an error. Taking more than an entity holds
/// fails with an insufficient-quantity error.
pub struct EntityTrackExpert;

impl Expert for EntityTrackExpert {
    fn name(&self) -> &str {
        "entity_track"
    }

    fn description(&self) -> &str {
        "Tracks entity quantities through transfers and operations"
    }

    fn extension_step(&self, step: &Step, state: &mut State) -> Result<(), SolveError> {
        match step {
            Step::Transfer { from, to, amount } => {
                let amount = resolve(amount, state)?;
                let from_value = numeric_entity(state, from)?.unwrap_or(0.0);
                let to_value = numeric_entity(state, to)?.unwrap_or(0.0);

                if from_value < amount - DEFAULT_TOLERANCE {
                    return Err(SolveError::Insufficient {
                        entity: from.clone(),
                        have: from_value,
                        need: amount,
                    });
                }

                state.insert(from.clone(), Value::Float(from_value - amount));
                state.insert(to.clone(), Value::Float(to_value + amount));
                Ok(())
            }
            Step::Consume { entity, amount } => {
                let amount = resolve(amount, state)?;
                let current = numeric_entity(state, entity)?
                    .ok_or_else(|| SolveError::EntityNotInitialized(entity.clone()))?;

                if current < amount - DEFAULT_TOLERANCE {
                    return Err(SolveError::Insufficient {
                        entity: entity.clone(),
                        have: current,
                        need: amount,
                    });
                }

                state.insert(entity.clone(), Value::Float(current - amount));
                Ok(())
            }
            Step::AddEntity { entity, amount } => {
                let amount = resolve(amount, state)?;
                let current = numeric_entity(state, entity)?.unwrap_or(0.0);
                state.insert(entity.clone(), Value::Float(current + amount));
                Ok(())
            }
            other => Err(SolveError::UnknownStep(other.kind())),
        }
    }
}

fn numeric_entity(state: &State, name: &str) -> Result<Option<f64>, SolveError> {
    match state.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| SolveError::NotNumeric(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_solver::run_trace;

    fn steps(text: &str) -> Vec<Step> {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn consume_then_compute_revenue() {
        let trace = steps(
            r#"[
                {"init": {"var": "x", "value": 16}},
                {"consume": {"entity": "x", "amount": 3}},
                {"consume": {"entity": "x", "amount": 4}},
                {"compute": {"op": "mul", "args": ["x", 2], "var": "revenue"}},
                {"query": {"var": "revenue"}}
            ]"#,
        );
        let result = run_trace(&EntityTrackExpert, &trace);
        assert!(result.success);
        assert_eq!(result.answer, Some(Value::Int(18)));
        assert_eq!(result.steps_executed, 5);
    }

    #[test]
    fn consume_of_uninitialized_entity_fails() {
        let trace = steps(r#"[{"consume": {"entity": "missing", "amount": 99}}]"#);
        let result = run_trace(&EntityTrackExpert, &trace);
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("step 0: entity missing not initialized")
        );
    }

    #[test]
    fn consume_more_than_held_fails() {
        let trace = steps(
            r#"[
                {"init": {"var": "eggs", "value": 3}},
                {"consume": {"entity": "eggs", "amount": 5}}
            ]"#,
        );
        let result = run_trace(&EntityTrackExpert, &trace);
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("step 1: insufficient eggs: have 3, need 5")
        );
    }

    #[test]
    fn transfer_moves_quantity_and_creates_recipient() {
        let trace = steps(
            r#"[
                {"init": {"var": "alice", "value": 16}},
                {"transfer": {"from": "alice", "to": "bob", "amount": 3}},
                {"query": {"var": "bob"}}
            ]"#,
        );
        let result = run_trace(&EntityTrackExpert, &trace);
        assert!(result.success);
        assert_eq!(result.answer, Some(Value::Int(3)));
        assert_eq!(result.state.get("alice"), Some(&Value::Float(13.0)));
    }

    #[test]
    fn transfer_from_empty_entity_fails() {
        let trace = steps(r#"[{"transfer": {"from": "nobody", "to": "bob", "amount": 1}}]"#);
        let result = run_trace(&EntityTrackExpert, &trace);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("insufficient nobody"));
    }

    #[test]
    fn add_entity_accumulates_from_zero() {
        let trace = steps(
            r#"[
                {"add_entity": {"entity": "basket", "amount": 2}},
                {"add_entity": {"entity": "basket", "amount": 5}},
                {"query": {"var": "basket"}}
            ]"#,
        );
        let result = run_trace(&EntityTrackExpert, &trace);
        assert_eq!(result.answer, Some(Value::Int(7)));
    }

    #[test]
    fn amount_may_reference_a_variable() {
        let trace = steps(
            r#"[
                {"init": {"var": "eggs", "value": 10}},
                {"init": {"var": "eaten", "value": 4}},
                {"consume": {"entity": "eggs", "amount": "eaten"}},
                {"query": {"var": "eggs"}}
            ]"#,
        );
        let result = run_trace(&EntityTrackExpert, &trace);
        assert_eq!(result.answer, Some(Value::Int(6)));
    }

    #[test]
    fn percentage_step_is_not_recognized_here() {
        let trace = steps(r#"[{"percent_of": {"base": 100, "rate": 10, "var": "part"}}]"#);
        let result = run_trace(&EntityTrackExpert, &trace);
        assert_eq!(
            result.error.as_deref(),
            Some("step 0: unknown step: percent_of")
        );
    }
}
