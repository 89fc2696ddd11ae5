use std::collections::BTreeMap;

use trace_model::Value;
use trace_solver::SolveError;

use crate::environment::Environment;

/// Built-in subtraction game. Start at a positive count and remove between
/// 1 and `max_take` per move; landing exactly on zero pays 1.0, overshooting
/// pays nothing.
pub struct CountdownEnv {
    max_take: i64,
}

impl CountdownEnv {
    pub fn new(max_take: i64) -> Self {
        CountdownEnv {
            max_take: max_take.max(1),
        }
    }
}

impl Default for CountdownEnv {
    fn default() -> Self {
        CountdownEnv::new(2)
    }
}

impl Environment for CountdownEnv {
    fn initial(&self, params: &BTreeMap<String, f64>) -> Result<Value, SolveError> {
        let start = params
            .get("start")
            .copied()
            .ok_or_else(|| SolveError::Domain("countdown needs a start parameter".to_string()))?;
        Ok(Value::Int(start as i64))
    }

    fn actions(&self, state: &Value) -> Vec<Value> {
        match state {
            Value::Int(n) if *n > 0 => (1..=self.max_take).map(Value::Int).collect(),
            _ => Vec::new(),
        }
    }

    fn step(&self, state: &Value, action: &Value) -> Value {
        match (state, action) {
            (Value::Int(n), Value::Int(take)) => Value::Int(n - take),
            _ => state.clone(),
        }
    }

    fn is_done(&self, state: &Value) -> bool {
        matches!(state, Value::Int(n) if *n <= 0)
    }

    fn reward(&self, state: &Value) -> f64 {
        match state {
            Value::Int(0) => 1.0,
            _ => 0.0,
        }
    }
}
