use std::collections::BTreeMap;

use trace_model::{State, Step, Value};
use trace_solver::{Expert, SolveError};

use crate::environment::Environment;
use crate::mcts::{SearchConfig, SearchOutcome, search};

/// Variable holding the active environment name.
pub const ENV_VAR: &str = "_env";
/// Variable holding the current environment state.
pub const STATE_VAR: &str = "_state";
/// Variable holding statistics from the last search.
pub const STATS_VAR: &str = "_search_stats";

/// Plans over registered environments with Monte Carlo tree search. The
/// working state lives in the interpreter store under underscore-prefixed
/// variables, so a trace can interleave search steps with the core
/// vocabulary.
pub struct SearchExpert {
    environments: BTreeMap<String, Box<dyn Environment>>,
}

impl SearchExpert {
    pub fn new() -> Self {
        SearchExpert {
            environments: BTreeMap::new(),
        }
    }

    /// Registers an environment under `name`, replacing any previous one.
    pub fn register_environment(&mut self, name: &str, env: Box<dyn Environment>) {
        self.environments.insert(name.to_string(), env);
    }

    pub fn with_environment(mut self, name: &str, env: Box<dyn Environment>) -> Self {
        self.register_environment(name, env);
        self
    }

    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }

    fn active_environment(&self, state: &State) -> Result<&dyn Environment, SolveError> {
        let name = match state.get(ENV_VAR) {
            Some(Value::Text(name)) => name,
            _ => {
                return Err(SolveError::Domain(
                    "no environment initialized; run init_search first".to_string(),
                ));
            }
        };
        self.environments
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| SolveError::Domain(format!("unknown environment: {name}")))
    }

    fn env_state(state: &State) -> Result<Value, SolveError> {
        state.get(STATE_VAR).cloned().ok_or_else(|| {
            SolveError::Domain("no environment state; run init_search first".to_string())
        })
    }

    fn init_search(
        &self,
        env_name: &str,
        params: &BTreeMap<String, f64>,
        state: &mut State,
    ) -> Result<(), SolveError> {
        let env = self
            .environments
            .get(env_name)
            .ok_or_else(|| SolveError::Domain(format!("unknown environment: {env_name}")))?;
        let initial = env.initial(params)?;
        state.insert(ENV_VAR.to_string(), Value::Text(env_name.to_string()));
        state.insert(STATE_VAR.to_string(), initial);
        Ok(())
    }

    fn run_search(
        &self,
        config: &SearchConfig,
        var: &str,
        state: &mut State,
    ) -> Result<(), SolveError> {
        let env = self.active_environment(state)?;
        let env_state = Self::env_state(state)?;
        let outcome = search(env, &env_state, config);
        state.insert(STATS_VAR.to_string(), stats_value(&outcome));
        if let Some(action) = outcome.best_action {
            state.insert(var.to_string(), action);
        }
        Ok(())
    }

    fn apply(
        &self,
        action: Option<&Value>,
        action_var: Option<&str>,
        state: &mut State,
    ) -> Result<(), SolveError> {
        let env = self.active_environment(state)?;
        let env_state = Self::env_state(state)?;
        if env.is_done(&env_state) {
            return Ok(());
        }

        let action = match (action, action_var) {
            (Some(action), _) => action.clone(),
            (None, Some(var)) => state
                .get(var)
                .cloned()
                .ok_or_else(|| SolveError::VarNotFound(var.to_string()))?,
            (None, None) => {
                return Err(SolveError::Domain(
                    "apply needs an action or an action_var".to_string(),
                ));
            }
        };

        if !env.actions(&env_state).contains(&action) {
            return Err(SolveError::Domain(format!("illegal action: {action}")));
        }
        let next = env.step(&env_state, &action);
        state.insert(STATE_VAR.to_string(), next);
        Ok(())
    }

    fn evaluate(
        &self,
        iterations: u32,
        seed: Option<u64>,
        var: &str,
        state: &mut State,
    ) -> Result<(), SolveError> {
        let env = self.active_environment(state)?;
        let env_state = Self::env_state(state)?;
        let value = if env.is_done(&env_state) {
            env.reward(&env_state)
        } else {
            let config = SearchConfig {
                iterations,
                seed,
                ..SearchConfig::default()
            };
            search(env, &env_state, &config).mean_return
        };
        state.insert(var.to_string(), Value::Float(value));
        Ok(())
    }
}

impl Default for SearchExpert {
    fn default() -> Self {
        Self::new()
    }
}

impl Expert for SearchExpert {
    fn name(&self) -> &str {
        "mcts"
    }

    fn description(&self) -> &str {
        "Plans over registered environments with Monte Carlo tree search"
    }

    fn extension_step(&self, step: &Step, state: &mut State) -> Result<(), SolveError> {
        match step {
            Step::InitSearch { env, params } => self.init_search(env, params, state),
            Step::Search {
                iterations,
                exploration,
                seed,
                var,
            } => {
                let config = SearchConfig {
                    iterations: *iterations,
                    exploration: *exploration,
                    seed: *seed,
                };
                self.run_search(&config, var, state)
            }
            Step::Apply { action, action_var } => {
                self.apply(action.as_ref(), action_var.as_deref(), state)
            }
            Step::Evaluate {
                iterations,
                seed,
                var,
            } => self.evaluate(*iterations, *seed, var, state),
            other => Err(SolveError::UnknownStep(other.kind())),
        }
    }
}

fn stats_value(outcome: &SearchOutcome) -> Value {
    let actions: Vec<Value> = outcome
        .action_stats
        .iter()
        .take(5)
        .map(|stat| {
            let mut entry = BTreeMap::new();
            entry.insert("action".to_string(), stat.action.clone());
            entry.insert("visits".to_string(), Value::Int(i64::from(stat.visits)));
            entry.insert("mean_return".to_string(), Value::Float(stat.mean_return));
            Value::Map(entry)
        })
        .collect();

    let mut stats = BTreeMap::new();
    stats.insert("visits".to_string(), Value::Int(i64::from(outcome.visits)));
    stats.insert("mean_return".to_string(), Value::Float(outcome.mean_return));
    stats.insert("actions".to_string(), Value::List(actions));
    Value::Map(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::CountdownEnv;
    use trace_solver::run_trace;

    fn expert() -> SearchExpert {
        SearchExpert::new().with_environment("countdown", Box::new(CountdownEnv::default()))
    }

    fn steps(text: &str) -> Vec<Step> {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn search_apply_evaluate_round() {
        let trace = steps(
            r#"[
                {"init_search": {"env": "countdown", "params": {"start": 2}}},
                {"search": {"iterations": 300, "seed": 7, "var": "move"}},
                {"apply": {"action_var": "move"}},
                {"evaluate": {"var": "outcome"}},
                {"query": {"var": "outcome"}}
            ]"#,
        );
        let result = run_trace(&expert(), &trace);
        assert!(result.success, "trace failed: {:?}", result.error);
        // Taking 2 from 2 lands on zero, so the terminal payoff is 1.
        assert_eq!(result.answer, Some(Value::Int(1)));
        assert_eq!(result.state.get("move"), Some(&Value::Int(2)));
        assert_eq!(result.state.get(STATE_VAR), Some(&Value::Int(0)));
        assert!(matches!(result.state.get(STATS_VAR), Some(Value::Map(_))));
    }

    #[test]
    fn unknown_environment_fails_init() {
        let trace = steps(r#"[{"init_search": {"env": "chess"}}]"#);
        let result = run_trace(&expert(), &trace);
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("step 0: unknown environment: chess")
        );
    }

    #[test]
    fn search_before_init_fails() {
        let trace = steps(r#"[{"search": {"seed": 1}}]"#);
        let result = run_trace(&expert(), &trace);
        assert_eq!(
            result.error.as_deref(),
            Some("step 0: no environment initialized; run init_search first")
        );
    }

    #[test]
    fn illegal_action_is_rejected() {
        let trace = steps(
            r#"[
                {"init_search": {"env": "countdown", "params": {"start": 4}}},
                {"apply": {"action": 5}}
            ]"#,
        );
        let result = run_trace(&expert(), &trace);
        assert_eq!(result.error.as_deref(), Some("step 1: illegal action: 5"));
    }

    #[test]
    fn apply_on_terminal_state_is_a_no_op() {
        let trace = steps(
            r#"[
                {"init_search": {"env": "countdown", "params": {"start": 0}}},
                {"apply": {"action": 1}},
                {"evaluate": {"var": "payoff"}},
                {"query": {"var": "payoff"}}
            ]"#,
        );
        let result = run_trace(&expert(), &trace);
        assert!(result.success);
        assert_eq!(result.answer, Some(Value::Int(1)));
    }

    #[test]
    fn apply_without_action_is_an_error() {
        let trace = steps(
            r#"[
                {"init_search": {"env": "countdown", "params": {"start": 3}}},
                {"apply": {}}
            ]"#,
        );
        let result = run_trace(&expert(), &trace);
        assert_eq!(
            result.error.as_deref(),
            Some("step 1: apply needs an action or an action_var")
        );
    }

    #[test]
    fn arithmetic_steps_are_not_recognized_here() {
        let trace = steps(r#"[{"consume": {"entity": "x", "amount": 1}}]"#);
        let result = run_trace(&expert(), &trace);
        assert_eq!(result.error.as_deref(), Some("step 0: unknown step: consume"));
    }
}
