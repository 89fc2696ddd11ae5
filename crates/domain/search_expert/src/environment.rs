use std::collections::BTreeMap;

use trace_model::Value;
use trace_solver::SolveError;

/// A deterministic, fully observable decision process the search expert can
/// plan over. States and actions are plain [`Value`]s so they can live in the
/// interpreter's variable store and survive serialization.
pub trait Environment: Send + Sync {
    /// Builds the starting state from the numeric parameters of an
    /// `init_search` step.
    fn initial(&self, params: &BTreeMap<String, f64>) -> Result<Value, SolveError>;

    /// Legal actions from `state`. Empty means the state is a dead end even
    /// if [`Environment::is_done`] is false.
    fn actions(&self, state: &Value) -> Vec<Value>;

    /// Successor state after taking `action` in `state`. Only called with an
    /// action returned by [`Environment::actions`].
    fn step(&self, state: &Value, action: &Value) -> Value;

    fn is_done(&self, state: &Value) -> bool;

    /// Terminal payoff of `state`, used as the rollout return.
    fn reward(&self, state: &Value) -> f64;
}
