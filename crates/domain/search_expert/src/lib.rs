//! Tree-search expert: a trace vocabulary for planning over registered
//! environments with Monte Carlo tree search.

mod countdown;
mod environment;
mod expert;
mod mcts;

pub use countdown::CountdownEnv;
pub use environment::Environment;
pub use expert::{ENV_VAR, STATE_VAR, STATS_VAR, SearchExpert};
pub use mcts::{ActionStat, SearchConfig, SearchOutcome, search};
