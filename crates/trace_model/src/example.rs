use serde::{Deserialize, Serialize};

use crate::step::Step;
use crate::value::Value;

/// A query with its trace solution and expected answer. Generators produce
/// these; batch verification consumes them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceExample {
    pub expert: String,
    pub query: String,
    pub trace: Vec<Step>,
    #[serde(default)]
    pub answer: Option<Value>,
}
