use std::collections::BTreeMap;

use crate::solver::Expert;

/// Name-to-expert map. Read-mostly after setup; holds no per-call state, so
/// shared references are safe across concurrent verifications.
#[derive(Default)]
pub struct ExpertRegistry {
    experts: BTreeMap<String, Box<dyn Expert>>,
}

impl ExpertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an expert under its own name. A later registration for the
    /// same name replaces the earlier one, which is returned.
    pub fn register(&mut self, expert: Box<dyn Expert>) -> Option<Box<dyn Expert>> {
        self.experts.insert(expert.name().to_string(), expert)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Expert> {
        self.experts.get(name).map(|expert| expert.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.experts.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.experts.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.experts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experts.is_empty()
    }
}
