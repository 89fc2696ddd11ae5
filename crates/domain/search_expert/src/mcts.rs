use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use trace_model::Value;

use crate::environment::Environment;

/// Tuning knobs for one search call. A fixed seed makes the run
/// reproducible; without one the generator is seeded from the OS.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub iterations: u32,
    pub exploration: f64,
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            iterations: 1000,
            exploration: 1.41,
            seed: None,
        }
    }
}

/// Visit count and mean return accumulated for one root action.
#[derive(Clone, Debug)]
pub struct ActionStat {
    pub action: Value,
    pub visits: u32,
    pub mean_return: f64,
}

/// Result of a search: the most visited root action plus the statistics
/// behind the choice. `best_action` is `None` when the root is terminal or
/// has no legal actions.
#[derive(Clone, Debug, Default)]
pub struct SearchOutcome {
    pub best_action: Option<Value>,
    pub visits: u32,
    pub mean_return: f64,
    pub action_stats: Vec<ActionStat>,
}

struct Node {
    state: Value,
    parent: Option<usize>,
    action: Option<Value>,
    children: Vec<usize>,
    untried: Vec<Value>,
    visits: u32,
    total_return: f64,
}

impl Node {
    fn mean_return(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_return / f64::from(self.visits)
        }
    }
}

/// Monte Carlo tree search over `env` from `root_state`. Each iteration
/// selects by UCB1, expands one untried action, rolls out uniformly at
/// random to a terminal state, and backpropagates the terminal reward.
pub fn search(env: &dyn Environment, root_state: &Value, config: &SearchConfig) -> SearchOutcome {
    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let root_untried = if env.is_done(root_state) {
        Vec::new()
    } else {
        env.actions(root_state)
    };
    if root_untried.is_empty() {
        return SearchOutcome::default();
    }

    let mut nodes = vec![Node {
        state: root_state.clone(),
        parent: None,
        action: None,
        children: Vec::new(),
        untried: root_untried,
        visits: 0,
        total_return: 0.0,
    }];

    for _ in 0..config.iterations {
        // Selection: descend through fully expanded nodes.
        let mut index = 0;
        while nodes[index].untried.is_empty() && !nodes[index].children.is_empty() {
            index = best_child(&nodes, index, config.exploration);
        }

        // Expansion: attach one untried action, if any remain.
        if !nodes[index].untried.is_empty() {
            let pick = rng.gen_range(0..nodes[index].untried.len());
            let action = nodes[index].untried.swap_remove(pick);
            let next_state = env.step(&nodes[index].state, &action);
            let untried = if env.is_done(&next_state) {
                Vec::new()
            } else {
                env.actions(&next_state)
            };
            let child_index = nodes.len();
            nodes.push(Node {
                state: next_state,
                parent: Some(index),
                action: Some(action),
                children: Vec::new(),
                untried,
                visits: 0,
                total_return: 0.0,
            });
            nodes[index].children.push(child_index);
            index = child_index;
        }

        // Rollout: uniform random play to a terminal or dead-end state.
        let mut rollout_state = nodes[index].state.clone();
        while !env.is_done(&rollout_state) {
            let actions = env.actions(&rollout_state);
            if actions.is_empty() {
                break;
            }
            let pick = rng.gen_range(0..actions.len());
            rollout_state = env.step(&rollout_state, &actions[pick]);
        }
        let reward = env.reward(&rollout_state);

        // Backpropagation.
        let mut current = Some(index);
        while let Some(i) = current {
            nodes[i].visits += 1;
            nodes[i].total_return += reward;
            current = nodes[i].parent;
        }
    }

    let mut action_stats: Vec<ActionStat> = Vec::new();
    let mut best: Option<&Node> = None;
    for &child in &nodes[0].children {
        let node = &nodes[child];
        if let Some(action) = &node.action {
            action_stats.push(ActionStat {
                action: action.clone(),
                visits: node.visits,
                mean_return: node.mean_return(),
            });
        }
        if best.map_or(true, |b| node.visits > b.visits) {
            best = Some(node);
        }
    }
    action_stats.sort_by(|a, b| b.visits.cmp(&a.visits));

    SearchOutcome {
        best_action: best.and_then(|node| node.action.clone()),
        visits: nodes[0].visits,
        mean_return: nodes[0].mean_return(),
        action_stats,
    }
}

fn best_child(nodes: &[Node], parent: usize, exploration: f64) -> usize {
    let parent_visits = f64::from(nodes[parent].visits).max(1.0);
    let mut best = nodes[parent].children[0];
    let mut best_score = f64::NEG_INFINITY;
    for &child in &nodes[parent].children {
        let node = &nodes[child];
        let score = if node.visits == 0 {
            f64::INFINITY
        } else {
            node.mean_return()
                + exploration * (parent_visits.ln() / f64::from(node.visits)).sqrt()
        };
        if score > best_score {
            best_score = score;
            best = child;
        }
    }
    best
}
