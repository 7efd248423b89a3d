//! Tabular epsilon-greedy Q-learning over the discrete step state.
//!
//! The state space is the clamped step counter (0..=budget), the action
//! space is the five interaction kinds. Values persist as plain JSON under
//! the models directory so a later run resumes from earlier experience.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::env::actions::ActionKind;
use crate::env::Observation;

use super::{Policy, PolicyError};

/// Probability of exploring a uniformly random action during training.
const DEFAULT_EPSILON: f64 = 0.1;
/// Learning rate for the value update.
const ALPHA: f64 = 0.5;
/// Discount factor for future reward.
const GAMMA: f64 = 0.9;

/// On-disk shape of a persisted Q-table.
#[derive(Debug, Serialize, Deserialize)]
struct QTableFile {
    states: usize,
    actions: usize,
    values: Vec<Vec<f64>>,
}

/// Epsilon-greedy tabular learner.
pub struct QLearningPolicy {
    table: Vec<Vec<f64>>,
    epsilon: f64,
    rng: StdRng,
}

impl QLearningPolicy {
    /// A zero-initialized table for episodes of up to `max_steps` steps.
    pub fn new(max_steps: u32, seed: Option<u64>) -> Self {
        let states = usize::try_from(max_steps)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        Self {
            table: vec![vec![0.0; ActionKind::COUNT]; states],
            epsilon: DEFAULT_EPSILON,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        }
    }

    /// Load a persisted table from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the file is unreadable, does not parse,
    /// or its shape disagrees with `max_steps` and the action space.
    pub fn load(path: &Path, max_steps: u32, seed: Option<u64>) -> Result<Self, PolicyError> {
        let contents = std::fs::read_to_string(path)?;
        let file: QTableFile = serde_json::from_str(&contents)?;

        let expected_states = usize::try_from(max_steps)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        if file.states != expected_states
            || file.actions != ActionKind::COUNT
            || file.values.len() != file.states
            || file.values.iter().any(|row| row.len() != file.actions)
        {
            return Err(PolicyError::ShapeMismatch(format!(
                "have {}x{}, need {}x{}",
                file.states,
                file.actions,
                expected_states,
                ActionKind::COUNT
            )));
        }

        Ok(Self {
            table: file.values,
            epsilon: DEFAULT_EPSILON,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        })
    }

    /// Load from `path` when a usable table exists there, otherwise start
    /// fresh. Load failures are logged and never fatal.
    pub fn load_or_new(path: &Path, max_steps: u32, seed: Option<u64>) -> Self {
        if path.exists() {
            match Self::load(path, max_steps, seed) {
                Ok(policy) => {
                    info!(path = %path.display(), "loaded persisted policy");
                    return policy;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unusable persisted policy");
                }
            }
        }
        Self::new(max_steps, seed)
    }

    /// Exploration probability; zero makes the policy fully greedy, used
    /// for evaluation episodes.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    fn row(&self, state: usize) -> &[f64] {
        let last = self.table.len().saturating_sub(1);
        // The table is never empty, so an indexed row always exists.
        self.table.get(state.min(last)).map_or(&[], Vec::as_slice)
    }

    // First index among equal maxima, so a fresh table prefers low indices
    // deterministically.
    fn greedy_action(&self, state: usize) -> usize {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (index, value) in self.row(state).iter().enumerate() {
            if *value > best_value {
                best_value = *value;
                best = index;
            }
        }
        best
    }

    fn best_value(&self, state: usize) -> f64 {
        self.row(state).iter().copied().fold(f64::MIN, f64::max)
    }
}

impl Policy for QLearningPolicy {
    fn predict(&mut self, observation: &Observation) -> usize {
        if self.epsilon > 0.0 && self.rng.gen_bool(self.epsilon) {
            return self.rng.gen_range(0..ActionKind::COUNT);
        }
        self.greedy_action(observation.state_index())
    }

    fn record(&mut self, observation: &Observation, action: usize, reward: f64, done: bool) {
        let state = observation.state_index();
        let target = if done {
            reward
        } else {
            let next = self.best_value(state.saturating_add(1));
            reward + GAMMA * next
        };

        let last = self.table.len().saturating_sub(1);
        let action = action.checked_rem(ActionKind::COUNT).unwrap_or(0);
        if let Some(cell) = self
            .table
            .get_mut(state.min(last))
            .and_then(|row| row.get_mut(action))
        {
            *cell += ALPHA * (target - *cell);
        }
    }

    fn set_greedy(&mut self, greedy: bool) {
        self.epsilon = if greedy { 0.0 } else { DEFAULT_EPSILON };
    }

    fn save(&self, path: &Path) -> Result<(), PolicyError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = QTableFile {
            states: self.table.len(),
            actions: ActionKind::COUNT,
            values: self.table.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "policy persisted");
        Ok(())
    }
}
