//! Observation exposed to the policy.
//!
//! The engine's learning signal is deliberately small: a step counter
//! normalized into a fixed-width feature vector, plus a discrete state
//! index for tabular policies. Slots beyond the first are reserved for
//! richer page features (per-kind candidate counts) and currently read
//! zero.

use serde::{Deserialize, Serialize};

/// Width of the feature vector handed to vector-based policies.
pub const OBS_DIM: usize = 8;

/// State snapshot the episode controller exposes after every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Steps taken so far this episode.
    pub step: u32,
    /// Configured episode step budget.
    pub max_steps: u32,
}

impl Observation {
    /// Observation at episode start.
    pub fn initial(max_steps: u32) -> Self {
        Self { step: 0, max_steps }
    }

    /// Fixed-width feature vector; slot 0 is the normalized step counter.
    pub fn features(&self) -> [f64; OBS_DIM] {
        let mut features = [0.0; OBS_DIM];
        if self.max_steps > 0 {
            features[0] = f64::from(self.step.min(self.max_steps)) / f64::from(self.max_steps);
        }
        features
    }

    /// Discrete state index for tabular policies, clamped to the budget.
    pub fn state_index(&self) -> usize {
        usize::try_from(self.step.min(self.max_steps)).unwrap_or(usize::MAX)
    }
}
