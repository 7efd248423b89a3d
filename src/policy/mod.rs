//! Action selection boundary.
//!
//! The episode controller is policy-agnostic: anything that maps an
//! observation to an action index and accepts reward feedback can drive
//! exploration. The bundled implementation is a small tabular learner
//! ([`qlearn::QLearningPolicy`]); loading a persisted policy is a
//! constructor on the concrete type, so the trait stays object-safe.

use std::path::Path;

use crate::env::Observation;

pub mod qlearn;

pub use qlearn::QLearningPolicy;

/// Errors from policy persistence.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Reading or writing the policy file failed.
    #[error("policy file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted policy did not parse.
    #[error("policy state did not parse: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The persisted policy does not match the configured episode shape.
    #[error("persisted policy shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// A decision-maker over the environment's discrete action space.
pub trait Policy: Send {
    /// Choose an action index for the given observation.
    fn predict(&mut self, observation: &Observation) -> usize;

    /// Feed back the result of taking `action` from `observation`.
    fn record(&mut self, observation: &Observation, action: usize, reward: f64, done: bool);

    /// Switch between exploiting learned values only (evaluation) and the
    /// policy's own exploration behavior (training). No-op by default.
    fn set_greedy(&mut self, greedy: bool) {
        let _ = greedy;
    }

    /// Persist the policy state to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when serialization or the write fails.
    fn save(&self, path: &Path) -> Result<(), PolicyError>;
}
