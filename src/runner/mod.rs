//! Run orchestration: training episodes, policy persistence, evaluation
//! episodes, per-episode reporting.
//!
//! The orchestrator drives one environment/policy pair to completion: N
//! training episodes with learning enabled, a policy save, then N greedy
//! evaluation episodes. Each episode is summarized through tracing as it
//! finishes so long runs are observable mid-flight.

use std::path::Path;

use tracing::{info, warn};

use crate::browser::BrowserError;
use crate::env::{StepResult, WebAppEnv};
use crate::policy::{Policy, PolicyError};
use crate::script::FailureReport;

/// Whether an episode ran under learning or greedy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Learning enabled, exploratory action selection.
    Train,
    /// Learning disabled, greedy action selection.
    Eval,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Eval => "eval",
        }
    }
}

/// Outcome of a single finished episode.
#[derive(Debug)]
pub struct EpisodeSummary {
    /// Zero-based episode index within its phase.
    pub index: u32,
    /// Which phase the episode ran in.
    pub phase: Phase,
    /// Steps the episode consumed.
    pub steps: u32,
    /// Total reward collected.
    pub total_reward: f64,
    /// Failure artifacts when the episode ended on a detected failure.
    pub failure: Option<FailureReport>,
}

/// Aggregate outcome of a whole run.
#[derive(Debug)]
pub struct RunSummary {
    /// Every finished episode, training first.
    pub episodes: Vec<EpisodeSummary>,
    /// How many episodes ended on a detected failure.
    pub failures: usize,
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The browser session died mid-run.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// The trained policy could not be persisted.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Drive `episodes` training episodes, persist the policy, then run the
/// same number of greedy evaluation episodes.
///
/// # Errors
///
/// Returns [`RunError`] when the browser session fails at the episode
/// boundary or the policy save fails. Failures detected in the application
/// under test are results, not errors.
pub async fn run(
    env: &mut WebAppEnv,
    policy: &mut dyn Policy,
    episodes: u32,
    model_path: &Path,
) -> Result<RunSummary, RunError> {
    let mut summaries = Vec::new();

    policy.set_greedy(false);
    for index in 0..episodes {
        let summary = run_episode(env, policy, Phase::Train, index, episodes).await?;
        summaries.push(summary);
    }

    policy.save(model_path)?;

    policy.set_greedy(true);
    for index in 0..episodes {
        let summary = run_episode(env, policy, Phase::Eval, index, episodes).await?;
        summaries.push(summary);
    }

    let failures = summaries.iter().filter(|s| s.failure.is_some()).count();
    info!(
        episodes = summaries.len(),
        failures, "run complete"
    );
    Ok(RunSummary {
        episodes: summaries,
        failures,
    })
}

/// Run one episode to its terminal state.
async fn run_episode(
    env: &mut WebAppEnv,
    policy: &mut dyn Policy,
    phase: Phase,
    index: u32,
    total: u32,
) -> Result<EpisodeSummary, RunError> {
    let mut observation = env.reset().await?;
    let mut total_reward = 0.0;
    let mut failure = None;

    loop {
        let action = policy.predict(&observation);
        let StepResult {
            observation: next,
            reward,
            done,
            info,
        } = env.step(action).await?;

        if phase == Phase::Train {
            policy.record(&observation, action, reward, done);
        }
        total_reward += reward;
        if let Some(report) = info.failure {
            failure = Some(report);
        }
        observation = next;
        if done {
            break;
        }
    }

    let summary = EpisodeSummary {
        index,
        phase,
        steps: env.step_count(),
        total_reward,
        failure,
    };
    report(&summary, total);
    Ok(summary)
}

// Progress lines use 1-based "episode i of N" numbering.
fn report(summary: &EpisodeSummary, total: u32) {
    match &summary.failure {
        Some(report) => warn!(
            phase = summary.phase.as_str(),
            episode = summary.index.saturating_add(1),
            of = total,
            steps = summary.steps,
            reward = summary.total_reward,
            url = %report.url,
            screenshot = %report.screenshot_path.display(),
            console_log = %report.console_log_path.display(),
            "episode ended on a detected failure"
        ),
        None => info!(
            phase = summary.phase.as_str(),
            episode = summary.index.saturating_add(1),
            of = total,
            steps = summary.steps,
            reward = summary.total_reward,
            "episode complete"
        ),
    }
}
