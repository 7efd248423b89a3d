//! The exploration environment: a web application modelled as a
//! controllable episode state machine.
//!
//! [`WebAppEnv`] owns one episode at a time: reset navigates to the entry
//! URL, each `step` applies one policy-chosen action, and the episode ends
//! on the step budget, a detected crash-class failure, or an explicit
//! close. Termination flushes the dual-dialect action logs so every run
//! leaves a replayable trail.
//!
//! The loop is strictly synchronous: one action in flight, observe, decide
//! termination. The browser session and episode state are owned
//! exclusively by this environment; parallel exploration means independent
//! environment/session pairs.

use std::path::PathBuf;

use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

pub mod actions;
pub mod detector;
pub mod guard;
pub mod locator;
pub mod observation;

pub use actions::{ActionKind, Outcome};
pub use observation::Observation;

use crate::browser::{BrowserControl, BrowserError};
use crate::config::ExploreConfig;
use crate::generator::ValueGenerator;
use crate::script::{self, ActionLog, ActionRecord, FailureReport};

use detector::FailureDetector;
use guard::Containment;

/// Why an episode reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The configured step budget was exhausted.
    StepLimit,
    /// The failure detector observed a crash-class condition.
    FailureDetected,
    /// The environment was closed explicitly.
    Closed,
}

/// Per-step diagnostics alongside the observation/reward/done triple.
#[derive(Debug, Default)]
pub struct StepInfo {
    /// Set when this step was terminal.
    pub termination: Option<TerminationReason>,
    /// The action kind the policy selected, when one was attempted.
    pub action: Option<ActionKind>,
    /// Whether the domain guard steered the page back this step.
    pub containment: bool,
    /// Whether an interaction was actually applied (false for no-ops).
    pub applied: bool,
    /// Failure artifacts, present only on failure termination.
    pub failure: Option<FailureReport>,
}

/// Result of a single environment step.
#[derive(Debug)]
pub struct StepResult {
    /// The observation after taking the action.
    pub observation: Observation,
    /// The reward for this step.
    pub reward: f64,
    /// Whether the episode has terminated.
    pub done: bool,
    /// Additional information about the step.
    pub info: StepInfo,
}

/// Errors from environment construction.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// The entry URL could not be parsed into an origin.
    #[error("invalid entry url `{url}`: {source}")]
    InvalidEntryUrl {
        /// The offending URL.
        url: String,
        /// Parse failure detail.
        source: url::ParseError,
    },

    /// The browser session failed during initial navigation.
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// The web application under test as a policy-controllable environment.
pub struct WebAppEnv {
    browser: Box<dyn BrowserControl>,
    generator: Box<dyn ValueGenerator>,
    detector: FailureDetector,
    rng: StdRng,

    entry_url: String,
    origin: String,
    max_steps: u32,
    scroll_offsets: Vec<i64>,
    scripts_dir: PathBuf,

    step_count: u32,
    total_reward: f64,
    log: ActionLog,
    done: bool,
    termination: Option<TerminationReason>,
}

impl WebAppEnv {
    /// Build an environment around a browser session and value generator.
    ///
    /// Captures the entry URL's host as the episode origin; the origin
    /// never changes for the lifetime of an episode. Call [`reset`]
    /// before the first [`step`].
    ///
    /// [`reset`]: WebAppEnv::reset
    /// [`step`]: WebAppEnv::step
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::InvalidEntryUrl`] when the entry URL has no
    /// parseable host.
    pub fn new(
        browser: Box<dyn BrowserControl>,
        generator: Box<dyn ValueGenerator>,
        explore: &ExploreConfig,
        scripts_dir: PathBuf,
        entry_url: &str,
    ) -> Result<Self, EnvError> {
        let origin = guard::origin_host(entry_url).map_err(|source| EnvError::InvalidEntryUrl {
            url: entry_url.to_owned(),
            source,
        })?;

        let rng = match explore.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            browser,
            generator,
            detector: FailureDetector::new(),
            rng,
            entry_url: entry_url.to_owned(),
            origin,
            max_steps: explore.max_steps,
            scroll_offsets: explore.scroll_offsets.clone(),
            scripts_dir,
            step_count: 0,
            total_reward: 0.0,
            log: ActionLog::start(entry_url),
            done: false,
            termination: None,
        })
    }

    /// Steps taken in the current episode.
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Reward accumulated over the current episode.
    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    /// Host captured at episode start.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The dual-dialect action log of the current episode.
    pub fn action_log(&self) -> &ActionLog {
        &self.log
    }

    /// Start a new episode: navigate to the entry URL, reset the logs to a
    /// single navigation entry, and zero the step counter.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when the initial navigation fails.
    pub async fn reset(&mut self) -> Result<Observation, BrowserError> {
        self.browser.navigate(&self.entry_url).await?;
        self.log = ActionLog::start(&self.entry_url);
        self.step_count = 0;
        self.total_reward = 0.0;
        self.done = false;
        self.termination = None;
        debug!(url = %self.entry_url, "episode reset");
        Ok(Observation::initial(self.max_steps))
    }

    /// Apply one policy action and observe the result.
    ///
    /// Transition order: step budget, domain containment, action
    /// application (with duplicate suppression), opportunistic dialog
    /// handling, failure detection, advance. Interaction failures inside
    /// the action handler degrade to a no-op step; errors surfacing here
    /// mean the browser session itself is gone.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when a session-level call (current URL,
    /// containment navigation) fails.
    pub async fn step(&mut self, action_index: usize) -> Result<StepResult, BrowserError> {
        if self.done || self.step_count >= self.max_steps {
            if !self.done {
                self.done = true;
                self.termination = Some(TerminationReason::StepLimit);
                self.flush_scripts().await;
            }
            return Ok(StepResult {
                observation: self.observation(),
                reward: 0.0,
                done: true,
                info: StepInfo {
                    termination: self.termination,
                    ..StepInfo::default()
                },
            });
        }

        // Containment is a whole step: no action, no reward, counter
        // advances exactly once.
        if guard::check_and_contain(self.browser.as_ref(), &self.entry_url, &self.origin).await?
            == Containment::ReturnedToOrigin
        {
            self.log.push(ActionRecord::navigate(&self.entry_url));
            self.step_count = self.step_count.saturating_add(1);
            return Ok(StepResult {
                observation: self.observation(),
                reward: 0.0,
                done: false,
                info: StepInfo {
                    containment: true,
                    ..StepInfo::default()
                },
            });
        }

        let kind = ActionKind::from_index(action_index);
        let outcome = actions::perform(
            kind,
            self.browser.as_ref(),
            self.generator.as_ref(),
            &mut self.rng,
            self.log.last_line(),
            &self.scroll_offsets,
        )
        .await;

        let applied = match outcome {
            Outcome::Applied(record) => {
                self.log.push_suppressed(record);
                true
            }
            Outcome::Suppressed => {
                debug!(kind = kind.as_str(), "duplicate action suppressed");
                false
            }
            Outcome::NoCandidates => {
                debug!(kind = kind.as_str(), "no candidates, step is a no-op");
                false
            }
            Outcome::Failed => {
                debug!(kind = kind.as_str(), "interaction failed, step is a no-op");
                false
            }
        };

        self.handle_unexpected_dialog().await;

        self.step_count = self.step_count.saturating_add(1);

        let detection = self.detector.detect(self.browser.as_ref()).await;
        if detection.failed {
            let reward = f64::from(self.step_count.saturating_add(1));
            self.total_reward += reward;
            self.done = true;
            self.termination = Some(TerminationReason::FailureDetected);

            let failure = self.persist_failure(&detection.console).await;
            self.flush_scripts().await;

            info!(
                step = self.step_count,
                reward, "crash-class failure detected, episode terminated"
            );
            return Ok(StepResult {
                observation: self.observation(),
                reward,
                done: true,
                info: StepInfo {
                    termination: Some(TerminationReason::FailureDetected),
                    action: Some(kind),
                    applied,
                    failure,
                    ..StepInfo::default()
                },
            });
        }

        Ok(StepResult {
            observation: self.observation(),
            reward: 0.0,
            done: false,
            info: StepInfo {
                action: Some(kind),
                applied,
                ..StepInfo::default()
            },
        })
    }

    /// Tear down the episode and the underlying browser session.
    ///
    /// Flushes the action logs when the episode had not already reached a
    /// terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when session teardown fails; the logs are
    /// still flushed best-effort first.
    pub async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.done {
            self.done = true;
            self.termination = Some(TerminationReason::Closed);
            self.flush_scripts().await;
        }
        self.browser.close().await
    }

    fn observation(&self) -> Observation {
        Observation {
            step: self.step_count,
            max_steps: self.max_steps,
        }
    }

    /// Pseudo-randomly accept or dismiss an unexpected modal dialog and
    /// record it in both dialects. Dialogs are rare; duplicate suppression
    /// does not apply.
    async fn handle_unexpected_dialog(&mut self) {
        match self.browser.has_active_alert().await {
            Ok(true) => {
                let accept = self.rng.gen_bool(0.5);
                let result = if accept {
                    self.browser.accept_alert().await
                } else {
                    self.browser.dismiss_alert().await
                };
                match result {
                    Ok(()) => {
                        info!(accepted = accept, "unexpected dialog handled");
                        self.log.push(ActionRecord::alert(accept));
                    }
                    Err(e) => warn!(error = %e, "failed to handle unexpected dialog"),
                }
            }
            Ok(false) => {}
            Err(e) => debug!(error = %e, "dialog probe failed"),
        }
    }

    /// Write both reproduction scripts, named from the current URL.
    async fn flush_scripts(&self) {
        let current_url = self
            .browser
            .current_url()
            .await
            .unwrap_or_else(|_| self.entry_url.clone());
        script::flush_scripts(&self.scripts_dir, &current_url, &self.log, Local::now());
    }

    /// Capture and persist the failure artifacts (screenshot + console log).
    async fn persist_failure(
        &self,
        console: &[crate::browser::ConsoleEntry],
    ) -> Option<FailureReport> {
        let current_url = self
            .browser
            .current_url()
            .await
            .unwrap_or_else(|_| self.entry_url.clone());
        let screenshot = match self.browser.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "screenshot capture failed");
                Vec::new()
            }
        };
        script::write_failure_artifacts(
            &self.scripts_dir,
            &current_url,
            console,
            &screenshot,
            Local::now(),
        )
    }
}
