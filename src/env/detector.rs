//! Crash-class failure detection.
//!
//! Two signals, evaluated once per step after the action:
//! - a severe console entry whose message carries an error marker, or
//! - an unhandled-exception marker in the page source.
//!
//! Business-level wrongness is out of scope; the detector only recognizes
//! failures an end user would see as a broken page.

use regex::Regex;
use tracing::warn;

use crate::browser::{BrowserControl, ConsoleEntry, ConsoleLevel};

/// Marker a severe console message must contain to count as a failure.
const CONSOLE_ERROR_MARKER: &str = "Error";

/// Page-source patterns that signal an unhandled exception surfaced in the
/// DOM (framework error overlays, raw stack traces).
const DOM_MARKER_PATTERN: &str =
    r"(?i)uncaught\s+(?:type|reference|syntax|range)?\s*error|unhandled\s+(?:exception|promise\s+rejection)";

/// What one detection pass observed.
#[derive(Debug)]
pub struct Detection {
    /// Whether a crash-class failure was observed.
    pub failed: bool,
    /// Console entries drained during the pass, reused for artifacts.
    pub console: Vec<ConsoleEntry>,
}

/// Step-level failure detector.
#[derive(Debug)]
pub struct FailureDetector {
    dom_marker: Regex,
}

impl Default for FailureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureDetector {
    /// Build a detector with the built-in marker patterns.
    pub fn new() -> Self {
        Self {
            // The pattern is a compile-time constant; an invalid one is a
            // programming error caught by the unit tests below.
            dom_marker: Regex::new(DOM_MARKER_PATTERN).expect("valid DOM marker pattern"),
        }
    }

    /// Whether any console entry is severe and carries the error marker.
    pub fn console_failed(&self, entries: &[ConsoleEntry]) -> bool {
        entries.iter().any(|entry| {
            entry.level == ConsoleLevel::Severe && entry.message.contains(CONSOLE_ERROR_MARKER)
        })
    }

    /// Whether the page source carries an unhandled-exception marker.
    pub fn page_failed(&self, source: &str) -> bool {
        self.dom_marker.is_match(source)
    }

    /// Run one detection pass against the browser.
    ///
    /// Console retrieval drains the browser's buffer, so the drained
    /// entries are returned for artifact reuse. Retrieval errors degrade to
    /// an empty batch rather than failing the step: a broken log channel
    /// must not mask an otherwise healthy page.
    pub async fn detect(&self, browser: &dyn BrowserControl) -> Detection {
        let console = match browser.console_logs().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "console log retrieval failed, assuming empty");
                Vec::new()
            }
        };

        if self.console_failed(&console) {
            return Detection {
                failed: true,
                console,
            };
        }

        let page_failed = match browser.page_source().await {
            Ok(source) => self.page_failed(&source),
            Err(e) => {
                warn!(error = %e, "page source retrieval failed, skipping DOM check");
                false
            }
        };

        Detection {
            failed: page_failed,
            console,
        }
    }
}
