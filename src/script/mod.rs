//! Action log and replay-script synthesizer.
//!
//! Every executed interaction is recorded in two parallel textual dialects:
//! a Selenium-Python line and a UFT (VBScript) line, sharing the same
//! locator string. On episode end the two logs are flushed to
//! `generated-scripts/` as runnable reproduction scripts; a detected
//! failure additionally persists a screenshot and the console log under the
//! same naming convention.
//!
//! Artifact writes are best-effort: failures are logged and swallowed so a
//! full disk never aborts an exploration run.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::browser::ConsoleEntry;

/// Timestamp format used in artifact filenames (second granularity).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// The two replay dialects every action is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Selenium-Python lines (`driver.find_element(...)`).
    Selenium,
    /// UFT VBScript lines (`Browser("Browser").Page("Page")...`).
    Uft,
}

// ── Action records ──────────────────────────────────────────────

/// One executed action rendered in both replay dialects.
///
/// Both lines embed the same locator string, so a reproduction in either
/// tool addresses the same element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// Selenium-Python dialect line.
    pub selenium: String,
    /// UFT VBScript dialect line.
    pub uft: String,
}

impl ActionRecord {
    /// Navigation to a URL.
    pub fn navigate(url: &str) -> Self {
        Self {
            selenium: format!("driver.get('{url}')"),
            uft: format!("Browser(\"Browser\").Navigate \"{url}\""),
        }
    }

    /// Click on the element at `xpath`.
    pub fn click(xpath: &str) -> Self {
        Self {
            selenium: format!("driver.find_element(By.XPATH, '{xpath}').click()"),
            uft: format!("Browser(\"Browser\").Page(\"Page\").WebElement(\"xpath:={xpath}\").Click"),
        }
    }

    /// Typing `text` into the element at `xpath` (text and date inputs).
    pub fn send_keys(xpath: &str, text: &str) -> Self {
        Self {
            selenium: format!("driver.find_element(By.XPATH, '{xpath}').send_keys('{text}')"),
            uft: format!(
                "Browser(\"Browser\").Page(\"Page\").WebEdit(\"xpath:={xpath}\").Set \"{text}\""
            ),
        }
    }

    /// Selecting the option with `value` in the `<select>` at `xpath`.
    pub fn select_option(xpath: &str, value: &str) -> Self {
        Self {
            selenium: format!(
                "element = driver.find_element(By.XPATH, '{xpath}'); \
                 Select(element).select_by_value('{value}')"
            ),
            uft: format!(
                "Browser(\"Browser\").Page(\"Page\").WebList(\"xpath:={xpath}\").Select \"{value}\""
            ),
        }
    }

    /// Scrolling the viewport down by `offset` pixels.
    pub fn scroll(offset: i64) -> Self {
        Self {
            selenium: format!("driver.execute_script('window.scrollBy(0, {offset});')"),
            uft: format!(
                "Browser(\"Browser\").Page(\"Page\").RunScript \"window.scrollBy(0, {offset})\""
            ),
        }
    }

    /// Accepting or dismissing an unexpected modal dialog.
    pub fn alert(accepted: bool) -> Self {
        if accepted {
            Self {
                selenium: "driver.switch_to.alert.accept()".to_owned(),
                uft: "Browser(\"Browser\").Dialog(\"Dialog\").WinButton(\"OK\").Click".to_owned(),
            }
        } else {
            Self {
                selenium: "driver.switch_to.alert.dismiss()".to_owned(),
                uft: "Browser(\"Browser\").Dialog(\"Dialog\").WinButton(\"Cancel\").Click"
                    .to_owned(),
            }
        }
    }
}

// ── Action log ──────────────────────────────────────────────────

/// Ordered dual-dialect log of one episode's executed actions.
///
/// The two sequences always have equal length: every append writes either
/// both dialects or neither.
#[derive(Debug, Clone)]
pub struct ActionLog {
    selenium: Vec<String>,
    uft: Vec<String>,
}

impl ActionLog {
    /// Start a fresh log whose single entry records the initial navigation.
    pub fn start(entry_url: &str) -> Self {
        let record = ActionRecord::navigate(entry_url);
        Self {
            selenium: vec![record.selenium],
            uft: vec![record.uft],
        }
    }

    /// Number of entries (equal in both dialects).
    pub fn len(&self) -> usize {
        self.selenium.len()
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.selenium.is_empty()
    }

    /// The most recent Selenium-dialect line, used for duplicate suppression.
    pub fn last_line(&self) -> Option<&str> {
        self.selenium.last().map(String::as_str)
    }

    /// Append a record to both dialects if it differs from the previous one.
    ///
    /// Returns `false` (and appends nothing) when the Selenium rendering is
    /// textually identical to the immediately preceding entry.
    pub fn push_suppressed(&mut self, record: ActionRecord) -> bool {
        if self.last_line() == Some(record.selenium.as_str()) {
            return false;
        }
        self.push(record);
        true
    }

    /// Append a record to both dialects unconditionally.
    ///
    /// Used for containment navigations and dialog handling, which bypass
    /// duplicate suppression by construction.
    pub fn push(&mut self, record: ActionRecord) {
        self.selenium.push(record.selenium);
        self.uft.push(record.uft);
    }

    /// Lines of one dialect in execution order.
    pub fn lines(&self, dialect: Dialect) -> &[String] {
        match dialect {
            Dialect::Selenium => &self.selenium,
            Dialect::Uft => &self.uft,
        }
    }
}

// ── Artifact persistence ────────────────────────────────────────

/// Paths of the flushed reproduction scripts.
#[derive(Debug, Clone)]
pub struct ScriptPaths {
    /// Selenium-Python script path.
    pub selenium: PathBuf,
    /// UFT script path.
    pub uft: PathBuf,
}

/// Artifacts persisted when a crash-class failure terminates an episode.
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// URL of the page on which the failure was observed.
    pub url: String,
    /// Filename timestamp of the artifacts.
    pub timestamp: String,
    /// Screenshot artifact path.
    pub screenshot_path: PathBuf,
    /// Console-log artifact path.
    pub console_log_path: PathBuf,
}

/// Replace every character that is not alphanumeric or `.`/`-`/`_` with `_`.
pub fn sanitize_for_filename(url: &str) -> String {
    url.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write both dialect scripts to `dir`, named from the current URL and a
/// second-granularity timestamp.
///
/// Returns `None` when either write fails; the failure is logged and
/// swallowed so artifact I/O never aborts an episode.
pub fn flush_scripts(
    dir: &Path,
    current_url: &str,
    log: &ActionLog,
    now: DateTime<Local>,
) -> Option<ScriptPaths> {
    let stem = sanitize_for_filename(current_url);
    let ts = now.format(TIMESTAMP_FORMAT);
    let selenium_path = dir.join(format!("Steps_{stem}_{ts}.py"));
    let uft_path = dir.join(format!("UFT_Steps_{stem}_{ts}.txt"));

    if let Err(e) = write_lines(&selenium_path, log.lines(Dialect::Selenium)) {
        warn!(path = %selenium_path.display(), error = %e, "failed to write selenium script");
        return None;
    }
    if let Err(e) = write_lines(&uft_path, log.lines(Dialect::Uft)) {
        warn!(path = %uft_path.display(), error = %e, "failed to write uft script");
        return None;
    }

    info!(
        selenium = %selenium_path.display(),
        uft = %uft_path.display(),
        steps = log.len(),
        "reproduction scripts saved"
    );
    Some(ScriptPaths {
        selenium: selenium_path,
        uft: uft_path,
    })
}

/// Persist the failure artifacts: a PNG screenshot and the console log
/// formatted as `[LEVEL] - message` lines.
///
/// Returns `None` when either write fails (logged and swallowed).
pub fn write_failure_artifacts(
    dir: &Path,
    current_url: &str,
    console: &[ConsoleEntry],
    screenshot: &[u8],
    now: DateTime<Local>,
) -> Option<FailureReport> {
    let stem = sanitize_for_filename(current_url);
    let ts = now.format(TIMESTAMP_FORMAT).to_string();
    let screenshot_path = dir.join(format!("Error_{stem}_{ts}.png"));
    let console_log_path = dir.join(format!("Error_{stem}_{ts}.log"));

    if let Err(e) = std::fs::write(&screenshot_path, screenshot) {
        warn!(path = %screenshot_path.display(), error = %e, "failed to write screenshot");
        return None;
    }

    let lines: Vec<String> = console
        .iter()
        .map(|entry| format!("[{}] - {}", entry.level.as_str(), entry.message))
        .collect();
    if let Err(e) = write_lines(&console_log_path, &lines) {
        warn!(path = %console_log_path.display(), error = %e, "failed to write console log");
        return None;
    }

    info!(
        screenshot = %screenshot_path.display(),
        console_log = %console_log_path.display(),
        "failure artifacts saved"
    );
    Some(FailureReport {
        url: current_url.to_owned(),
        timestamp: ts,
        screenshot_path,
        console_log_path,
    })
}

/// Write lines to a file, one per line, creating or truncating it.
fn write_lines(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}
