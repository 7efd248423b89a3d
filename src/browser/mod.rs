//! Browser control boundary.
//!
//! The exploration engine drives the page exclusively through the
//! [`BrowserControl`] trait, so tests substitute a scripted fake and the
//! engine never depends on a live browser. The shipped implementation is
//! [`webdriver::WebDriverSession`], a thin W3C WebDriver client.

use async_trait::async_trait;

pub mod webdriver;

/// Opaque handle to a DOM element held by the browser session.
///
/// Valid only for the step in which it was discovered; the engine never
/// retains handles across steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(pub String);

/// Severity of a captured console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    /// Error-level output (`console.error`, uncaught exceptions).
    Severe,
    /// Warning-level output.
    Warning,
    /// Informational output.
    Info,
    /// Debug/verbose output.
    Debug,
}

impl ConsoleLevel {
    /// Artifact-file label for this level.
    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleLevel::Severe => "SEVERE",
            ConsoleLevel::Warning => "WARNING",
            ConsoleLevel::Info => "INFO",
            ConsoleLevel::Debug => "DEBUG",
        }
    }

    /// Parse a WebDriver log level string, defaulting unknown levels to Info.
    pub fn parse(level: &str) -> Self {
        match level {
            "SEVERE" | "ERROR" => ConsoleLevel::Severe,
            "WARNING" => ConsoleLevel::Warning,
            "DEBUG" | "FINE" | "FINER" | "FINEST" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Info,
        }
    }
}

/// One captured browser console entry.
#[derive(Debug, Clone)]
pub struct ConsoleEntry {
    /// Entry severity.
    pub level: ConsoleLevel,
    /// Raw console message.
    pub message: String,
}

/// One `<option>` inside a `<select>` element.
#[derive(Debug, Clone)]
pub struct SelectChoice {
    /// Visible option label.
    pub label: String,
    /// The option's `value` attribute.
    pub value: String,
}

/// Errors from the browser control channel.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// HTTP transport failed before a WebDriver response arrived.
    #[error("webdriver transport error: {0}")]
    Transport(String),

    /// The WebDriver server returned a protocol-level error.
    #[error("webdriver error `{code}`: {message}")]
    Protocol {
        /// W3C error code (e.g. `stale element reference`).
        code: String,
        /// Human-readable message from the server.
        message: String,
    },

    /// A response arrived but did not match the expected shape.
    #[error("malformed webdriver response: {0}")]
    Malformed(String),
}

impl BrowserError {
    /// Whether this error is a per-element interaction failure the engine
    /// may retry against an alternative candidate.
    pub fn is_transient(&self) -> bool {
        match self {
            BrowserError::Protocol { code, .. } => matches!(
                code.as_str(),
                "stale element reference"
                    | "element not interactable"
                    | "element click intercepted"
                    | "invalid element state"
                    | "timeout"
            ),
            _ => false,
        }
    }
}

/// Interaction primitives the exploration engine needs from a browser.
///
/// Implementations must tolerate being called on elements that have gone
/// stale since discovery; such calls surface as transient
/// [`BrowserError::Protocol`] values rather than panics.
#[async_trait]
pub trait BrowserControl: Send + Sync {
    /// Navigate the session to `url`.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Current top-level document URL.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// All elements matching a CSS selector group, in document order.
    async fn find_elements(&self, css: &str) -> Result<Vec<ElementHandle>, BrowserError>;

    /// Whether the element is rendered and visible.
    async fn is_displayed(&self, handle: &ElementHandle) -> Result<bool, BrowserError>;

    /// Whether the element accepts interaction.
    async fn is_enabled(&self, handle: &ElementHandle) -> Result<bool, BrowserError>;

    /// Value of an attribute, `None` when absent.
    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Rendered text content of the element.
    async fn visible_text(&self, handle: &ElementHandle) -> Result<String, BrowserError>;

    /// Serialized outer HTML of the element (for value-generator prompts).
    async fn outer_html(&self, handle: &ElementHandle) -> Result<String, BrowserError>;

    /// Click the element.
    async fn click(&self, handle: &ElementHandle) -> Result<(), BrowserError>;

    /// Type text into the element.
    async fn send_keys(&self, handle: &ElementHandle, text: &str) -> Result<(), BrowserError>;

    /// Available options of a `<select>` element.
    async fn options(&self, handle: &ElementHandle) -> Result<Vec<SelectChoice>, BrowserError>;

    /// Select the option of a `<select>` element with the given value.
    async fn select_by_value(
        &self,
        handle: &ElementHandle,
        value: &str,
    ) -> Result<(), BrowserError>;

    /// Scroll the viewport vertically by `offset` pixels.
    async fn scroll_by(&self, offset: i64) -> Result<(), BrowserError>;

    /// Absolute structural path of the element: slash-separated lowercased
    /// tag names with 1-based same-tag sibling positions. Deterministic for
    /// a fixed DOM snapshot.
    async fn structural_path(&self, handle: &ElementHandle) -> Result<String, BrowserError>;

    /// Drain buffered console log entries.
    async fn console_logs(&self) -> Result<Vec<ConsoleEntry>, BrowserError>;

    /// Serialized source of the current page.
    async fn page_source(&self) -> Result<String, BrowserError>;

    /// PNG screenshot of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    /// Whether a modal dialog (alert/confirm/prompt) is currently open.
    async fn has_active_alert(&self) -> Result<bool, BrowserError>;

    /// Accept the active dialog.
    async fn accept_alert(&self) -> Result<(), BrowserError>;

    /// Dismiss the active dialog.
    async fn dismiss_alert(&self) -> Result<(), BrowserError>;

    /// Tear down the browser session.
    async fn close(&self) -> Result<(), BrowserError>;
}
