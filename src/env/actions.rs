//! Action catalog and per-kind handlers.
//!
//! Each [`ActionKind`] knows how to discover its candidate elements, pick
//! one, synthesize the outbound value, and apply the interaction. Handlers
//! share a single outcome contract so the episode controller treats every
//! kind uniformly.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use crate::browser::{BrowserControl, BrowserError, ElementHandle};
use crate::generator::{ValueGenerator, ValueKind};
use crate::script::ActionRecord;

use super::locator;

/// The closed set of simulated user interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Click an anchor or button.
    Click,
    /// Type into a text, password, or email input.
    InputText,
    /// Scroll the viewport vertically.
    Scroll,
    /// Pick an option of a `<select>` element.
    SelectOption,
    /// Enter a date into a date input.
    EnterDate,
}

impl ActionKind {
    /// All kinds, in policy action-index order.
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Click,
        ActionKind::InputText,
        ActionKind::Scroll,
        ActionKind::SelectOption,
        ActionKind::EnterDate,
    ];

    /// Size of the policy's action space.
    pub const COUNT: usize = Self::ALL.len();

    /// Map a policy action index onto a kind; indices wrap modulo the
    /// action space so any usize a policy emits is total.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.checked_rem(Self::COUNT).unwrap_or(0)]
    }

    /// Discovery CSS selector group for this kind's candidates.
    /// `None` for kinds that need no element (Scroll).
    pub fn discovery_css(self) -> Option<&'static str> {
        match self {
            ActionKind::Click => Some("a, button"),
            ActionKind::InputText => {
                Some("input[type='text'], input[type='password'], input[type='email']")
            }
            ActionKind::Scroll => None,
            ActionKind::SelectOption => Some("select"),
            ActionKind::EnterDate => Some("input[type='date']"),
        }
    }

    /// Short name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::InputText => "input_text",
            ActionKind::Scroll => "scroll",
            ActionKind::SelectOption => "select_option",
            ActionKind::EnterDate => "enter_date",
        }
    }
}

/// What a per-kind handler did with its step.
#[derive(Debug)]
pub enum Outcome {
    /// The interaction was applied; the record belongs in the logs.
    Applied(ActionRecord),
    /// The rendered record equalled the previous log entry; nothing applied.
    Suppressed,
    /// No visible, enabled candidate matched the discovery predicate.
    NoCandidates,
    /// The interaction failed even after retrying an alternative candidate.
    Failed,
}

/// Select and apply one action of the given kind.
///
/// `previous` is the most recent log line, for duplicate suppression.
/// Interaction errors are resolved here: one transient failure retries an
/// alternative candidate, anything further degrades to [`Outcome::Failed`],
/// which the controller treats as a no-op step.
pub async fn perform(
    kind: ActionKind,
    browser: &dyn BrowserControl,
    generator: &dyn ValueGenerator,
    rng: &mut StdRng,
    previous: Option<&str>,
    scroll_offsets: &[i64],
) -> Outcome {
    match kind {
        ActionKind::Scroll => perform_scroll(browser, rng, previous, scroll_offsets).await,
        _ => perform_on_element(kind, browser, generator, rng, previous).await,
    }
}

/// Scroll by a random offset from the configured set.
async fn perform_scroll(
    browser: &dyn BrowserControl,
    rng: &mut StdRng,
    previous: Option<&str>,
    scroll_offsets: &[i64],
) -> Outcome {
    let offset = match pick(rng, scroll_offsets) {
        Some(offset) => *offset,
        None => return Outcome::NoCandidates,
    };

    let record = ActionRecord::scroll(offset);
    if previous == Some(record.selenium.as_str()) {
        return Outcome::Suppressed;
    }

    match browser.scroll_by(offset).await {
        Ok(()) => Outcome::Applied(record),
        Err(e) => {
            warn!(error = %e, "scroll failed");
            Outcome::Failed
        }
    }
}

/// Element-targeting kinds: discover, filter, pick, apply; one bounded
/// retry against an alternative candidate on a transient failure.
async fn perform_on_element(
    kind: ActionKind,
    browser: &dyn BrowserControl,
    generator: &dyn ValueGenerator,
    rng: &mut StdRng,
    previous: Option<&str>,
) -> Outcome {
    let css = match kind.discovery_css() {
        Some(css) => css,
        None => return Outcome::NoCandidates,
    };

    let mut pool = match candidates(browser, css).await {
        Ok(pool) => pool,
        Err(e) => {
            warn!(kind = kind.as_str(), error = %e, "candidate discovery failed");
            return Outcome::Failed;
        }
    };
    if pool.is_empty() {
        return Outcome::NoCandidates;
    }

    // First pick plus at most one alternative; unbounded recursion over the
    // candidate list would tie stack depth to DOM size.
    for attempt in 0..2u8 {
        if pool.is_empty() {
            break;
        }
        let index = rng.gen_range(0..pool.len());
        let handle = pool.swap_remove(index);

        match apply_to(kind, browser, generator, rng, &handle, previous).await {
            Ok(outcome) => return outcome,
            Err(e) if e.is_transient() => {
                debug!(
                    kind = kind.as_str(),
                    attempt,
                    error = %e,
                    "transient interaction failure, trying alternative candidate"
                );
            }
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "interaction failed");
                return Outcome::Failed;
            }
        }
    }

    Outcome::Failed
}

/// Elements matching `css` that report themselves displayed and enabled.
///
/// Per-element predicate errors (stale handles) drop the element rather
/// than failing discovery.
async fn candidates(
    browser: &dyn BrowserControl,
    css: &str,
) -> Result<Vec<ElementHandle>, BrowserError> {
    let found = browser.find_elements(css).await?;
    let mut usable = Vec::with_capacity(found.len());
    for handle in found {
        let displayed = browser.is_displayed(&handle).await.unwrap_or(false);
        let enabled = browser.is_enabled(&handle).await.unwrap_or(false);
        if displayed && enabled {
            usable.push(handle);
        }
    }
    Ok(usable)
}

/// Build the record for one candidate and apply the interaction.
///
/// The record is rendered before applying so duplicate suppression can
/// veto the interaction without side effects.
async fn apply_to(
    kind: ActionKind,
    browser: &dyn BrowserControl,
    generator: &dyn ValueGenerator,
    rng: &mut StdRng,
    handle: &ElementHandle,
    previous: Option<&str>,
) -> Result<Outcome, BrowserError> {
    match kind {
        ActionKind::Click => {
            let locator = locator::resolve(browser, handle).await?;
            let record = ActionRecord::click(&locator.xpath);
            if previous == Some(record.selenium.as_str()) {
                return Ok(Outcome::Suppressed);
            }
            browser.click(handle).await?;
            Ok(Outcome::Applied(record))
        }
        ActionKind::InputText | ActionKind::EnterDate => {
            let value_kind = if kind == ActionKind::EnterDate {
                ValueKind::Date
            } else {
                ValueKind::Text
            };
            let html = browser.outer_html(handle).await.unwrap_or_default();
            let value = generator.suggest(&html, value_kind).await;

            let locator = locator::resolve(browser, handle).await?;
            let record = ActionRecord::send_keys(&locator.xpath, &value);
            if previous == Some(record.selenium.as_str()) {
                return Ok(Outcome::Suppressed);
            }
            browser.send_keys(handle, &value).await?;
            Ok(Outcome::Applied(record))
        }
        ActionKind::SelectOption => {
            let options = browser.options(handle).await?;
            let choice = match pick(rng, &options) {
                Some(choice) => choice.clone(),
                None => return Ok(Outcome::NoCandidates),
            };

            let locator = locator::resolve(browser, handle).await?;
            let record = ActionRecord::select_option(&locator.xpath, &choice.value);
            if previous == Some(record.selenium.as_str()) {
                return Ok(Outcome::Suppressed);
            }
            browser.select_by_value(handle, &choice.value).await?;
            Ok(Outcome::Applied(record))
        }
        ActionKind::Scroll => Ok(Outcome::NoCandidates),
    }
}

/// Uniform random pick from a slice.
fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.gen_range(0..items.len()))
}
