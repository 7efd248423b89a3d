//! Locator resolution for replay scripts.
//!
//! Given an element about to be interacted with, produce a stable,
//! human-readable XPath string usable by both replay dialects. Strategies
//! are tried in order of stability: identity attributes first, content
//! predicates next, a structural absolute path as the deterministic last
//! resort.

use tracing::debug;

use crate::browser::{BrowserControl, BrowserError, ElementHandle};

/// Content predicates longer than this fall through to the next strategy;
/// long text makes brittle, unreadable locators.
const MAX_PREDICATE_CHARS: usize = 60;

/// Which strategy produced a locator (kept for diagnostics and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    /// `id` attribute.
    Id,
    /// `name` attribute.
    Name,
    /// `contains(@value, ...)` predicate.
    ContainsValue,
    /// `contains(text(), ...)` predicate.
    ContainsText,
    /// Structural absolute path.
    AbsolutePath,
}

/// A resolved element locator: the XPath embedded verbatim into both
/// dialect records of the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// XPath expression addressing the element.
    pub xpath: String,
    /// Strategy that produced it.
    pub strategy: LocatorStrategy,
}

impl Locator {
    fn new(xpath: String, strategy: LocatorStrategy) -> Self {
        Self { xpath, strategy }
    }
}

/// Whether a value can be embedded in a single-quoted XPath literal.
///
/// Values containing a single quote would need composite `concat()`
/// escaping; those fall through to the next strategy instead.
fn embeddable(value: &str) -> bool {
    !value.is_empty() && !value.contains('\'') && value.chars().count() <= MAX_PREDICATE_CHARS
}

/// Resolve a locator for `handle`, trying strategies in stability order.
///
/// The structural fallback is computed in the browser and is deterministic
/// for a fixed DOM snapshot.
///
/// # Errors
///
/// Returns [`BrowserError`] only when every applicable strategy failed to
/// read from the element, which the caller treats as a transient
/// interaction failure.
pub async fn resolve(
    browser: &dyn BrowserControl,
    handle: &ElementHandle,
) -> Result<Locator, BrowserError> {
    if let Some(id) = browser.attribute(handle, "id").await? {
        if embeddable(&id) {
            return Ok(Locator::new(
                format!("//*[@id='{id}']"),
                LocatorStrategy::Id,
            ));
        }
    }

    if let Some(name) = browser.attribute(handle, "name").await? {
        if embeddable(&name) {
            return Ok(Locator::new(
                format!("//*[@name='{name}']"),
                LocatorStrategy::Name,
            ));
        }
    }

    if let Some(value) = browser.attribute(handle, "value").await? {
        if embeddable(&value) {
            return Ok(Locator::new(
                format!("//*[contains(@value, '{value}')]"),
                LocatorStrategy::ContainsValue,
            ));
        }
    }

    let text = browser.visible_text(handle).await?;
    let text = text.trim();
    if embeddable(text) {
        return Ok(Locator::new(
            format!("//*[contains(text(), '{text}')]"),
            LocatorStrategy::ContainsText,
        ));
    }

    let path = browser.structural_path(handle).await?;
    debug!(path = %path, "fell back to structural locator");
    Ok(Locator::new(path, LocatorStrategy::AbsolutePath))
}
