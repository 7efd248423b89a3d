//! Domain containment guard.
//!
//! Exploration must stay on the application under test. Before every step
//! the guard compares the current page host against the origin captured at
//! episode start; on a mismatch it re-navigates to the original entry URL.
//! Re-anchoring to the known-good start is deliberate: browser history may
//! itself point off-origin after a redirect chain.

use tracing::info;
use url::Url;

use crate::browser::{BrowserControl, BrowserError};

/// Result of a containment check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// The page is still on the original origin.
    None,
    /// The page had left the origin and was steered back to the entry URL.
    ReturnedToOrigin,
}

/// Host component of a URL, used as the episode's origin identity.
///
/// # Errors
///
/// Returns the parse error when the URL is invalid or has no host.
pub fn origin_host(url: &str) -> Result<String, url::ParseError> {
    let parsed = Url::parse(url)?;
    parsed
        .host_str()
        .map(str::to_owned)
        .ok_or(url::ParseError::EmptyHost)
}

/// Compare the current page host to the episode origin; re-navigate to the
/// entry URL when they diverge.
///
/// An unparseable current URL (`about:blank`, `data:` pages) counts as
/// off-origin. This is routine steering, never an error.
pub async fn check_and_contain(
    browser: &dyn BrowserControl,
    entry_url: &str,
    origin: &str,
) -> Result<Containment, BrowserError> {
    let current = browser.current_url().await?;
    let on_origin = Url::parse(&current)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .is_some_and(|host| host == origin);

    if on_origin {
        return Ok(Containment::None);
    }

    info!(current = %current, origin = %origin, "left origin, returning to entry url");
    browser.navigate(entry_url).await?;
    Ok(Containment::ReturnedToOrigin)
}
