//! Sample-value generation for text and date inputs.
//!
//! The episode controller asks a [`ValueGenerator`] for the string to type
//! into a field. The default [`RandomValues`] source draws fixed-format
//! random values; the optional [`llm::LlmValueGenerator`] asks a
//! chat-completions endpoint for a plausible value and falls back to the
//! random source on any error.

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;

pub mod llm;

/// Kind of input field a value is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free-form text input (text, password, email).
    Text,
    /// Date input expecting `YYYY-MM-DD`.
    Date,
}

/// Source of sample values for input fields.
///
/// Infallible by contract: implementations resolve their own errors and
/// always return a usable string.
#[async_trait]
pub trait ValueGenerator: Send + Sync {
    /// Suggest a value to type into the described element.
    async fn suggest(&self, element_html: &str, kind: ValueKind) -> String;
}

/// Fixed random-value source: alphanumeric strings and calendar dates.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomValues;

impl RandomValues {
    /// Ten random alphanumeric characters.
    pub fn random_text() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect()
    }

    /// A random `YYYY-MM-DD` date; day capped at 28 so every month is valid.
    pub fn random_date() -> String {
        let mut rng = rand::thread_rng();
        let year: u32 = rng.gen_range(2000..=2023);
        let month: u32 = rng.gen_range(1..=12);
        let day: u32 = rng.gen_range(1..=28);
        format!("{year}-{month:02}-{day:02}")
    }
}

#[async_trait]
impl ValueGenerator for RandomValues {
    async fn suggest(&self, _element_html: &str, kind: ValueKind) -> String {
        match kind {
            ValueKind::Text => Self::random_text(),
            ValueKind::Date => Self::random_date(),
        }
    }
}
