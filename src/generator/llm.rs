//! LLM-backed sample values via an OpenAI-compatible chat-completions API.
//!
//! Sends the element's outer HTML to the configured endpoint and uses the
//! first line of the reply as the value to type. Any transport, protocol,
//! or parse error falls back to [`RandomValues`] so exploration never
//! stalls on a flaky endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeneratorConfig;

use super::{RandomValues, ValueGenerator, ValueKind};

/// HTTP timeout for value-generation requests.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// Upper bound on the returned value length; anything longer is truncated.
const MAX_VALUE_CHARS: usize = 100;

// ── Wire types ──────────────────────────────────────────────────

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

/// A message in chat format.
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// A response choice.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Assistant message in a response choice.
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

// ── Generator ───────────────────────────────────────────────────

/// Value generator backed by an OpenAI-compatible endpoint.
pub struct LlmValueGenerator {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    fallback: RandomValues,
}

impl LlmValueGenerator {
    /// Create a generator from the `[generator]` config section.
    pub fn new(config: &GeneratorConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeout, using default");
                reqwest::Client::default()
            });

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            fallback: RandomValues,
        }
    }

    /// One completion round-trip; errors are stringly typed because the
    /// caller only logs them before falling back.
    async fn complete(&self, prompt: &str) -> Result<String, String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_owned(),
                content: prompt.to_owned(),
            }],
            max_tokens: 60,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.http.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("endpoint returned HTTP {status}"));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| "response contained no content".to_owned())
    }

    fn prompt_for(element_html: &str, kind: ValueKind) -> String {
        let ask = match kind {
            ValueKind::Text => "a realistic sample value to type into it",
            ValueKind::Date => "a sample date in YYYY-MM-DD format to enter into it",
        };
        format!(
            "Given this HTML form element, reply with only {ask}, \
             no quotes and no explanation:\n{element_html}"
        )
    }
}

#[async_trait]
impl ValueGenerator for LlmValueGenerator {
    async fn suggest(&self, element_html: &str, kind: ValueKind) -> String {
        match self.complete(&Self::prompt_for(element_html, kind)).await {
            Ok(reply) => {
                let value: String = reply
                    .lines()
                    .next()
                    .unwrap_or("")
                    .trim()
                    .trim_matches('"')
                    .chars()
                    .take(MAX_VALUE_CHARS)
                    .collect();
                if value.is_empty() {
                    self.fallback.suggest(element_html, kind).await
                } else {
                    debug!(kind = ?kind, "llm value generated");
                    value
                }
            }
            Err(e) => {
                warn!(error = %e, "value generator endpoint failed, using random value");
                self.fallback.suggest(element_html, kind).await
            }
        }
    }
}
