//! Concrete [`BrowserControl`] implementation over the W3C WebDriver wire
//! protocol.
//!
//! Talks HTTP to a locally running chromedriver, translating each trait
//! method into the corresponding session command. Console log retrieval
//! uses the Chromium `se/log` extension endpoint, which the W3C spec does
//! not cover but chromedriver has kept from the Selenium JSON protocol.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::WebDriverConfig;

use super::{
    BrowserControl, BrowserError, ConsoleEntry, ConsoleLevel, ElementHandle, SelectChoice,
};

/// W3C element identifier key inside element reference objects.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Script computing the absolute structural path of its element argument.
///
/// Walks ancestors up to the document root, counting preceding same-tag
/// element siblings for the 1-based positional index.
const STRUCTURAL_PATH_SCRIPT: &str = "\
var el = arguments[0];\
var path = '';\
while (el && el.nodeType === Node.ELEMENT_NODE) {\
  var pos = 1;\
  for (var sib = el.previousSibling; sib; sib = sib.previousSibling) {\
    if (sib.nodeType === Node.ELEMENT_NODE && sib.nodeName === el.nodeName) { pos++; }\
  }\
  path = '/' + el.nodeName.toLowerCase() + '[' + pos + ']' + path;\
  el = el.parentNode;\
}\
return path;";

/// HTTP connect timeout for the WebDriver client.
const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// A live WebDriver session against a chromedriver endpoint.
///
/// Owned by the run orchestrator and handed to the episode controller as a
/// `dyn` [`BrowserControl`]; there is exactly one session per episode in
/// flight.
pub struct WebDriverSession {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Create a new browser session on the given WebDriver server.
    ///
    /// Requests Chromium browser logging so console entries can be drained
    /// later, and a headless window when the config asks for one.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when the server is unreachable or refuses
    /// to create a session. This is fatal for the run.
    pub async fn connect(config: &WebDriverConfig) -> Result<Self, BrowserError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BrowserError::Transport(format!("failed to build HTTP client: {e}")))?;

        let mut chrome_args = vec![
            "--disable-infobars".to_owned(),
            "--disable-notifications".to_owned(),
            "--disable-popup-blocking".to_owned(),
            "--no-sandbox".to_owned(),
            "--disable-dev-shm-usage".to_owned(),
        ];
        if config.headless {
            chrome_args.push("--headless=new".to_owned());
        }

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": chrome_args },
                    "goog:loggingPrefs": { "browser": "ALL" },
                }
            }
        });

        let url = format!("{}/session", config.base_url.trim_end_matches('/'));
        let value = send(&http, Method::POST, &url, Some(&body)).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Malformed("session response missing sessionId".into()))?
            .to_owned();

        info!(session_id = %session_id, "webdriver session created");

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            session_id,
        })
    }

    /// Issue a session-scoped command and return the `value` payload.
    async fn cmd(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, BrowserError> {
        let url = format!("{}/session/{}{path}", self.base_url, self.session_id);
        debug!(%method, path, "webdriver command");
        send(&self.http, method, &url, body).await
    }

    /// Run synchronous JavaScript in the page with the given arguments.
    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError> {
        self.cmd(
            Method::POST,
            "/execute/sync",
            Some(&json!({ "script": script, "args": args })),
        )
        .await
    }

    /// Element reference object understood by `execute/sync`.
    fn element_arg(handle: &ElementHandle) -> Value {
        json!({ ELEMENT_KEY: handle.0 })
    }
}

/// Send one WebDriver request and unwrap the `{value}` envelope.
///
/// A present `value.error` field is mapped to [`BrowserError::Protocol`]
/// regardless of HTTP status, matching how chromedriver reports failures.
async fn send(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<&Value>,
) -> Result<Value, BrowserError> {
    let mut request = http.request(method, url);
    // WebDriver requires a JSON body on every POST, even parameterless ones.
    request = match body {
        Some(b) => request.json(b),
        None => request,
    };

    let response = request
        .send()
        .await
        .map_err(|e| BrowserError::Transport(e.to_string()))?;

    let envelope: Value = response
        .json()
        .await
        .map_err(|e| BrowserError::Malformed(format!("non-JSON response: {e}")))?;

    let value = envelope
        .get("value")
        .cloned()
        .ok_or_else(|| BrowserError::Malformed("response missing `value`".into()))?;

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_owned();
        return Err(BrowserError::Protocol {
            code: code.to_owned(),
            message,
        });
    }

    Ok(value)
}

/// Extract an element id from a W3C element reference object.
fn element_id(value: &Value) -> Result<ElementHandle, BrowserError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementHandle(id.to_owned()))
        .ok_or_else(|| BrowserError::Malformed("missing element reference key".into()))
}

#[async_trait]
impl BrowserControl for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.cmd(Method::POST, "/url", Some(&json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let value = self.cmd(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| BrowserError::Malformed("current url is not a string".into()))
    }

    async fn find_elements(&self, css: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        let value = self
            .cmd(
                Method::POST,
                "/elements",
                Some(&json!({ "using": "css selector", "value": css })),
            )
            .await?;
        let refs = value
            .as_array()
            .ok_or_else(|| BrowserError::Malformed("elements response is not an array".into()))?;
        refs.iter().map(element_id).collect()
    }

    async fn is_displayed(&self, handle: &ElementHandle) -> Result<bool, BrowserError> {
        // Non-W3C endpoint kept by chromedriver from the JSON wire protocol.
        let value = self
            .cmd(Method::GET, &format!("/element/{}/displayed", handle.0), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, handle: &ElementHandle) -> Result<bool, BrowserError> {
        let value = self
            .cmd(Method::GET, &format!("/element/{}/enabled", handle.0), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let value = self
            .cmd(
                Method::GET,
                &format!("/element/{}/attribute/{name}", handle.0),
                None,
            )
            .await?;
        Ok(value.as_str().map(str::to_owned))
    }

    async fn visible_text(&self, handle: &ElementHandle) -> Result<String, BrowserError> {
        let value = self
            .cmd(Method::GET, &format!("/element/{}/text", handle.0), None)
            .await?;
        Ok(value.as_str().unwrap_or("").to_owned())
    }

    async fn outer_html(&self, handle: &ElementHandle) -> Result<String, BrowserError> {
        let value = self
            .execute(
                "return arguments[0].outerHTML;",
                vec![Self::element_arg(handle)],
            )
            .await?;
        Ok(value.as_str().unwrap_or("").to_owned())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), BrowserError> {
        self.cmd(
            Method::POST,
            &format!("/element/{}/click", handle.0),
            Some(&json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, handle: &ElementHandle, text: &str) -> Result<(), BrowserError> {
        self.cmd(
            Method::POST,
            &format!("/element/{}/value", handle.0),
            Some(&json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn options(&self, handle: &ElementHandle) -> Result<Vec<SelectChoice>, BrowserError> {
        let value = self
            .cmd(
                Method::POST,
                &format!("/element/{}/elements", handle.0),
                Some(&json!({ "using": "css selector", "value": "option" })),
            )
            .await?;
        let refs = value
            .as_array()
            .ok_or_else(|| BrowserError::Malformed("options response is not an array".into()))?;

        let mut choices = Vec::with_capacity(refs.len());
        for r in refs {
            let option = element_id(r)?;
            let label = self.visible_text(&option).await?;
            let value = self
                .attribute(&option, "value")
                .await?
                .unwrap_or_else(|| label.clone());
            choices.push(SelectChoice { label, value });
        }
        Ok(choices)
    }

    async fn select_by_value(
        &self,
        handle: &ElementHandle,
        value: &str,
    ) -> Result<(), BrowserError> {
        let refs = self
            .cmd(
                Method::POST,
                &format!("/element/{}/elements", handle.0),
                Some(&json!({ "using": "css selector", "value": "option" })),
            )
            .await?;
        let refs = refs
            .as_array()
            .ok_or_else(|| BrowserError::Malformed("options response is not an array".into()))?
            .iter()
            .map(element_id)
            .collect::<Result<Vec<_>, _>>()?;

        for option in &refs {
            let option_value = self.attribute(option, "value").await?;
            if option_value.as_deref() == Some(value) {
                return self.click(option).await;
            }
        }
        Err(BrowserError::Protocol {
            code: "no such element".to_owned(),
            message: format!("no option with value `{value}`"),
        })
    }

    async fn scroll_by(&self, offset: i64) -> Result<(), BrowserError> {
        self.execute("window.scrollBy(0, arguments[0]);", vec![json!(offset)])
            .await?;
        Ok(())
    }

    async fn structural_path(&self, handle: &ElementHandle) -> Result<String, BrowserError> {
        let value = self
            .execute(STRUCTURAL_PATH_SCRIPT, vec![Self::element_arg(handle)])
            .await?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| BrowserError::Malformed("structural path is not a string".into()))
    }

    async fn console_logs(&self) -> Result<Vec<ConsoleEntry>, BrowserError> {
        let value = self
            .cmd(Method::POST, "/se/log", Some(&json!({ "type": "browser" })))
            .await?;
        let entries = value
            .as_array()
            .ok_or_else(|| BrowserError::Malformed("log response is not an array".into()))?;

        Ok(entries
            .iter()
            .map(|entry| ConsoleEntry {
                level: ConsoleLevel::parse(
                    entry.get("level").and_then(Value::as_str).unwrap_or(""),
                ),
                message: entry
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_owned(),
            })
            .collect())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        let value = self.cmd(Method::GET, "/source", None).await?;
        Ok(value.as_str().unwrap_or("").to_owned())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let value = self.cmd(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| BrowserError::Malformed("screenshot is not a string".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::Malformed(format!("invalid screenshot base64: {e}")))
    }

    async fn has_active_alert(&self) -> Result<bool, BrowserError> {
        match self.cmd(Method::GET, "/alert/text", None).await {
            Ok(_) => Ok(true),
            Err(BrowserError::Protocol { code, .. }) if code == "no such alert" => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn accept_alert(&self) -> Result<(), BrowserError> {
        self.cmd(Method::POST, "/alert/accept", Some(&json!({})))
            .await?;
        Ok(())
    }

    async fn dismiss_alert(&self) -> Result<(), BrowserError> {
        self.cmd(Method::POST, "/alert/dismiss", Some(&json!({})))
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        match self.cmd(Method::DELETE, "", None).await {
            Ok(_) => {
                info!(session_id = %self.session_id, "webdriver session closed");
                Ok(())
            }
            Err(e) => {
                // Best-effort teardown; a dead server means nothing to release.
                warn!(error = %e, "failed to delete webdriver session");
                Err(e)
            }
        }
    }
}
