//! Scripted in-memory browser used to exercise the episode state machine
//! without a live WebDriver server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use prowl::browser::{BrowserControl, BrowserError, ConsoleEntry, ElementHandle, SelectChoice};
use prowl::generator::{ValueGenerator, ValueKind};

/// One scripted DOM element, registered under a discovery selector group.
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    /// Discovery selector group this element answers to.
    pub css: String,
    pub id_attr: Option<String>,
    pub name_attr: Option<String>,
    pub value_attr: Option<String>,
    pub text: String,
    pub html: String,
    pub displayed: bool,
    pub enabled: bool,
    pub options: Vec<SelectChoice>,
    /// URL the page moves to when this element is clicked.
    pub on_click_navigate: Option<String>,
}

impl FakeElement {
    pub fn visible(css: &str) -> Self {
        Self {
            css: css.to_owned(),
            displayed: true,
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id_attr = Some(id.to_owned());
        self
    }

    pub fn navigating_to(mut self, url: &str) -> Self {
        self.on_click_navigate = Some(url.to_owned());
        self
    }
}

#[derive(Debug, Default)]
struct State {
    current_url: String,
    elements: Vec<FakeElement>,
    console_batches: VecDeque<Vec<ConsoleEntry>>,
    page_source: String,
    alert_active: bool,
    navigations: Vec<String>,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    scrolls: Vec<i64>,
    alerts_accepted: u32,
    alerts_dismissed: u32,
    closed: bool,
}

/// Deterministic [`BrowserControl`] backed by scripted state.
///
/// Clones share the same state, so a test keeps one clone for assertions
/// after handing another to the environment.
#[derive(Debug, Clone)]
pub struct FakeBrowser {
    state: Arc<Mutex<State>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                page_source: "<html><body>ok</body></html>".to_owned(),
                ..State::default()
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake browser lock")
    }

    pub fn add_element(&self, element: FakeElement) {
        self.lock().elements.push(element);
    }

    pub fn queue_console(&self, entries: Vec<ConsoleEntry>) {
        self.lock().console_batches.push_back(entries);
    }

    pub fn set_page_source(&self, source: &str) {
        self.lock().page_source = source.to_owned();
    }

    pub fn set_current_url(&self, url: &str) {
        self.lock().current_url = url.to_owned();
    }

    pub fn set_alert(&self, active: bool) {
        self.lock().alert_active = active;
    }

    pub fn current_url_snapshot(&self) -> String {
        self.lock().current_url.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.lock().typed.clone()
    }

    pub fn scrolls(&self) -> Vec<i64> {
        self.lock().scrolls.clone()
    }

    pub fn alerts_handled(&self) -> (u32, u32) {
        let state = self.lock();
        (state.alerts_accepted, state.alerts_dismissed)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn element(state: &State, handle: &ElementHandle) -> Result<FakeElement, BrowserError> {
        handle
            .0
            .parse::<usize>()
            .ok()
            .and_then(|index| state.elements.get(index).cloned())
            .ok_or_else(|| BrowserError::Protocol {
                code: "stale element reference".to_owned(),
                message: format!("no element {}", handle.0),
            })
    }
}

#[async_trait]
impl BrowserControl for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.navigations.push(url.to_owned());
        state.current_url = url.to_owned();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.lock().current_url.clone())
    }

    async fn find_elements(&self, css: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        let state = self.lock();
        Ok(state
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.css == css)
            .map(|(index, _)| ElementHandle(index.to_string()))
            .collect())
    }

    async fn is_displayed(&self, handle: &ElementHandle) -> Result<bool, BrowserError> {
        let state = self.lock();
        Ok(Self::element(&state, handle)?.displayed)
    }

    async fn is_enabled(&self, handle: &ElementHandle) -> Result<bool, BrowserError> {
        let state = self.lock();
        Ok(Self::element(&state, handle)?.enabled)
    }

    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let state = self.lock();
        let element = Self::element(&state, handle)?;
        Ok(match name {
            "id" => element.id_attr,
            "name" => element.name_attr,
            "value" => element.value_attr,
            _ => None,
        })
    }

    async fn visible_text(&self, handle: &ElementHandle) -> Result<String, BrowserError> {
        let state = self.lock();
        Ok(Self::element(&state, handle)?.text)
    }

    async fn outer_html(&self, handle: &ElementHandle) -> Result<String, BrowserError> {
        let state = self.lock();
        Ok(Self::element(&state, handle)?.html)
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let element = Self::element(&state, handle)?;
        state.clicks.push(handle.0.clone());
        if let Some(url) = element.on_click_navigate {
            state.current_url = url;
        }
        Ok(())
    }

    async fn send_keys(&self, handle: &ElementHandle, text: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        Self::element(&state, handle)?;
        state.typed.push((handle.0.clone(), text.to_owned()));
        Ok(())
    }

    async fn options(&self, handle: &ElementHandle) -> Result<Vec<SelectChoice>, BrowserError> {
        let state = self.lock();
        Ok(Self::element(&state, handle)?.options)
    }

    async fn select_by_value(
        &self,
        handle: &ElementHandle,
        _value: &str,
    ) -> Result<(), BrowserError> {
        let state = self.lock();
        Self::element(&state, handle)?;
        Ok(())
    }

    async fn scroll_by(&self, offset: i64) -> Result<(), BrowserError> {
        self.lock().scrolls.push(offset);
        Ok(())
    }

    async fn structural_path(&self, handle: &ElementHandle) -> Result<String, BrowserError> {
        let state = self.lock();
        Self::element(&state, handle)?;
        Ok(format!("/html[1]/body[1]/div[{}]", handle.0))
    }

    async fn console_logs(&self) -> Result<Vec<ConsoleEntry>, BrowserError> {
        Ok(self.lock().console_batches.pop_front().unwrap_or_default())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.lock().page_source.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn has_active_alert(&self) -> Result<bool, BrowserError> {
        Ok(self.lock().alert_active)
    }

    async fn accept_alert(&self) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.alert_active = false;
        state.alerts_accepted = state.alerts_accepted.saturating_add(1);
        Ok(())
    }

    async fn dismiss_alert(&self) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.alert_active = false;
        state.alerts_dismissed = state.alerts_dismissed.saturating_add(1);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.lock().closed = true;
        Ok(())
    }
}

/// Value generator that always suggests the same strings, so rendered
/// records are predictable.
#[derive(Debug)]
pub struct FixedValues;

#[async_trait]
impl ValueGenerator for FixedValues {
    async fn suggest(&self, _element_html: &str, kind: ValueKind) -> String {
        match kind {
            ValueKind::Text => "sample".to_owned(),
            ValueKind::Date => "2020-01-15".to_owned(),
        }
    }
}
