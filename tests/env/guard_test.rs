//! Tests for domain containment: exploration never wanders off the origin
//! captured at episode start.

use std::path::Path;

use prowl::config::ExploreConfig;
use prowl::env::WebAppEnv;
use prowl::script::Dialect;

use crate::fake_browser::{FakeBrowser, FakeElement, FixedValues};

const ENTRY_URL: &str = "https://app.test/start";

fn make_env(browser: &FakeBrowser, scripts_dir: &Path) -> WebAppEnv {
    let explore = ExploreConfig {
        max_episodes: 1,
        max_steps: 10,
        seed: Some(7),
        scroll_offsets: vec![200],
    };
    WebAppEnv::new(
        Box::new(browser.clone()),
        Box::new(FixedValues),
        &explore,
        scripts_dir.to_path_buf(),
        ENTRY_URL,
    )
    .expect("environment")
}

#[tokio::test]
async fn off_origin_page_is_steered_back_as_a_whole_step() {
    let browser = FakeBrowser::new();
    browser.add_element(FakeElement::visible("a, button").with_id("go"));
    let dir = tempfile::tempdir().expect("temp dir");
    let mut env = make_env(&browser, dir.path());
    env.reset().await.expect("reset");

    browser.set_current_url("https://elsewhere.test/landing");
    let result = env.step(0).await.expect("contained step");

    assert!(result.info.containment);
    assert!(!result.info.applied);
    assert!(!result.done);
    assert_eq!(result.observation.step, 1);

    // No interaction happened; the step was spent returning home.
    assert!(browser.clicks().is_empty());
    assert_eq!(
        browser.navigations(),
        vec![ENTRY_URL.to_owned(), ENTRY_URL.to_owned()]
    );

    let log = env.action_log();
    assert_eq!(log.len(), 2);
    assert_eq!(
        log.lines(Dialect::Selenium)[1],
        format!("driver.get('{ENTRY_URL}')")
    );
}

#[tokio::test]
async fn same_host_navigation_is_not_contained() {
    let browser = FakeBrowser::new();
    let dir = tempfile::tempdir().expect("temp dir");
    let mut env = make_env(&browser, dir.path());
    env.reset().await.expect("reset");

    browser.set_current_url("https://app.test/deep/page?q=1");
    let result = env.step(2).await.expect("step");

    assert!(!result.info.containment);
    assert_eq!(browser.navigations().len(), 1);
}

#[tokio::test]
async fn click_that_leaves_the_origin_is_contained_on_the_next_step() {
    let browser = FakeBrowser::new();
    browser.add_element(
        FakeElement::visible("a, button")
            .with_id("external")
            .navigating_to("https://ads.test/click"),
    );
    let dir = tempfile::tempdir().expect("temp dir");
    let mut env = make_env(&browser, dir.path());
    env.reset().await.expect("reset");

    let clicked = env.step(0).await.expect("click step");
    assert!(clicked.info.applied);

    let contained = env.step(0).await.expect("containment step");
    assert!(contained.info.containment);
    assert_eq!(
        browser.current_url_snapshot(),
        ENTRY_URL.to_owned()
    );
    assert_eq!(env.origin(), "app.test");
}

#[tokio::test]
async fn unparseable_current_url_counts_as_off_origin() {
    let browser = FakeBrowser::new();
    let dir = tempfile::tempdir().expect("temp dir");
    let mut env = make_env(&browser, dir.path());
    env.reset().await.expect("reset");

    browser.set_current_url("about:blank");
    let result = env.step(2).await.expect("step");

    assert!(result.info.containment);
}
