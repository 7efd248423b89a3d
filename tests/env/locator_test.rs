//! Tests for the locator strategy ladder: identity attributes first,
//! content predicates next, structural path last.

use prowl::browser::ElementHandle;
use prowl::env::locator::{self, LocatorStrategy};

use crate::fake_browser::{FakeBrowser, FakeElement};

fn element() -> FakeElement {
    FakeElement::visible("a, button")
}

#[tokio::test]
async fn id_attribute_wins_over_everything_else() {
    let browser = FakeBrowser::new();
    browser.add_element(FakeElement {
        name_attr: Some("submit".to_owned()),
        text: "Submit order".to_owned(),
        ..element().with_id("checkout")
    });

    let locator = locator::resolve(&browser, &ElementHandle("0".to_owned()))
        .await
        .expect("resolve");

    assert_eq!(locator.strategy, LocatorStrategy::Id);
    assert_eq!(locator.xpath, "//*[@id='checkout']");
}

#[tokio::test]
async fn name_attribute_is_used_when_id_is_absent() {
    let browser = FakeBrowser::new();
    browser.add_element(FakeElement {
        name_attr: Some("query".to_owned()),
        ..element()
    });

    let locator = locator::resolve(&browser, &ElementHandle("0".to_owned()))
        .await
        .expect("resolve");

    assert_eq!(locator.strategy, LocatorStrategy::Name);
    assert_eq!(locator.xpath, "//*[@name='query']");
}

#[tokio::test]
async fn visible_text_becomes_a_contains_predicate() {
    let browser = FakeBrowser::new();
    browser.add_element(FakeElement {
        text: "  Submit order  ".to_owned(),
        ..element()
    });

    let locator = locator::resolve(&browser, &ElementHandle("0".to_owned()))
        .await
        .expect("resolve");

    assert_eq!(locator.strategy, LocatorStrategy::ContainsText);
    assert_eq!(locator.xpath, "//*[contains(text(), 'Submit order')]");
}

#[tokio::test]
async fn unembeddable_content_falls_back_to_the_structural_path() {
    let browser = FakeBrowser::new();
    // A single quote cannot sit inside a single-quoted XPath literal.
    browser.add_element(FakeElement {
        text: "it's complicated".to_owned(),
        ..element()
    });

    let locator = locator::resolve(&browser, &ElementHandle("0".to_owned()))
        .await
        .expect("resolve");

    assert_eq!(locator.strategy, LocatorStrategy::AbsolutePath);
    assert!(locator.xpath.starts_with("/html[1]/body[1]/"));
}
