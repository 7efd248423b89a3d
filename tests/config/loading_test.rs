//! Tests for config parsing, defaults, and env-override precedence.

use prowl::config::{GeneratorMode, ProwlConfig};

#[test]
fn defaults_are_usable_without_a_file() {
    let config = ProwlConfig::default();
    assert_eq!(config.explore.max_episodes, 1);
    assert_eq!(config.explore.max_steps, 100);
    assert_eq!(config.explore.scroll_offsets, vec![200, 400, 600]);
    assert_eq!(config.webdriver.base_url, "http://127.0.0.1:9515");
    assert_eq!(config.generator.mode, GeneratorMode::Random);
}

#[test]
fn toml_values_override_defaults() {
    let config = ProwlConfig::from_toml(
        r#"
        [explore]
        max_episodes = 3
        max_steps = 25
        seed = 42

        [paths]
        scripts_dir = "/tmp/scripts"

        [webdriver]
        base_url = "http://10.0.0.2:4444"
        headless = true

        [generator]
        mode = "llm"
        model = "qwen2"
        "#,
    )
    .expect("parse config");

    assert_eq!(config.explore.max_episodes, 3);
    assert_eq!(config.explore.max_steps, 25);
    assert_eq!(config.explore.seed, Some(42));
    assert_eq!(config.paths.scripts_dir, "/tmp/scripts");
    assert_eq!(config.webdriver.base_url, "http://10.0.0.2:4444");
    assert!(config.webdriver.headless);
    assert_eq!(config.generator.mode, GeneratorMode::Llm);
    assert_eq!(config.generator.model, "qwen2");
    // Untouched sections keep their defaults.
    assert_eq!(config.paths.models_dir, "./models");
}

#[test]
fn env_overrides_beat_file_values() {
    let mut config = ProwlConfig::from_toml(
        r#"
        [explore]
        max_steps = 25
        "#,
    )
    .expect("parse config");

    config.apply_overrides(|key| match key {
        "PROWL_MAX_STEPS" => Some("7".to_owned()),
        "PROWL_HEADLESS" => Some("true".to_owned()),
        "PROWL_GENERATOR_MODE" => Some("llm".to_owned()),
        _ => None,
    });

    assert_eq!(config.explore.max_steps, 7);
    assert!(config.webdriver.headless);
    assert_eq!(config.generator.mode, GeneratorMode::Llm);
}

#[test]
fn invalid_env_values_are_ignored() {
    let mut config = ProwlConfig::default();

    config.apply_overrides(|key| match key {
        "PROWL_MAX_STEPS" => Some("not-a-number".to_owned()),
        "PROWL_GENERATOR_MODE" => Some("psychic".to_owned()),
        _ => None,
    });

    assert_eq!(config.explore.max_steps, 100);
    assert_eq!(config.generator.mode, GeneratorMode::Random);
}

#[test]
fn malformed_toml_is_an_error() {
    assert!(ProwlConfig::from_toml("[explore\nmax_steps = ").is_err());
}
