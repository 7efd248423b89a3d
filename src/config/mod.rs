//! Configuration loading and management.
//!
//! Loads prowl configuration from `./prowl.toml` (or `$PROWL_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

// ── Top-level config ────────────────────────────────────────────

/// Top-level prowl configuration loaded from TOML.
///
/// Path: `./prowl.toml` or `$PROWL_CONFIG_PATH`.
/// Env vars override file values; file values override defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProwlConfig {
    /// Exploration loop settings (`[explore]`).
    pub explore: ExploreConfig,
    /// Filesystem paths for generated artifacts (`[paths]`).
    pub paths: PathsConfig,
    /// WebDriver endpoint settings (`[webdriver]`).
    pub webdriver: WebDriverConfig,
    /// Sample-value generator settings (`[generator]`).
    pub generator: GeneratorConfig,
}

impl ProwlConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$PROWL_CONFIG_PATH` or `./prowl.toml`.
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the config file exists but cannot be read
    /// or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file(None)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from an explicit file path, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let mut config = Self::load_from_file(Some(path.to_path_buf()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from the TOML file only, no env overrides.
    fn load_from_file(explicit: Option<PathBuf>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p,
            None => Self::config_path_with(|key| std::env::var(key).ok()),
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: ProwlConfig =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(ProwlConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(p) = env("PROWL_CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("prowl.toml")
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids `set_var` in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Exploration loop.
        if let Some(v) = env("PROWL_MAX_EPISODES") {
            match v.parse() {
                Ok(n) => self.explore.max_episodes = n,
                Err(_) => warn_invalid("PROWL_MAX_EPISODES", &v),
            }
        }
        if let Some(v) = env("PROWL_MAX_STEPS") {
            match v.parse() {
                Ok(n) => self.explore.max_steps = n,
                Err(_) => warn_invalid("PROWL_MAX_STEPS", &v),
            }
        }
        if let Some(v) = env("PROWL_SEED") {
            match v.parse() {
                Ok(n) => self.explore.seed = Some(n),
                Err(_) => warn_invalid("PROWL_SEED", &v),
            }
        }

        // Paths.
        if let Some(v) = env("PROWL_SCRIPTS_DIR") {
            self.paths.scripts_dir = v;
        }
        if let Some(v) = env("PROWL_MODELS_DIR") {
            self.paths.models_dir = v;
        }
        if let Some(v) = env("PROWL_LOGS_DIR") {
            self.paths.logs_dir = v;
        }

        // WebDriver.
        if let Some(v) = env("PROWL_WEBDRIVER_URL") {
            self.webdriver.base_url = v;
        }
        if let Some(v) = env("PROWL_WEBDRIVER_TIMEOUT_MS") {
            match v.parse() {
                Ok(n) => self.webdriver.request_timeout_ms = n,
                Err(_) => warn_invalid("PROWL_WEBDRIVER_TIMEOUT_MS", &v),
            }
        }
        if let Some(v) = env("PROWL_HEADLESS") {
            match v.parse() {
                Ok(b) => self.webdriver.headless = b,
                Err(_) => warn_invalid("PROWL_HEADLESS", &v),
            }
        }

        // Value generator (env var presence switches the mode).
        if let Some(v) = env("PROWL_GENERATOR_MODE") {
            match v.as_str() {
                "random" => self.generator.mode = GeneratorMode::Random,
                "llm" => self.generator.mode = GeneratorMode::Llm,
                _ => warn_invalid("PROWL_GENERATOR_MODE", &v),
            }
        }
        if let Some(v) = env("PROWL_LLM_URL") {
            self.generator.base_url = v;
        }
        if let Some(v) = env("PROWL_LLM_MODEL") {
            self.generator.model = v;
        }
        if let Some(v) = env("PROWL_LLM_API_KEY") {
            self.generator.api_key = Some(v);
        }
    }

    /// Parse a TOML string into config (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML does not parse into a valid config.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: ProwlConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

fn warn_invalid(var: &str, value: &str) {
    tracing::warn!(var, value = %value, "ignoring invalid env override");
}

// ── Exploration config ──────────────────────────────────────────

/// Exploration loop settings (`[explore]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    /// Number of training episodes, and of evaluation episodes after them.
    pub max_episodes: u32,
    /// Step budget per episode.
    pub max_steps: u32,
    /// Optional RNG seed for reproducible candidate selection.
    pub seed: Option<u64>,
    /// Vertical scroll offsets (pixels) the Scroll action draws from.
    pub scroll_offsets: Vec<i64>,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            max_episodes: 1,
            max_steps: 100,
            seed: None,
            scroll_offsets: vec![200, 400, 600],
        }
    }
}

// ── Paths config ────────────────────────────────────────────────

/// Filesystem paths for generated artifacts (`[paths]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for reproduction scripts and failure artifacts.
    pub scripts_dir: String,
    /// Directory for persisted policy state.
    pub models_dir: String,
    /// Directory for rotated JSON run logs.
    pub logs_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scripts_dir: "./generated-scripts".to_owned(),
            models_dir: "./models".to_owned(),
            logs_dir: "./logs".to_owned(),
        }
    }
}

// ── WebDriver config ────────────────────────────────────────────

/// WebDriver endpoint settings (`[webdriver]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Base URL of the WebDriver server (chromedriver).
    pub base_url: String,
    /// Per-request HTTP timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Whether to ask for a headless browser session.
    pub headless: bool,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9515".to_owned(),
            request_timeout_ms: 30_000,
            headless: false,
        }
    }
}

// ── Generator config ────────────────────────────────────────────

/// Sample-value source for text and date inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// Fixed random strings and dates.
    Random,
    /// Ask an OpenAI-compatible endpoint for a plausible value.
    Llm,
}

/// Sample-value generator settings (`[generator]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Which value source to use.
    pub mode: GeneratorMode,
    /// Chat-completions endpoint base URL (`llm` mode).
    pub base_url: String,
    /// Model identifier (`llm` mode).
    pub model: String,
    /// Optional bearer token (`llm` mode).
    pub api_key: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::Random,
            base_url: "http://127.0.0.1:11434/v1".to_owned(),
            model: "llama3".to_owned(),
            api_key: None,
        }
    }
}
