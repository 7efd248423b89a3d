//! prowl binary: point it at a URL and let it hunt for crashes.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use prowl::browser::webdriver::WebDriverSession;
use prowl::config::{GeneratorMode, ProwlConfig};
use prowl::env::WebAppEnv;
use prowl::generator::llm::LlmValueGenerator;
use prowl::generator::{RandomValues, ValueGenerator};
use prowl::policy::QLearningPolicy;
use prowl::{logging, runner};

/// Exploratory failure hunting for web applications.
#[derive(Debug, Parser)]
#[command(name = "prowl", version, about)]
struct Cli {
    /// Target URL to explore; prompted for on stdin when omitted.
    url: Option<String>,

    /// Number of training episodes (evaluation runs the same number).
    #[arg(long)]
    episodes: Option<u32>,

    /// Step budget per episode.
    #[arg(long = "max-steps")]
    max_steps: Option<u32>,

    /// Explicit config file path (default: ./prowl.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ProwlConfig::load_from(path)?,
        None => ProwlConfig::load()?,
    };
    if let Some(n) = cli.episodes {
        config.explore.max_episodes = n;
    }
    if let Some(n) = cli.max_steps {
        config.explore.max_steps = n;
    }

    let _logging_guard = logging::init_run(Path::new(&config.paths.logs_dir))?;

    let target = match cli.url {
        Some(url) => url,
        None => prompt_for_url()?,
    };
    url::Url::parse(&target).with_context(|| format!("invalid target URL `{target}`"))?;

    let scripts_dir = PathBuf::from(&config.paths.scripts_dir);
    std::fs::create_dir_all(&scripts_dir)
        .with_context(|| format!("failed to create scripts directory {}", scripts_dir.display()))?;
    let models_dir = PathBuf::from(&config.paths.models_dir);
    std::fs::create_dir_all(&models_dir)
        .with_context(|| format!("failed to create models directory {}", models_dir.display()))?;

    let session = WebDriverSession::connect(&config.webdriver)
        .await
        .context("failed to start a WebDriver session (is chromedriver running?)")?;

    let generator: Box<dyn ValueGenerator> = match config.generator.mode {
        GeneratorMode::Random => Box::new(RandomValues),
        GeneratorMode::Llm => Box::new(LlmValueGenerator::new(&config.generator)),
    };

    let mut env = WebAppEnv::new(
        Box::new(session),
        generator,
        &config.explore,
        scripts_dir,
        &target,
    )?;

    let model_path = models_dir.join("qtable.json");
    let mut policy =
        QLearningPolicy::load_or_new(&model_path, config.explore.max_steps, config.explore.seed);

    info!(
        target = %target,
        episodes = config.explore.max_episodes,
        max_steps = config.explore.max_steps,
        "starting exploration run"
    );

    let run_result = runner::run(
        &mut env,
        &mut policy,
        config.explore.max_episodes,
        &model_path,
    )
    .await;
    let close_result = env.close().await;

    let summary = run_result?;
    close_result.context("failed to tear down the browser session")?;

    info!(
        episodes = summary.episodes.len(),
        failures = summary.failures,
        "exploration run finished"
    );
    Ok(())
}

/// Interactive fallback when no URL argument was given.
fn prompt_for_url() -> anyhow::Result<String> {
    eprint!("Target URL: ");
    let _ = std::io::stderr().flush();

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read target URL from stdin")?;
    let url = line.trim().to_owned();
    anyhow::ensure!(!url.is_empty(), "no target URL provided");
    Ok(url)
}
