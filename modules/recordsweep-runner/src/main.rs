use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use recordsweep_common::Config;
use recordsweep_engine::{Engine, EngineLimits};
use recordsweep_runner::batch::Sweeper;
use recordsweep_runner::input::load_targets;
use recordsweep_runner::portal::{PortalProvider, WaitPolicy};
use recordsweep_runner::profiles;
use recordsweep_runner::sink::{CsvSink, JsonSink, ResultSink};
use webdriver_client::WebDriverClient;

#[derive(Parser)]
#[command(name = "recordsweep", about = "Batch name lookups against county record portals")]
struct Cli {
    /// Spreadsheet of names to look up (.csv or .xlsx with a `Name` column)
    #[arg(long)]
    input: PathBuf,

    /// Where to write the combined results
    #[arg(long)]
    output: PathBuf,

    /// Built-in site profile to run against
    #[arg(long, default_value = "broward-recorder")]
    site: String,

    /// JSON site profile file; takes precedence over --site
    #[arg(long)]
    profile_file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("recordsweep=info".parse()?))
        .init();

    info!("Record sweep starting...");

    let cli = Cli::parse();

    // Load config
    let config = Config::from_env();

    // Resolve the site profile
    let profile = match &cli.profile_file {
        Some(path) => profiles::load_profile(path)?,
        None => profiles::builtin_profile(&cli.site).with_context(|| {
            format!(
                "Unknown site {:?} (built-ins: {})",
                cli.site,
                profiles::builtin_ids().join(", ")
            )
        })?,
    };
    profile.validate().context("Unusable site profile")?;

    // Load targets
    let (targets, invalid_skipped) = load_targets(&cli.input)?;
    if targets.is_empty() {
        bail!("No valid names in {}", cli.input.display());
    }
    info!(
        targets = targets.len(),
        invalid_skipped,
        site = profile.id.as_str(),
        "Input loaded"
    );

    // Check the driver endpoint before burning through the batch
    let client = WebDriverClient::new(&config.webdriver_url);
    if !client
        .ready()
        .await
        .context("WebDriver endpoint unreachable")?
    {
        bail!(
            "WebDriver at {} is not ready for new sessions",
            config.webdriver_url
        );
    }

    // Run the sweep
    let schema = profile.schema();
    let limits = EngineLimits {
        max_pages: config.max_pages,
        target_budget: config.target_budget,
    };
    let waits = WaitPolicy::from_config(&config);
    let provider = PortalProvider::new(client, profile, waits);
    let sweeper = Sweeper::new(Engine::new(limits), Box::new(provider));

    let (results, mut stats) = sweeper.run(&targets).await;
    stats.invalid_skipped = invalid_skipped;

    // Write results
    let mut sink: Box<dyn ResultSink> = match cli.format {
        Format::Csv => Box::new(CsvSink::new(&cli.output)),
        Format::Json => Box::new(JsonSink::new(&cli.output)),
    };
    sink.write(&schema, &results)
        .context("Failed to write results")?;

    info!(output = %cli.output.display(), "Results written. {stats}");

    Ok(())
}
