//! EventLink CLI
//!
//! Runs the on-device inference engine against local artifacts and prints
//! JSON results.

use anyhow::{Context, Result};
use clap::Parser;
use eventlink_inference::{describe_metrics, Engine, EngineConfig};
use serde::Serialize;
use tracing::{debug, info};

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    describe_metrics();

    let config = load_config(&cli)?;
    debug!(
        "Intent model: {}, recommender: {}",
        config.intent.model_path.display(),
        config.recommender.model_path.display()
    );
    let engine = Engine::new(config).context("Failed to configure engine")?;

    match cli.command {
        Commands::Classify {
            text,
            gated,
            threshold,
        } => {
            let prediction = if gated || threshold.is_some() {
                engine.classify_gated(&text, threshold)?
            } else {
                engine.classify(&text)?
            };
            print_json(&prediction)
        }
        Commands::Evaluate { text } => print_json(&engine.evaluate(&text)?),
        Commands::Recommend {
            interest,
            top_k,
            strict,
        } => {
            let top_k = top_k.unwrap_or(engine.config().recommender.top_k);
            let strict = strict || engine.config().recommender.strict_category;
            print_json(&engine.recommend(&interest, top_k, strict)?)
        }
        Commands::Labels => print_json(&engine.labels()?),
    }
}

/// Config file (or defaults) with command-line overrides applied
fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = EngineConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            info!("Configuration loaded from {}", path.display());
            config
        }
        None => EngineConfig::default(),
    };

    if let Some(path) = &cli.intent_model {
        config.intent.model_path = path.clone();
    }
    if let Some(path) = &cli.thresholds {
        config.intent.thresholds_path = Some(path.clone());
    }
    if let Some(path) = &cli.events_model {
        config.recommender.model_path = path.clone();
    }

    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing subscriber
///
/// Logs go to stderr so stdout stays valid JSON.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("eventlink=debug,eventlink_inference=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("eventlink=info,eventlink_inference=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
