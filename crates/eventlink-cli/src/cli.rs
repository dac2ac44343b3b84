use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eventlink")]
#[command(
    author,
    version,
    about = "On-device intent classification and event recommendation"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Engine configuration file (YAML)
    #[arg(short, long, env = "EVENTLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Intent model artifact, overrides the config file
    #[arg(long, global = true)]
    pub intent_model: Option<PathBuf>,

    /// Per-class thresholds file, overrides the config file
    #[arg(long, global = true)]
    pub thresholds: Option<PathBuf>,

    /// Recommender artifact, overrides the config file
    #[arg(long, global = true)]
    pub events_model: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a message with the intent model
    Classify {
        /// Message text
        text: String,

        /// Apply the confidence gate
        #[arg(short, long)]
        gated: bool,

        /// Default threshold for the gate (implies --gated)
        #[arg(short, long, value_parser = parse_probability)]
        threshold: Option<f64>,
    },

    /// Run rules, gate and guardrails on a message
    Evaluate {
        /// Message text
        text: String,
    },

    /// Recommend events for an interest
    Recommend {
        /// Interest or category query
        interest: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Require an exact category match
        #[arg(short, long)]
        strict: bool,
    },

    /// List the intent model's class labels
    Labels,
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("not a number: {}", e))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} is outside [0, 1]", value))
    }
}
