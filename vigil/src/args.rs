use std::path::PathBuf;

use clap::Parser;

/// Vigil completion contract harness
#[derive(Debug, Parser)]
#[command(name = "vigil", about = "Check chat-completion clients against the completion contract")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "vigil.toml", env = "VIGIL_CONFIG")]
    pub config: PathBuf,

    /// Only run these models (repeatable)
    #[arg(short, long = "model")]
    pub models: Vec<String>,

    /// Only run cases whose name contains this text (e.g. `stop[`, `image`)
    #[arg(long)]
    pub case: Option<String>,

    /// Log full responses
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the number of cases run at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}
