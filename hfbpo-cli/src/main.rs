use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "hfbpo", about = "Topic-aware modifier recommendation")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from this file instead of the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend a place, verb and scenario for a topic
    Recommend(commands::recommend::RecommendArgs),
    /// Feed engagement back for a recommended combination
    Reward(commands::reward::RewardArgs),
    /// Show learned combinations ranked by expected reward
    Stats(commands::stats::StatsArgs),
    /// List the candidate arms for a topic
    Arms(commands::arms::ArmsArgs),
    /// Build corpus artifacts offline
    Corpus(commands::corpus::CorpusArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Recommend(args) => commands::recommend::run(args, &config).await,
        Commands::Reward(args) => commands::reward::run(args, &config).await,
        Commands::Stats(args) => commands::stats::run(args, &config).await,
        Commands::Arms(args) => commands::arms::run(args, &config).await,
        Commands::Corpus(args) => commands::corpus::run(args, &config).await,
        Commands::Config(args) => commands::config::run(args, &config, cli.config.as_deref()),
    }
}
