use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use hfbpo_core::HfbpoConfig;

use crate::config::{ConfigLoader, FIXED_TOPIC_ENV};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration and data file paths
    Path,
}

pub fn run(args: ConfigArgs, config: &HfbpoConfig, explicit: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(config),
        ConfigCommands::Path => show_paths(config, explicit),
    }
}

fn show_config(config: &HfbpoConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths(config: &HfbpoConfig, explicit: Option<&Path>) -> Result<()> {
    match explicit {
        Some(path) => println!("Config file:    {}", path.display()),
        None => {
            println!("User config:    {}", ConfigLoader::user_config_path().display());
            println!("Project config: {}", ConfigLoader::project_config_path().display());
        }
    }
    println!("Corpus dir:     {}", config.corpus_dir.display());
    println!("State file:     {}", config.state_path.display());
    println!("Env override:   {FIXED_TOPIC_ENV}");
    Ok(())
}
