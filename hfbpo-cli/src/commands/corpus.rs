use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use hfbpo_core::{Corpus, CorpusBuilder, HfbpoConfig};
use tracing::info;

use super::{embedder, print_json};

#[derive(Args, Debug)]
pub struct CorpusArgs {
    #[command(subcommand)]
    pub command: CorpusCommands,
}

#[derive(Subcommand, Debug)]
pub enum CorpusCommands {
    /// Build corpus artifacts from JSON Lines observations
    Build {
        /// Observation file, one {"places", "verbs", "scenarios"} object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory; defaults to the configured corpus directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Load a corpus and print its summary
    Info {
        /// Corpus directory; defaults to the configured one
        dir: Option<PathBuf>,
    },
}

pub async fn run(args: CorpusArgs, config: &HfbpoConfig) -> Result<()> {
    match args.command {
        CorpusCommands::Build { input, out } => {
            build(input, out.unwrap_or_else(|| config.corpus_dir.clone()), config).await
        }
        CorpusCommands::Info { dir } => {
            let dir = dir.unwrap_or_else(|| config.corpus_dir.clone());
            let corpus = Corpus::load(&dir)
                .await
                .with_context(|| format!("Failed to load corpus from {}", dir.display()))?;
            print_json(&corpus.info())
        }
    }
}

async fn build(input: PathBuf, out: PathBuf, config: &HfbpoConfig) -> Result<()> {
    let file =
        File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?;

    let mut builder = CorpusBuilder::new();
    let stats = builder.read_jsonl(BufReader::new(file))?;
    info!(
        rows = stats.rows,
        accepted = stats.accepted,
        skipped = stats.skipped,
        "Read observations"
    );
    if stats.accepted == 0 {
        bail!("No usable observations in {}", input.display());
    }

    let embedder = embedder(config)?;
    let summary = builder.write_to(&out, embedder.as_ref()).await?;
    println!("Corpus written to {}", out.display());
    print_json(&summary)
}
