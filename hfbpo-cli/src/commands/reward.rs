use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use hfbpo_core::{
    Durability, EngagementMetrics, HfbpoConfig, RewardRequest, UpdateOutcome,
};
use serde::de::DeserializeOwned;

use super::{open_service, print_json};

#[derive(Args, Debug)]
pub struct RewardArgs {
    /// Combination key as place|verb|scenario
    #[arg(required_unless_present = "batch", conflicts_with = "batch")]
    pub key: Option<String>,

    /// Reward in [0, 1]; values outside are clamped
    #[arg(
        allow_negative_numbers = true,
        required_unless_present_any = ["metrics", "batch"],
        conflicts_with_all = ["metrics", "batch"]
    )]
    pub value: Option<f64>,

    /// JSON file of raw engagement metrics, scored by the configured policy
    #[arg(long, conflicts_with = "batch")]
    pub metrics: Option<PathBuf>,

    /// JSON file with an array of {"key", "reward"} entries
    #[arg(long)]
    pub batch: Option<PathBuf>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub async fn run(args: RewardArgs, config: &HfbpoConfig) -> Result<()> {
    let service = open_service(config).await?;

    if let Some(path) = &args.batch {
        let requests: Vec<RewardRequest> = read_json(path)?;
        let summary = service.apply_rewards(&requests).await;
        return print_json(&summary);
    }

    let Some(key) = args.key.as_deref() else {
        bail!("A combination key is required");
    };
    let outcome = match (&args.metrics, args.value) {
        (Some(path), _) => {
            let metrics: EngagementMetrics = read_json(path)?;
            service.apply_metrics(key, &metrics).await?
        }
        (None, Some(value)) => service.apply_reward(key, value).await?,
        (None, None) => bail!("Either a reward value or --metrics is required"),
    };

    report(&outcome);
    print_json(&outcome)
}

fn report(outcome: &UpdateOutcome) {
    if !outcome.applied {
        eprintln!("Combination '{}' is unknown; nothing was updated", outcome.key);
        return;
    }
    if let Durability::MemoryOnly { reason } = &outcome.durability {
        eprintln!("Warning: reward applied but not persisted: {reason}");
    }
}
