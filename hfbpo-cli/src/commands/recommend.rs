use anyhow::Result;
use clap::Args;
use hfbpo_core::{HfbpoConfig, RetrievalConfig};

use super::{open_service, print_json};

#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// Topic to recommend for; optional when a fixed topic is configured
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Number of places to retrieve
    #[arg(long)]
    pub places: Option<usize>,

    /// Number of verbs to keep
    #[arg(long)]
    pub verbs: Option<usize>,

    /// Number of scenarios to keep
    #[arg(long)]
    pub scenarios: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl RecommendArgs {
    fn retrieval(&self, defaults: RetrievalConfig) -> RetrievalConfig {
        RetrievalConfig {
            top_k_places: self.places.unwrap_or(defaults.top_k_places),
            top_k_verbs: self.verbs.unwrap_or(defaults.top_k_verbs),
            top_k_scenarios: self.scenarios.unwrap_or(defaults.top_k_scenarios),
        }
    }
}

pub async fn run(args: RecommendArgs, config: &HfbpoConfig) -> Result<()> {
    let service = open_service(config).await?;
    let rec = service
        .recommend_with(args.topic.as_deref(), args.retrieval(config.retrieval))
        .await?;

    if args.json {
        return print_json(&rec);
    }

    let selection = &rec.selection;
    println!("Topic:     {}", rec.topic);
    println!("Place:     {}", selection.place);
    println!("Verb:      {}", selection.verb);
    println!("Scenario:  {}", selection.scenario);
    println!("Estimate:  {:.3}", selection.estimated_reward);
    println!("Arms:      {}", selection.candidates_count);
    match &selection.key {
        Some(key) => println!("Key:       {key}"),
        None => {
            println!("Key:       (fallback, not rewardable)");
            if let Some(reason) = &rec.degraded_reason {
                println!("Reason:    {reason}");
            }
        }
    }
    Ok(())
}
