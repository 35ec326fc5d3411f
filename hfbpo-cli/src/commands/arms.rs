use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use hfbpo_core::{ArmListing, HfbpoConfig};

use super::{open_service, print_json};

#[derive(Args, Debug)]
pub struct ArmsArgs {
    /// Topic to list arms for; ignored when a fixed topic is configured
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ArmsArgs, config: &HfbpoConfig) -> Result<()> {
    let service = open_service(config).await?;
    let listing = service.arms(args.topic.as_deref()).await?;

    if args.json {
        return print_json(&listing);
    }

    let mode = if listing.fixed_arms { "fixed" } else { "dynamic" };
    println!("Topic:      {} ({mode})", listing.topic);
    println!("Places:     {}", listing.places.join(", "));
    println!("Verbs:      {}", listing.verbs.join(", "));
    println!("Scenarios:  {}", listing.scenarios.join(", "));
    println!();

    if listing.arms.is_empty() {
        println!("No arms: one of the shortlists is empty.");
        return Ok(());
    }
    println!("{}", arms_table(&listing));
    Ok(())
}

fn arms_table(listing: &ArmListing) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Key").fg(Color::Cyan),
        Cell::new("Mean").fg(Color::Cyan),
        Cell::new("Alpha").fg(Color::Cyan),
        Cell::new("Beta").fg(Color::Cyan),
    ]);

    for arm in &listing.arms {
        let key = if arm.registered {
            Cell::new(&arm.key)
        } else {
            Cell::new(format!("{} (new)", arm.key)).fg(Color::DarkGrey)
        };
        table.add_row(vec![
            key,
            Cell::new(format!("{:.3}", arm.mean_reward)),
            Cell::new(format!("{:.2}", arm.alpha)),
            Cell::new(format!("{:.2}", arm.beta)),
        ]);
    }
    table
}
