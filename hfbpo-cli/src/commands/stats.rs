use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use hfbpo_core::{HfbpoConfig, RankedCombination};

use super::{open_service, print_json};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Number of combinations to show
    #[arg(short, default_value_t = 10)]
    pub n: usize,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: StatsArgs, config: &HfbpoConfig) -> Result<()> {
    let service = open_service(config).await?;
    let stats = service.stats(args.n).await;

    if args.json {
        return print_json(&stats);
    }

    if let Some(topic) = &stats.fixed_topic {
        println!("Fixed topic:  {topic} ({} arms)", stats.fixed_arm_count);
    }
    println!("Learned:      {} combinations", stats.learned_combinations);
    if let Some(path) = &stats.state_path {
        println!("State file:   {}", path.display());
    }
    if stats.degraded {
        println!("Warning: the last write to the state file failed");
    }
    println!();

    if stats.top.is_empty() {
        println!("No combinations learned yet.");
        return Ok(());
    }
    println!("{}", ranking_table(&stats.top));
    Ok(())
}

fn ranking_table(rows: &[RankedCombination]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Place").fg(Color::Cyan),
        Cell::new("Verb").fg(Color::Cyan),
        Cell::new("Scenario").fg(Color::Cyan),
        Cell::new("Mean").fg(Color::Cyan),
        Cell::new("Alpha").fg(Color::Cyan),
        Cell::new("Beta").fg(Color::Cyan),
    ]);

    for (rank, row) in rows.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&row.place),
            Cell::new(&row.verb),
            Cell::new(&row.scenario),
            Cell::new(format!("{:.3}", row.mean_reward)),
            Cell::new(format!("{:.2}", row.alpha)),
            Cell::new(format!("{:.2}", row.beta)),
        ]);
    }
    table
}
