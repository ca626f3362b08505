use anyhow::{Context, Result};
use std::path::PathBuf;

use syllabus::analytics::SpreadAnalysis;
use syllabus::config::Config;
use syllabus::models::StudyPlan;
use syllabus::scheduler::{Planner, WeightMode};

pub struct DistributeParams {
    pub plan: PathBuf,
    pub limit: Option<usize>,
    pub weight_mode: Option<WeightMode>,
    pub output: Option<PathBuf>,
}

pub async fn distribute(mut config: Config, params: DistributeParams) -> Result<()> {
    let plan = StudyPlan::from_file(&params.plan)
        .with_context(|| format!("Failed to load plan: {}", params.plan.display()))?;

    if let Some(mode) = params.weight_mode {
        config.distribution.weight_mode = mode;
    }

    let planner = Planner::from_config(&config)?;
    let (backlog, distribution) = planner.distribute(&plan);
    let registry = backlog.registry();

    println!("Topic Distribution: {}", plan.name);
    println!("========================");
    println!(
        "Topics: {}  Rounds: {}  Refills: {}  Weight mode: {}",
        distribution.len(),
        distribution.rounds,
        distribution.refills,
        planner.distributor().weight_mode()
    );
    if distribution.capped {
        println!("Round cap reached, tail drained in queue order");
    }
    if !backlog.dropped().is_empty() {
        println!("Dropped rows: {}", backlog.dropped().len());
        for dropped in backlog.dropped() {
            println!("  row {}: {}", dropped.index, dropped.reason);
        }
    }
    println!();

    let shown = params.limit.unwrap_or(distribution.len());
    for (i, topic) in distribution.order.iter().take(shown).enumerate() {
        println!(
            "{:>4}. [{}] {} - {}",
            i + 1,
            topic.id,
            registry.name(topic.subject),
            topic.description
        );
    }
    if shown < distribution.len() {
        println!("  ... {} more", distribution.len() - shown);
    }

    println!("\nAllocations:");
    for allocation in &distribution.allocations {
        println!(
            "  {:<24} weight {:>4}  {:>4} topics  expected {:>5.1}%  actual {:>5.1}%",
            allocation.name,
            allocation.weight,
            allocation.topics,
            allocation.expected_share_pct,
            allocation.actual_share_pct
        );
    }

    let spread = SpreadAnalysis::analyze(registry, &distribution.subject_sequence());
    println!("\n{}", spread.display());

    if let Some(output) = params.output {
        let json = serde_json::to_string_pretty(&distribution)
            .context("Failed to serialize distribution")?;
        tokio::fs::write(&output, json)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Distribution written to {}", output.display());
    }

    Ok(())
}
