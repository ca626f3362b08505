use anyhow::{Context, Result};
use std::path::PathBuf;

use syllabus::analytics::{ConformanceAnalyzer, SpreadAnalysis};
use syllabus::config::Config;
use syllabus::models::StudyPlan;
use syllabus::scheduler::{Planner, StudySchedule};

pub struct AnalyzeParams {
    pub plan: PathBuf,
    /// Saved schedule to audit; the plan is distributed afresh when absent
    pub schedule: Option<PathBuf>,
    pub window: Option<usize>,
    pub tolerance: Option<f64>,
    pub strict: bool,
}

pub async fn analyze(mut config: Config, params: AnalyzeParams) -> Result<()> {
    let plan = StudyPlan::from_file(&params.plan)
        .with_context(|| format!("Failed to load plan: {}", params.plan.display()))?;

    if let Some(tolerance) = params.tolerance {
        config.analysis.tolerance_pct = tolerance;
    }
    if params.window.is_some() {
        config.analysis.window = params.window;
    }

    let analyzer =
        ConformanceAnalyzer::from_config(&config.analysis, config.distribution.weight_mode)?;
    let backlog = Planner::backlog(&plan);
    let registry = backlog.registry();

    let (report, sequence) = match &params.schedule {
        Some(path) => {
            let schedule = StudySchedule::load_from_file(path)
                .await
                .with_context(|| format!("Failed to load schedule: {}", path.display()))?;
            println!("Auditing saved schedule: {}", path.display());
            let sequence = schedule.new_topic_subjects(registry);
            (analyzer.analyze_sequence(registry, &sequence), sequence)
        }
        None => {
            let planner = Planner::from_config(&config)?;
            let distribution = planner.distributor().distribute(&backlog);
            println!("Auditing fresh distribution of: {}", plan.name);
            (
                analyzer.analyze_distribution(registry, &distribution),
                distribution.subject_sequence(),
            )
        }
    };

    // spread covers the same prefix the conformance counts come from
    let window = config
        .analysis
        .window
        .map_or(sequence.len(), |w| w.min(sequence.len()));
    println!("{}", report.display());
    println!(
        "{}",
        SpreadAnalysis::analyze(registry, &sequence[..window]).display()
    );

    if params.strict && !report.is_conformant() {
        anyhow::bail!(
            "{} subject(s) outside the {:.1}pp tolerance",
            report.flagged().len(),
            report.tolerance_pct
        );
    }

    Ok(())
}
