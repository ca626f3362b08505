use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

use syllabus::config::Config;
use syllabus::models::StudyPlan;
use syllabus::scheduler::Planner;

pub struct ScheduleParams {
    pub plan: PathBuf,
    pub start: Option<NaiveDate>,
    pub output: Option<PathBuf>,
    pub show_sessions: bool,
}

pub async fn schedule(config: Config, params: ScheduleParams) -> Result<()> {
    let mut plan = StudyPlan::from_file(&params.plan)
        .with_context(|| format!("Failed to load plan: {}", params.plan.display()))?;
    if params.start.is_some() {
        plan.start_date = params.start;
    }

    let planner = Planner::from_config(&config)?;
    let today = chrono::Local::now().date_naive();
    let outcome = planner.plan(&plan, today)?;

    println!("{}", outcome.schedule.summary().display());

    println!("New-topic sessions available: {}", outcome.slots);
    if !outcome.dropped.is_empty() {
        println!("Dropped rows: {}", outcome.dropped.len());
    }
    if !outcome.excluded.is_empty() {
        println!("Final stretch left out {} topic(s):", outcome.excluded.len());
        for entry in &outcome.excluded {
            println!(
                "  [{}] {} - {} (priority {})",
                entry.topic.id, entry.subject_name, entry.topic.description, entry.combined_priority
            );
        }
    }
    if let Some(last) = outcome.schedule.last_session_date() {
        println!("Last session: {last}");
    }

    if params.show_sessions {
        println!();
        for session in &outcome.schedule.sessions {
            println!("{}", session.display());
        }
    }

    if let Some(output) = params.output {
        outcome
            .schedule
            .save_to_file(&output)
            .await
            .with_context(|| format!("Failed to save schedule to {}", output.display()))?;
        tracing::info!(path = %output.display(), "Schedule saved");
        println!("\nSchedule saved to {}", output.display());
    }

    Ok(())
}
