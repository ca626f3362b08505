use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use syllabus::config::Config;
use syllabus::error::classify;
use syllabus::scheduler::WeightMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "syllabus",
    version,
    about = "Weighted study-session distribution and calendar planning",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Order a plan's pending topics by weighted round robin
    Distribute {
        /// Study plan file (.toml or .json)
        plan: PathBuf,

        /// Only print the first N topics
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override the configured weight mode (direct, legacy_scaled)
        #[arg(long)]
        weight_mode: Option<WeightMode>,

        /// Write the distribution as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a dated study schedule up to the exam date
    Schedule {
        /// Study plan file (.toml or .json)
        plan: PathBuf,

        /// Start date (YYYY-MM-DD), overrides the plan's start date
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Save the schedule as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every session
        #[arg(long, default_value = "false")]
        show_sessions: bool,
    },

    /// Check subject shares against configured weights
    Analyze {
        /// Study plan file (.toml or .json)
        plan: PathBuf,

        /// Saved schedule JSON to audit instead of a fresh distribution
        #[arg(short, long)]
        schedule: Option<PathBuf>,

        /// Only count the first N sessions
        #[arg(short, long)]
        window: Option<usize>,

        /// Allowed deviation in percentage points
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Exit with an error when a subject is outside the tolerance
        #[arg(long, default_value = "false")]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("syllabus starting");

    if let Err(err) = run(cli.command, config).await {
        let (category, recoverable) = classify(&err);
        tracing::error!(
            category = %category,
            recoverable,
            error = %format!("{err:#}"),
            "Command failed"
        );
        return Err(err);
    }

    tracing::info!("syllabus completed successfully");
    Ok(())
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Distribute {
            plan,
            limit,
            weight_mode,
            output,
        } => {
            tracing::info!(
                plan = %plan.display(),
                limit = ?limit,
                weight_mode = ?weight_mode,
                "Starting distribute command"
            );
            commands::distribute(
                config,
                commands::DistributeParams {
                    plan,
                    limit,
                    weight_mode,
                    output,
                },
            )
            .await?;
        }

        Commands::Schedule {
            plan,
            start,
            output,
            show_sessions,
        } => {
            tracing::info!(
                plan = %plan.display(),
                start = ?start,
                output = ?output,
                "Starting schedule command"
            );
            commands::schedule(
                config,
                commands::ScheduleParams {
                    plan,
                    start,
                    output,
                    show_sessions,
                },
            )
            .await?;
        }

        Commands::Analyze {
            plan,
            schedule,
            window,
            tolerance,
            strict,
        } => {
            tracing::info!(
                plan = %plan.display(),
                schedule = ?schedule,
                window = ?window,
                tolerance = ?tolerance,
                strict = %strict,
                "Starting analyze command"
            );
            commands::analyze(
                config,
                commands::AnalyzeParams {
                    plan,
                    schedule,
                    window,
                    tolerance,
                    strict,
                },
            )
            .await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("syllabus=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("syllabus={level},warn")))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
