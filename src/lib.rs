//! syllabus - Weighted study-session planning
//!
//! Turns a study plan (subjects with priority weights plus a topic backlog)
//! into an interleaved topic order and a dated study calendar ending on the
//! exam date.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`scheduler`] - Backlog normalization, weighted distribution, calendar mapping
//! - [`analytics`] - Weight conformance and spread quality reports
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use syllabus::config::Config;
//! use syllabus::models::StudyPlan;
//! use syllabus::scheduler::Planner;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let plan = StudyPlan::from_file("plans/sample_plan.toml".as_ref())?;
//!     let planner = Planner::from_config(&config)?;
//!     let outcome = planner.plan(&plan, chrono::Local::now().date_naive())?;
//!     println!("{}", outcome.schedule.summary().display());
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analytics::{ConformanceAnalyzer, ConformanceReport, SpreadAnalysis};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, SyllabusErrorTrait};
    pub use crate::models::{StudyPlan, SubjectId, SubjectSpec, Topic, TopicId, TopicRecord};
    pub use crate::scheduler::{
        Backlog, Distribution, Planner, StudySchedule, SubjectRegistry, WeightMode,
        WeightedDistributor,
    };
}

// Direct re-exports for convenience
pub use models::{StudyPlan, SubjectId, Topic, TopicId};
