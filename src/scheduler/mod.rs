//! Study session scheduling
//!
//! This module turns a study plan (subjects with weights plus a topic backlog)
//! into an interleaved topic order and then into a dated study calendar.
//!
//! # Overview
//!
//! Topics are normalized once against a [`SubjectRegistry`], ordered by a
//! credit-based weighted round robin so that every prefix of the order tracks
//! the configured subject weights, and finally mapped onto study days with
//! weekday, Saturday-review and essay-Sunday rules.
//!
//! # Architecture
//!
//! ```text
//!  StudyPlan ──► SubjectRegistry ──► Backlog ──► slot check ──► WeightedDistributor
//!                                      │             │                  │
//!                                 dropped rows   final stretch     Distribution
//!                                                (or infeasible)        │
//!                                                                 CalendarMapper
//!                                                                       │
//!                                                                 StudySchedule ──► JSON file
//! ```
//!
//! # Modules
//!
//! - [`backlog`] - Subject registry and topic normalization
//! - [`weights`] - Weight clamping and the legacy scaled mode
//! - [`distributor`] - Credit-based weighted round robin
//! - [`calendar`] - Date mapping for new topics, reviews and essays
//! - [`final_stretch`] - Priority trimming of a backlog that no longer fits
//! - [`schedule`] - Dated schedule structures and persistence
//! - [`planner`] - End-to-end pipeline
//!
//! # Quick Start
//!
//! ```ignore
//! use syllabus::scheduler::Planner;
//! use syllabus::{Config, StudyPlan};
//!
//! let plan = StudyPlan::from_file("plans/sample_plan.toml".as_ref())?;
//! let planner = Planner::from_config(&Config::default())?;
//! let outcome = planner.plan(&plan, chrono::Local::now().date_naive())?;
//!
//! for session in &outcome.schedule.sessions {
//!     println!("{}", session.display());
//! }
//! ```
//!
//! # Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `weight_mode` | `direct` | `direct` or `legacy_scaled` (`w * 10 + 3`) |
//! | `round_cap_factor` | 2 | Round cap as a multiple of the topic count |
//! | `session_duration_minutes` | 50 | Length of one session |
//! | `review_offsets_days` | 7, 14, 28 | Spaced-repetition offsets |
//! | `essay_sundays` | false | Reserve Sundays for essay practice |
//! | `final_stretch` | false | Trim an oversized backlog by priority instead of failing |

pub mod backlog;
pub mod calendar;
pub mod distributor;
pub mod error;
pub mod final_stretch;
pub mod planner;
pub mod schedule;
pub mod weights;

// Re-export main types
pub use backlog::{Backlog, DropReason, DroppedTopic, SubjectRegistry};
pub use calendar::CalendarMapper;
pub use distributor::{DisciplineQueue, Distribution, Phase, SubjectAllocation, WeightedDistributor};
pub use error::{SchedulerError, SchedulerResult};
pub use final_stretch::ExcludedTopic;
pub use planner::{PlanOutcome, Planner};
pub use schedule::{ScheduleSummary, SessionKind, StudySchedule, StudySession};
pub use weights::{WeightMode, MIN_WEIGHT};
