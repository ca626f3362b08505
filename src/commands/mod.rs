pub mod analyze;
pub mod distribute;
pub mod schedule;

// Re-export command functions for convenience
pub use analyze::{analyze, AnalyzeParams};
pub use distribute::{distribute, DistributeParams};
pub use schedule::{schedule, ScheduleParams};
