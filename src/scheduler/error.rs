//! Error types for the scheduler module

use chrono::NaiveDate;
use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Two subjects registered under the same name
    DuplicateSubject {
        name: String,
    },

    /// More pending topics than new-topic slots before the exam
    InfeasiblePlan {
        topics: usize,
        slots: usize,
    },

    /// Exam date falls before the start date
    InvalidDateRange {
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Session duration must be positive
    InvalidSessionDuration {
        minutes: u32,
    },

    /// Calendar configuration error
    InvalidCalendar {
        field: String,
        reason: String,
    },

    /// Serialization/deserialization error
    SerializationError {
        reason: String,
    },

    /// IO error
    IoError {
        operation: String,
        reason: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSubject { name } => {
                write!(f, "Subject '{}' is registered more than once", name)
            }
            Self::InfeasiblePlan { topics, slots } => write!(
                f,
                "Infeasible plan: {} pending topics for only {} new-topic sessions. \
                 Enable final_stretch to keep the highest-priority topics",
                topics, slots
            ),
            Self::InvalidDateRange { start, end } => {
                write!(f, "Invalid date range: exam date {} is before start date {}", end, start)
            }
            Self::InvalidSessionDuration { minutes } => {
                write!(f, "Invalid session duration '{}' minutes. Must be greater than 0", minutes)
            }
            Self::InvalidCalendar { field, reason } => {
                write!(f, "Calendar config error in '{}': {}", field, reason)
            }
            Self::SerializationError { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
            Self::IoError { operation, reason } => {
                write!(f, "IO error during '{}': {}", operation, reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            operation: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl SchedulerError {
    /// Create a duplicate subject error
    pub fn duplicate_subject(name: impl Into<String>) -> Self {
        Self::DuplicateSubject { name: name.into() }
    }

    /// Create an infeasible plan error
    pub fn infeasible_plan(topics: usize, slots: usize) -> Self {
        Self::InfeasiblePlan { topics, slots }
    }

    /// Create an invalid date range error
    pub fn invalid_date_range(start: NaiveDate, end: NaiveDate) -> Self {
        Self::InvalidDateRange { start, end }
    }

    /// Create a calendar config error
    pub fn invalid_calendar(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCalendar {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an IO error with context
    pub fn io_error(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IoError {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::IoError { .. })
    }
}
