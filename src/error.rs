//! Unified error handling for the syllabus crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors usable on their own.
//!
//! # Architecture
//!
//! - [`SyllabusErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//! - [`classify`] - Category of an `anyhow` error chain, used at the CLI exit
//!
//! # Usage
//!
//! ```rust,ignore
//! use syllabus::error::classify;
//!
//! if let Err(err) = run().await {
//!     let (category, recoverable) = classify(&err);
//!     tracing::error!(category = %category, recoverable, "Command failed");
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

pub use crate::analytics::conformance::AnalysisError;
pub use crate::scheduler::error::SchedulerError;

/// Common trait for syllabus error types
pub trait SyllabusErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed plan files or unparsable input
    Input,
    /// Distribution and calendar mapping errors
    Scheduler,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Scheduler => "scheduler",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the syllabus crate
#[derive(Error, Debug)]
pub enum Error {
    /// Scheduler and calendar errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Conformance analysis parameter errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl SyllabusErrorTrait for SchedulerError {
    fn is_recoverable(&self) -> bool {
        SchedulerError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError { .. } => ErrorCategory::Storage,
            Self::SerializationError { .. } => ErrorCategory::Input,
            Self::InvalidSessionDuration { .. } | Self::InvalidCalendar { .. } => {
                ErrorCategory::Config
            }
            _ => ErrorCategory::Scheduler,
        }
    }
}

impl SyllabusErrorTrait for AnalysisError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Config
    }
}

impl SyllabusErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Scheduler(e) => SyllabusErrorTrait::is_recoverable(e),
            Self::Analysis(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Json(_) | Self::Toml(_) => false,
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Scheduler(e) => e.category(),
            Self::Analysis(e) => e.category(),
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::Toml(_) => ErrorCategory::Input,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Category and recoverability of the first known error in an `anyhow` chain
///
/// Errors raised by `anyhow::bail!` alone classify as `(Other, false)`.
pub fn classify(err: &anyhow::Error) -> (ErrorCategory, bool) {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<Error>() {
            return (e.category(), e.is_recoverable());
        }
        if let Some(e) = cause.downcast_ref::<SchedulerError>() {
            return (e.category(), SyllabusErrorTrait::is_recoverable(e));
        }
        if let Some(e) = cause.downcast_ref::<AnalysisError>() {
            return (e.category(), e.is_recoverable());
        }
        if cause.downcast_ref::<io::Error>().is_some() {
            return (ErrorCategory::Storage, true);
        }
        if cause.downcast_ref::<serde_json::Error>().is_some()
            || cause.downcast_ref::<toml::de::Error>().is_some()
        {
            return (ErrorCategory::Input, false);
        }
    }
    (ErrorCategory::Other, false)
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
