//! Configuration management for syllabus
//!
//! This module handles loading and validating configuration from environment variables,
//! TOML files and defaults.

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::scheduler::weights::WeightMode;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Weighted round-robin settings
    pub distribution: DistributionConfig,

    /// Calendar mapping settings
    pub calendar: CalendarConfig,

    /// Conformance analysis settings
    pub analysis: AnalysisConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Distributor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// How configured weights become credits
    pub weight_mode: WeightMode,

    /// Round cap as a multiple of the topic count
    pub round_cap_factor: usize,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            weight_mode: WeightMode::Direct,
            round_cap_factor: 2,
        }
    }
}

/// Study hours available per weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyHours {
    pub monday: f64,
    pub tuesday: f64,
    pub wednesday: f64,
    pub thursday: f64,
    pub friday: f64,
    pub saturday: f64,
    pub sunday: f64,
}

impl WeeklyHours {
    /// Same hours every day
    pub fn uniform(hours: f64) -> Self {
        Self {
            monday: hours,
            tuesday: hours,
            wednesday: hours,
            thursday: hours,
            friday: hours,
            saturday: hours,
            sunday: hours,
        }
    }

    pub fn for_weekday(&self, day: Weekday) -> f64 {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn set(&mut self, day: Weekday, hours: f64) {
        let slot = match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = hours;
    }

    pub fn total(&self) -> f64 {
        self.monday
            + self.tuesday
            + self.wednesday
            + self.thursday
            + self.friday
            + self.saturday
            + self.sunday
    }
}

impl Default for WeeklyHours {
    fn default() -> Self {
        Self::uniform(2.0)
    }
}

/// Calendar mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Length of one study session in minutes
    pub session_duration_minutes: u32,

    /// Study hours per weekday
    pub study_hours: WeeklyHours,

    /// New topics only on Monday to Friday
    pub weekday_only_new_topics: bool,

    /// Schedule spaced-repetition reviews
    pub reviews_enabled: bool,

    /// Review offsets in days after the study date
    pub review_offsets_days: Vec<u32>,

    /// Reserve Sundays for essay practice
    pub essay_sundays: bool,

    /// When the backlog exceeds the new-topic sessions left, keep the
    /// highest-priority topics instead of rejecting the plan
    pub final_stretch: bool,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            session_duration_minutes: 50,
            study_hours: WeeklyHours::default(),
            weekday_only_new_topics: true,
            reviews_enabled: true,
            review_offsets_days: vec![7, 14, 28],
            essay_sundays: false,
            final_stretch: false,
        }
    }
}

/// Conformance analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Allowed gap between expected and actual share, in percentage points
    pub tolerance_pct: f64,

    /// Only analyze the first N sessions of a sequence
    pub window: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: 10.0,
            window: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(mode) = std::env::var("SYLLABUS_WEIGHT_MODE") {
            config.distribution.weight_mode = mode
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("SYLLABUS_WEIGHT_MODE")?;
        }

        config.distribution.round_cap_factor = std::env::var("SYLLABUS_ROUND_CAP_FACTOR")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(config.distribution.round_cap_factor);

        config.calendar.session_duration_minutes = std::env::var("SYLLABUS_SESSION_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(config.calendar.session_duration_minutes);

        config.calendar.essay_sundays = std::env::var("SYLLABUS_ESSAY_SUNDAYS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(config.calendar.essay_sundays);

        config.calendar.final_stretch = std::env::var("SYLLABUS_FINAL_STRETCH")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(config.calendar.final_stretch);

        config.analysis.tolerance_pct = std::env::var("SYLLABUS_TOLERANCE_PCT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(config.analysis.tolerance_pct);

        if let Ok(level) = std::env::var("SYLLABUS_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(format) = std::env::var("SYLLABUS_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// File if given, environment otherwise; validated either way
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.distribution.round_cap_factor == 0 {
            anyhow::bail!("round_cap_factor must be greater than 0");
        }

        if self.calendar.session_duration_minutes == 0 {
            anyhow::bail!("session_duration_minutes must be greater than 0");
        }

        let hours = &self.calendar.study_hours;
        let all_days = [
            hours.monday,
            hours.tuesday,
            hours.wednesday,
            hours.thursday,
            hours.friday,
            hours.saturday,
            hours.sunday,
        ];
        if all_days.iter().any(|h| !h.is_finite() || *h < 0.0 || *h > 24.0) {
            anyhow::bail!("study_hours must be between 0 and 24 for every day");
        }

        if hours.total() <= 0.0 {
            anyhow::bail!("study_hours must allow at least one study day");
        }

        if self.calendar.review_offsets_days.contains(&0) {
            anyhow::bail!("review_offsets_days must be positive");
        }

        if !self.analysis.tolerance_pct.is_finite() || self.analysis.tolerance_pct < 0.0 {
            anyhow::bail!("tolerance_pct must be a non-negative number");
        }

        if self.analysis.window == Some(0) {
            anyhow::bail!("analysis window must be greater than 0");
        }

        Ok(())
    }
}
