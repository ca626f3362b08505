//! Expected-vs-actual subject share analysis
//!
//! Compares how often each subject occurs in a topic sequence against the
//! share its weight asks for. A subject is flagged when the two differ by more
//! than the tolerance, measured in percentage points.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::models::SubjectId;
use crate::scheduler::backlog::SubjectRegistry;
use crate::scheduler::distributor::Distribution;
use crate::scheduler::schedule::StudySchedule;
use crate::scheduler::weights::WeightMode;

/// Errors that can occur during conformance analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid tolerance: {0} (must be a non-negative number of percentage points)")]
    InvalidTolerance(f64),

    #[error("Invalid window size: {0}")]
    InvalidWindowSize(usize),
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Conformance of one subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConformance {
    pub subject: SubjectId,
    pub name: String,
    /// Effective weight
    pub weight: u64,
    /// `round(total * weight / sum)`
    pub expected_count: usize,
    pub actual_count: usize,
    pub expected_pct: f64,
    pub actual_pct: f64,
    pub flagged: bool,
}

impl SubjectConformance {
    /// Signed gap `actual - expected` in percentage points
    pub fn deviation_pct(&self) -> f64 {
        self.actual_pct - self.expected_pct
    }
}

/// Conformance of a whole sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Sessions counted (after windowing)
    pub total: usize,
    pub tolerance_pct: f64,
    pub window: Option<usize>,
    pub subjects: Vec<SubjectConformance>,
}

impl ConformanceReport {
    /// No subject is outside the tolerance
    pub fn is_conformant(&self) -> bool {
        self.subjects.iter().all(|s| !s.flagged)
    }

    pub fn flagged(&self) -> Vec<&SubjectConformance> {
        self.subjects.iter().filter(|s| s.flagged).collect()
    }

    /// Largest absolute deviation in percentage points
    pub fn max_deviation_pct(&self) -> f64 {
        self.subjects
            .iter()
            .map(|s| s.deviation_pct().abs())
            .fold(0.0, f64::max)
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let mut output = String::from("Weight Conformance Report\n");
        output.push_str(&format!("{:-<78}\n", ""));
        output.push_str(&format!(
            "Sessions: {}  Tolerance: {:.1}pp",
            self.total, self.tolerance_pct
        ));
        if let Some(window) = self.window {
            output.push_str(&format!("  Window: first {}", window));
        }
        output.push_str("\n\n");

        output.push_str(&format!(
            "{:<24} {:>6} {:>9} {:>9} {:>9} {:>9} {:>8}\n",
            "Subject", "Weight", "Expected", "Actual", "Expected%", "Actual%", "Delta"
        ));
        for s in &self.subjects {
            output.push_str(&format!(
                "{:<24} {:>6} {:>9} {:>9} {:>8.1}% {:>8.1}% {:>+7.1}{}\n",
                s.name,
                s.weight,
                s.expected_count,
                s.actual_count,
                s.expected_pct,
                s.actual_pct,
                s.deviation_pct(),
                if s.flagged { " !" } else { "" }
            ));
        }

        output.push('\n');
        if self.is_conformant() {
            output.push_str("All subjects within tolerance\n");
        } else {
            let names: Vec<_> = self.flagged().iter().map(|s| s.name.as_str()).collect();
            output.push_str(&format!("Outside tolerance: {}\n", names.join(", ")));
        }
        output
    }
}

/// Builds conformance reports
#[derive(Debug, Clone)]
pub struct ConformanceAnalyzer {
    tolerance_pct: f64,
    window: Option<usize>,
    weight_mode: WeightMode,
}

impl ConformanceAnalyzer {
    pub fn new(tolerance_pct: f64) -> AnalysisResult<Self> {
        if !tolerance_pct.is_finite() || tolerance_pct < 0.0 {
            return Err(AnalysisError::InvalidTolerance(tolerance_pct));
        }
        Ok(Self {
            tolerance_pct,
            window: None,
            weight_mode: WeightMode::Direct,
        })
    }

    pub fn from_config(config: &AnalysisConfig, weight_mode: WeightMode) -> AnalysisResult<Self> {
        let mut analyzer = Self::new(config.tolerance_pct)?.with_weight_mode(weight_mode);
        if let Some(window) = config.window {
            analyzer = analyzer.with_window(window)?;
        }
        Ok(analyzer)
    }

    /// Only count the first `window` entries of a sequence
    pub fn with_window(mut self, window: usize) -> AnalysisResult<Self> {
        if window == 0 {
            return Err(AnalysisError::InvalidWindowSize(window));
        }
        self.window = Some(window);
        Ok(self)
    }

    pub fn with_weight_mode(mut self, mode: WeightMode) -> Self {
        self.weight_mode = mode;
        self
    }

    pub fn tolerance_pct(&self) -> f64 {
        self.tolerance_pct
    }

    pub fn analyze_distribution(
        &self,
        registry: &SubjectRegistry,
        distribution: &Distribution,
    ) -> ConformanceReport {
        self.analyze_sequence(registry, &distribution.subject_sequence())
    }

    /// New-topic sessions of a schedule, in distribution order
    ///
    /// Sessions are matched to `registry` by subject name, so the plan's
    /// subjects may be listed in any order.
    pub fn analyze_schedule(
        &self,
        registry: &SubjectRegistry,
        schedule: &StudySchedule,
    ) -> ConformanceReport {
        self.analyze_sequence(registry, &schedule.new_topic_subjects(registry))
    }

    /// Analyze a subject sequence
    ///
    /// Subjects are those occurring anywhere in the full sequence; counts come
    /// from the windowed prefix.
    pub fn analyze_sequence(
        &self,
        registry: &SubjectRegistry,
        sequence: &[SubjectId],
    ) -> ConformanceReport {
        let window = self.window.map_or(sequence.len(), |w| w.min(sequence.len()));
        let counted = &sequence[..window];

        let mut counts: HashMap<SubjectId, usize> = HashMap::new();
        for subject in counted {
            *counts.entry(*subject).or_insert(0) += 1;
        }

        let present: Vec<_> = registry
            .iter()
            .filter(|s| sequence.contains(&s.id))
            .map(|s| (s, self.weight_mode.effective_weight(s.weight)))
            .collect();
        let weight_sum: u64 = present.iter().map(|(_, w)| *w).fold(0u64, u64::saturating_add);
        let total = counted.len();

        let subjects: Vec<SubjectConformance> = present
            .into_iter()
            .map(|(subject, weight)| {
                let actual_count = counts.get(&subject.id).copied().unwrap_or(0);
                let expected_pct = percent(weight as f64, weight_sum as f64);
                let actual_pct = percent(actual_count as f64, total as f64);
                SubjectConformance {
                    subject: subject.id,
                    name: subject.name.clone(),
                    weight,
                    expected_count: (total as f64 * expected_pct / 100.0).round() as usize,
                    actual_count,
                    expected_pct,
                    actual_pct,
                    flagged: (actual_pct - expected_pct).abs() > self.tolerance_pct,
                }
            })
            .collect();

        for s in subjects.iter().filter(|s| s.flagged) {
            tracing::warn!(
                subject = %s.name,
                expected_pct = %format!("{:.1}", s.expected_pct),
                actual_pct = %format!("{:.1}", s.actual_pct),
                tolerance_pct = self.tolerance_pct,
                "Subject share outside tolerance"
            );
        }

        ConformanceReport {
            total,
            tolerance_pct: self.tolerance_pct,
            window: self.window,
            subjects,
        }
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
