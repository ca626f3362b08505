//! Interleaving quality of a topic sequence
//!
//! Looks at how well subjects are spread out: same-subject runs, gaps between
//! topics of one subject, and the balance of subject counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::SubjectId;
use crate::scheduler::backlog::SubjectRegistry;

/// Runs longer than this cost points
pub const MAX_RUN: usize = 3;

/// Max/min subject count ratio above this costs points
pub const MAX_IMBALANCE_RATIO: f64 = 3.0;

/// Smallest average gap below this costs points
pub const MIN_AVERAGE_GAP: f64 = 2.0;

/// Quality level for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excellent,
    Good,
    Acceptable,
    NeedsImprovement,
}

impl QualityLevel {
    /// Classify a score
    ///
    /// - `>= 90`: Excellent
    /// - `>= 75`: Good
    /// - `>= 60`: Acceptable
    /// - otherwise: NeedsImprovement
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            Self::Excellent
        } else if score >= 75 {
            Self::Good
        } else if score >= 60 {
            Self::Acceptable
        } else {
            Self::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Acceptable => "acceptable",
            Self::NeedsImprovement => "needs improvement",
        }
    }
}

/// Per-subject spread figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSpread {
    pub subject: SubjectId,
    pub name: String,
    pub count: usize,
    /// Mean number of other topics between two topics of this subject
    pub average_gap: Option<f64>,
}

/// Spread analysis of one sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadAnalysis {
    pub total: usize,
    pub subjects: Vec<SubjectSpread>,
    pub longest_run: usize,
    pub longest_run_subject: Option<SubjectId>,
    pub score: u32,
    pub level: QualityLevel,
    pub issues: Vec<String>,
}

impl SpreadAnalysis {
    /// Analyze a subject sequence
    pub fn analyze(registry: &SubjectRegistry, sequence: &[SubjectId]) -> Self {
        let mut positions: BTreeMap<SubjectId, Vec<usize>> = BTreeMap::new();
        for (index, subject) in sequence.iter().enumerate() {
            positions.entry(*subject).or_default().push(index);
        }

        let subjects: Vec<SubjectSpread> = positions
            .iter()
            .map(|(subject, at)| SubjectSpread {
                subject: *subject,
                name: registry.name(*subject).to_string(),
                count: at.len(),
                average_gap: average_gap(at),
            })
            .collect();

        let (longest_run, longest_run_subject) = longest_run(sequence);

        let mut score: u32 = 100;
        let mut issues = Vec::new();

        if longest_run > MAX_RUN {
            score -= 20;
            issues.push(format!(
                "{} consecutive topics of {}",
                longest_run,
                longest_run_subject.map_or("?", |s| registry.name(s))
            ));
        }

        let max_count = subjects.iter().map(|s| s.count).max().unwrap_or(0);
        let min_count = subjects.iter().map(|s| s.count).min().unwrap_or(0);
        if min_count > 0 {
            let ratio = max_count as f64 / min_count as f64;
            if ratio > MAX_IMBALANCE_RATIO {
                score -= 15;
                issues.push(format!("Subject imbalance {:.1}x", ratio));
            }
        }

        let min_gap = subjects
            .iter()
            .filter_map(|s| s.average_gap)
            .fold(None, |acc: Option<f64>, gap| Some(acc.map_or(gap, |m| m.min(gap))));
        if let Some(gap) = min_gap {
            if gap < MIN_AVERAGE_GAP {
                score -= 10;
                issues.push(format!("Topics of one subject too close (average gap {:.1})", gap));
            }
        }

        let level = QualityLevel::from_score(score);
        tracing::debug!(score, level = level.label(), longest_run, "Spread analyzed");

        Self {
            total: sequence.len(),
            subjects,
            longest_run,
            longest_run_subject,
            score,
            level,
            issues,
        }
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let mut output = String::from("Spread Quality\n");
        output.push_str(&format!("{:-<40}\n", ""));
        output.push_str(&format!("Score: {} ({})\n", self.score, self.level.label()));
        output.push_str(&format!("Longest same-subject run: {}\n\n", self.longest_run));

        for s in &self.subjects {
            let gap = s
                .average_gap
                .map_or_else(|| "-".to_string(), |g| format!("{:.1}", g));
            output.push_str(&format!(
                "  {:<24} {:>5} topics  avg gap {}\n",
                s.name, s.count, gap
            ));
        }

        for issue in &self.issues {
            output.push_str(&format!("  ! {}\n", issue));
        }
        output
    }
}

fn average_gap(positions: &[usize]) -> Option<f64> {
    if positions.len() < 2 {
        return None;
    }
    let gaps: usize = positions.windows(2).map(|w| w[1] - w[0] - 1).sum();
    Some(gaps as f64 / (positions.len() - 1) as f64)
}

fn longest_run(sequence: &[SubjectId]) -> (usize, Option<SubjectId>) {
    let mut best = (0, None);
    let mut current = 0;
    for (i, subject) in sequence.iter().enumerate() {
        if i > 0 && sequence[i - 1] == *subject {
            current += 1;
        } else {
            current = 1;
        }
        if current > best.0 {
            best = (current, Some(*subject));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectSpec;

    fn registry() -> SubjectRegistry {
        SubjectRegistry::from_specs(&[
            SubjectSpec::new("A", 1),
            SubjectSpec::new("B", 1),
            SubjectSpec::new("C", 1),
        ])
    }

    fn seq(pattern: &str) -> Vec<SubjectId> {
        pattern
            .chars()
            .map(|c| SubjectId((c as u8 - b'A') as usize))
            .collect()
    }

    #[test]
    fn test_well_spread_sequence() {
        let analysis = SpreadAnalysis::analyze(&registry(), &seq("ABCABCABC"));

        assert_eq!(analysis.longest_run, 1);
        assert_eq!(analysis.subjects[0].average_gap, Some(2.0));
        assert_eq!(analysis.score, 100);
        assert_eq!(analysis.level, QualityLevel::Excellent);
        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn test_long_run_penalized() {
        let analysis = SpreadAnalysis::analyze(&registry(), &seq("AAAABCBC"));

        assert_eq!(analysis.longest_run, 4);
        assert_eq!(analysis.longest_run_subject, Some(SubjectId(0)));
        // run -20, gap (A has 0) -10
        assert_eq!(analysis.score, 70);
        assert_eq!(analysis.level, QualityLevel::Acceptable);
    }

    #[test]
    fn test_imbalance_penalized() {
        let analysis = SpreadAnalysis::analyze(&registry(), &seq("ABAAB"));
        // A=3 B=2, ratio 1.5: no penalty; A gaps 1,0 -> 0.5
        assert_eq!(analysis.score, 90);

        let skewed = SpreadAnalysis::analyze(&registry(), &seq("ACACACACB"));
        // A=4 B=1 ratio 4, A gap 1.0 -> -15 -10
        assert_eq!(skewed.score, 75);
        assert_eq!(skewed.level, QualityLevel::Good);
        assert_eq!(skewed.issues.len(), 2);
    }

    #[test]
    fn test_empty_sequence() {
        let analysis = SpreadAnalysis::analyze(&registry(), &[]);
        assert_eq!(analysis.total, 0);
        assert_eq!(analysis.longest_run, 0);
        assert_eq!(analysis.score, 100);
    }

    #[test]
    fn test_quality_levels() {
        assert_eq!(QualityLevel::from_score(90), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_score(89), QualityLevel::Good);
        assert_eq!(QualityLevel::from_score(60), QualityLevel::Acceptable);
        assert_eq!(QualityLevel::from_score(55), QualityLevel::NeedsImprovement);
    }
}
