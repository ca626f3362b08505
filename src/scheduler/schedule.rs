//! Study schedule data structures and persistence
//!
//! A [`StudySchedule`] is the dated output of the calendar mapper. It is saved
//! as pretty JSON and can be loaded back for auditing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::backlog::SubjectRegistry;
use super::error::{SchedulerError, SchedulerResult};
use crate::models::{SubjectId, Topic, TopicId};

// ============================================================================
// Study Session
// ============================================================================

/// What a session is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionKind {
    /// First pass over a topic
    NewTopic,
    /// Spaced-repetition review `offset_days` after the topic was studied
    Review { offset_days: u32 },
    /// Essay writing practice, not bound to a topic
    Essay,
}

impl SessionKind {
    pub fn label(&self) -> String {
        match self {
            Self::NewTopic => "New topic".to_string(),
            Self::Review { offset_days } => format!("Review {offset_days}d"),
            Self::Essay => "Essay".to_string(),
        }
    }

    pub fn is_review(&self) -> bool {
        matches!(self, Self::Review { .. })
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A single dated study session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub date: NaiveDate,

    #[serde(flatten)]
    pub kind: SessionKind,

    /// Topic studied or reviewed; `None` for essays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<TopicId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,

    pub description: String,

    /// Position in the distribution order (new topics only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<usize>,
}

impl StudySession {
    /// New-topic session for the topic at `sequence` in the distribution
    pub fn new_topic(date: NaiveDate, topic: &Topic, subject_name: &str, sequence: usize) -> Self {
        Self {
            date,
            kind: SessionKind::NewTopic,
            topic: Some(topic.id.clone()),
            subject: Some(topic.subject),
            subject_name: Some(subject_name.to_string()),
            description: topic.description.clone(),
            sequence: Some(sequence),
        }
    }

    pub fn review(date: NaiveDate, topic: &Topic, subject_name: &str, offset_days: u32) -> Self {
        Self {
            date,
            kind: SessionKind::Review { offset_days },
            topic: Some(topic.id.clone()),
            subject: Some(topic.subject),
            subject_name: Some(subject_name.to_string()),
            description: topic.description.clone(),
            sequence: None,
        }
    }

    pub fn essay(date: NaiveDate) -> Self {
        Self {
            date,
            kind: SessionKind::Essay,
            topic: None,
            subject: None,
            subject_name: None,
            description: "Essay practice".to_string(),
            sequence: None,
        }
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let subject = self.subject_name.as_deref().unwrap_or("-");
        format!(
            "{} {:<3} {:<11} {:<24} {}",
            self.date,
            self.date.format("%a"),
            self.kind.label(),
            subject,
            self.description
        )
    }
}

// ============================================================================
// Study Schedule
// ============================================================================

/// Complete dated schedule of a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySchedule {
    pub plan_name: String,
    pub start_date: NaiveDate,
    pub exam_date: NaiveDate,

    /// Sessions ordered by date
    pub sessions: Vec<StudySession>,

    /// Topics that did not fit before the exam date, in distribution order
    #[serde(default)]
    pub unscheduled: Vec<TopicId>,

    /// Reviews with no Saturday room left before the exam
    #[serde(default)]
    pub unplaced_reviews: usize,

    /// Topics left out by final stretch, highest priority first
    #[serde(default)]
    pub excluded: Vec<TopicId>,

    /// When this schedule was generated
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl StudySchedule {
    /// Create an empty schedule for a date range
    pub fn new(plan_name: impl Into<String>, start_date: NaiveDate, exam_date: NaiveDate) -> Self {
        Self {
            plan_name: plan_name.into(),
            start_date,
            exam_date,
            sessions: Vec::new(),
            unscheduled: Vec::new(),
            unplaced_reviews: 0,
            excluded: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// All sessions on a date
    pub fn sessions_on(&self, date: NaiveDate) -> Vec<&StudySession> {
        self.sessions.iter().filter(|s| s.date == date).collect()
    }

    pub fn sessions_for_subject(&self, subject: SubjectId) -> Vec<&StudySession> {
        self.sessions
            .iter()
            .filter(|s| s.subject == Some(subject))
            .collect()
    }

    /// New-topic sessions in distribution order
    pub fn new_topic_sessions(&self) -> Vec<&StudySession> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .filter(|s| s.kind == SessionKind::NewTopic)
            .collect();
        sessions.sort_by_key(|s| s.sequence);
        sessions
    }

    /// Subjects of the new-topic sessions, keyed against `registry`
    ///
    /// Saved ids are indices into the registry the schedule was built with, so
    /// the persisted subject name is resolved first. The id is used only for
    /// sessions saved without a name. Sessions naming a subject `registry`
    /// does not know are skipped.
    pub fn new_topic_subjects(&self, registry: &SubjectRegistry) -> Vec<SubjectId> {
        let mut unknown = 0usize;
        let subjects: Vec<SubjectId> = self
            .new_topic_sessions()
            .iter()
            .filter_map(|session| match &session.subject_name {
                Some(name) => {
                    let resolved = registry.resolve(name);
                    if resolved.is_none() {
                        unknown += 1;
                    }
                    resolved
                }
                None => session.subject,
            })
            .collect();

        if unknown > 0 {
            tracing::warn!(
                plan = %self.plan_name,
                sessions = unknown,
                "Skipping sessions of subjects missing from the plan"
            );
        }
        subjects
    }

    /// Last date with any session
    pub fn last_session_date(&self) -> Option<NaiveDate> {
        self.sessions.iter().map(|s| s.date).max()
    }

    /// Get summary statistics
    pub fn summary(&self) -> ScheduleSummary {
        let mut kind_counts = BTreeMap::new();
        let mut subject_counts = BTreeMap::new();
        let mut day_counts = BTreeMap::new();

        for session in &self.sessions {
            *kind_counts.entry(session.kind.label()).or_insert(0) += 1;
            *day_counts.entry(session.date).or_insert(0) += 1;
            if let Some(name) = &session.subject_name {
                *subject_counts.entry(name.clone()).or_insert(0) += 1;
            }
        }

        ScheduleSummary {
            plan_name: self.plan_name.clone(),
            start_date: self.start_date,
            exam_date: self.exam_date,
            total_sessions: self.sessions.len(),
            study_days: day_counts.len(),
            busiest_day: day_counts
                .iter()
                .max_by_key(|(date, count)| (**count, std::cmp::Reverse(**date)))
                .map(|(date, count)| (*date, *count)),
            unscheduled: self.unscheduled.len(),
            unplaced_reviews: self.unplaced_reviews,
            excluded: self.excluded.len(),
            kind_distribution: kind_counts,
            subject_distribution: subject_counts,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> SchedulerResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> SchedulerResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Save to file
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> SchedulerResult<()> {
        let json = self.to_json()?;
        tokio::fs::write(path.as_ref(), json)
            .await
            .map_err(|e| SchedulerError::io_error("save_schedule", e.to_string()))?;
        Ok(())
    }

    /// Load from file
    pub async fn load_from_file(path: impl AsRef<Path>) -> SchedulerResult<Self> {
        let json = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| SchedulerError::io_error("load_schedule", e.to_string()))?;
        Self::from_json(&json)
    }
}

/// Schedule summary statistics
#[derive(Debug, Clone)]
pub struct ScheduleSummary {
    pub plan_name: String,
    pub start_date: NaiveDate,
    pub exam_date: NaiveDate,
    pub total_sessions: usize,
    pub study_days: usize,
    pub busiest_day: Option<(NaiveDate, usize)>,
    pub unscheduled: usize,
    pub unplaced_reviews: usize,
    pub excluded: usize,
    pub kind_distribution: BTreeMap<String, usize>,
    pub subject_distribution: BTreeMap<String, usize>,
}

impl ScheduleSummary {
    /// Format as display string
    pub fn display(&self) -> String {
        let mut output = format!(
            "Schedule Summary for {} ({} to {})\n",
            self.plan_name, self.start_date, self.exam_date
        );
        output.push_str(&format!("{:-<40}\n", ""));
        output.push_str(&format!("Total Sessions: {}\n", self.total_sessions));
        output.push_str(&format!("Study Days: {}\n", self.study_days));
        if let Some((date, count)) = self.busiest_day {
            output.push_str(&format!("Busiest Day: {} ({} sessions)\n", date, count));
        }
        if self.unscheduled > 0 {
            output.push_str(&format!("Unscheduled Topics: {}\n", self.unscheduled));
        }
        if self.unplaced_reviews > 0 {
            output.push_str(&format!("Unplaced Reviews: {}\n", self.unplaced_reviews));
        }
        if self.excluded > 0 {
            output.push_str(&format!("Excluded (final stretch): {}\n", self.excluded));
        }

        output.push_str("\nSession Types:\n");
        for (kind, count) in &self.kind_distribution {
            output.push_str(&format!("  {}: {} sessions\n", kind, count));
        }

        output.push_str("\nSubject Distribution:\n");
        for (subject, count) in &self.subject_distribution {
            output.push_str(&format!("  {}: {} sessions\n", subject, count));
        }

        output
    }
}

// ============================================================================
// Tests
// ============================================================================
