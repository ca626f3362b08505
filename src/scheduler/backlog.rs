//! Subject registry and topic backlog normalization
//!
//! Raw topic rows are joined to subjects by name exactly once, here. From this
//! point on everything is keyed by [`SubjectId`]; names are only carried for
//! logs and reports.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::error::{SchedulerError, SchedulerResult};
use crate::models::{
    CompletedTopic, Subject, SubjectId, SubjectSpec, Topic, TopicId, TopicRecord, TopicStatus,
    DEFAULT_TOPIC_PRIORITY,
};

// ============================================================================
// Subject Registry
// ============================================================================

/// Subjects of a plan in registration order
#[derive(Debug, Clone, Default)]
pub struct SubjectRegistry {
    subjects: Vec<Subject>,
    by_name: HashMap<String, SubjectId>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured subjects, preserving their order
    ///
    /// A repeated name keeps its first registration; later specs are skipped
    /// with a warning.
    pub fn from_specs(specs: &[SubjectSpec]) -> Self {
        let mut registry = Self::new();
        for spec in specs {
            if let Err(err) = registry.register(&spec.name, spec.weight) {
                tracing::warn!(
                    subject = %spec.name.trim(),
                    weight = spec.weight,
                    error = %err,
                    "Skipping repeated subject"
                );
            }
        }
        registry
    }

    /// Register a subject; names must be unique
    pub fn register(&mut self, name: &str, weight: i64) -> SchedulerResult<SubjectId> {
        let name = name.trim();
        if self.by_name.contains_key(name) {
            return Err(SchedulerError::duplicate_subject(name));
        }

        let id = SubjectId(self.subjects.len());
        self.subjects.push(Subject {
            id,
            name: name.to_string(),
            weight,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a subject id by display name
    pub fn resolve(&self, name: &str) -> Option<SubjectId> {
        self.by_name.get(name.trim()).copied()
    }

    pub fn get(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.get(id.index())
    }

    /// Display name, or `"?"` for ids from another registry
    pub fn name(&self, id: SubjectId) -> &str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or("?")
    }

    /// Subjects in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

// ============================================================================
// Dropped Topics
// ============================================================================

/// Why a topic row was left out of the backlog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    MissingId,
    MissingSubject,
    UnknownSubject { name: String },
    DuplicateId,
    MissingCompletionDate,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => write!(f, "missing topic id"),
            Self::MissingSubject => write!(f, "missing subject name"),
            Self::UnknownSubject { name } => write!(f, "unknown subject '{}'", name),
            Self::DuplicateId => write!(f, "duplicate topic id"),
            Self::MissingCompletionDate => write!(f, "completed topic without completion date"),
        }
    }
}

/// A topic row that did not make it into the backlog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedTopic {
    /// Position of the row in the input
    pub index: usize,
    pub id: Option<TopicId>,
    #[serde(flatten)]
    pub reason: DropReason,
}

// ============================================================================
// Backlog
// ============================================================================

/// Normalized topic backlog of a plan
#[derive(Debug, Clone)]
pub struct Backlog {
    registry: SubjectRegistry,
    pending: Vec<Topic>,
    completed: Vec<CompletedTopic>,
    dropped: Vec<DroppedTopic>,
}

impl Backlog {
    /// Normalize raw topic rows against a registry
    ///
    /// Malformed rows are dropped with a warning; this never fails. Pending
    /// topics keep their input order.
    pub fn build(registry: SubjectRegistry, records: &[TopicRecord]) -> Self {
        let mut pending = Vec::new();
        let mut completed = Vec::new();
        let mut dropped = Vec::new();
        let mut seen: HashSet<TopicId> = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            match Self::normalize(&registry, record, &mut seen) {
                Ok(topic) => match (record.status, record.completed_on) {
                    (TopicStatus::Pending, _) => pending.push(topic),
                    (TopicStatus::Completed, Some(completed_on)) => {
                        completed.push(CompletedTopic {
                            topic,
                            completed_on,
                        });
                    }
                    (TopicStatus::Completed, None) => {
                        let drop = DroppedTopic {
                            index,
                            id: Some(topic.id),
                            reason: DropReason::MissingCompletionDate,
                        };
                        warn_dropped(&drop);
                        dropped.push(drop);
                    }
                },
                Err(reason) => {
                    let drop = DroppedTopic {
                        index,
                        id: record.id.clone(),
                        reason,
                    };
                    warn_dropped(&drop);
                    dropped.push(drop);
                }
            }
        }

        tracing::debug!(
            pending = pending.len(),
            completed = completed.len(),
            dropped = dropped.len(),
            subjects = registry.len(),
            "Backlog normalized"
        );

        Self {
            registry,
            pending,
            completed,
            dropped,
        }
    }

    fn normalize(
        registry: &SubjectRegistry,
        record: &TopicRecord,
        seen: &mut HashSet<TopicId>,
    ) -> Result<Topic, DropReason> {
        let id = match &record.id {
            Some(id) if !id.as_str().trim().is_empty() => id.clone(),
            _ => return Err(DropReason::MissingId),
        };

        let name = match record.subject.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(DropReason::MissingSubject),
        };

        let subject = registry
            .resolve(name)
            .ok_or_else(|| DropReason::UnknownSubject {
                name: name.to_string(),
            })?;

        if !seen.insert(id.clone()) {
            return Err(DropReason::DuplicateId);
        }

        Ok(Topic {
            id,
            subject,
            description: record.description.clone(),
            priority: record.priority.unwrap_or(DEFAULT_TOPIC_PRIORITY),
        })
    }

    pub fn registry(&self) -> &SubjectRegistry {
        &self.registry
    }

    /// Topics still to be studied, in input order
    pub fn pending(&self) -> &[Topic] {
        &self.pending
    }

    pub fn completed(&self) -> &[CompletedTopic] {
        &self.completed
    }

    pub fn dropped(&self) -> &[DroppedTopic] {
        &self.dropped
    }

    /// Number of pending topics
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Keep the pending topics `keep` accepts and return the others
    ///
    /// `keep` sees each topic with its position in the pending list. Both
    /// sides keep input order.
    pub fn retain_pending(&mut self, mut keep: impl FnMut(usize, &Topic) -> bool) -> Vec<Topic> {
        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .enumerate()
            .partition(|(index, topic)| keep(*index, topic));
        self.pending = kept.into_iter().map(|(_, topic)| topic).collect();
        removed.into_iter().map(|(_, topic)| topic).collect()
    }

    /// Pending topic count for one subject
    pub fn pending_for(&self, subject: SubjectId) -> usize {
        self.pending.iter().filter(|t| t.subject == subject).count()
    }
}

fn warn_dropped(drop: &DroppedTopic) {
    tracing::warn!(
        index = drop.index,
        topic_id = ?drop.id.as_ref().map(TopicId::as_str),
        reason = %drop.reason,
        "Dropping malformed topic"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn registry() -> SubjectRegistry {
        SubjectRegistry::from_specs(&[
            SubjectSpec::new("Civil Law", 5),
            SubjectSpec::new("Portuguese", 2),
        ])
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry = registry();
        let names: Vec<_> = registry.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Civil Law", "Portuguese"]);
        assert_eq!(registry.resolve("Portuguese"), Some(SubjectId(1)));
        assert_eq!(registry.name(SubjectId(0)), "Civil Law");
        assert_eq!(registry.name(SubjectId(9)), "?");
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let mut registry = registry();
        let err = registry.register(" Civil Law ", 3).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateSubject { .. }));
    }

    #[test]
    fn test_from_specs_keeps_first_repeated_subject() {
        let registry = SubjectRegistry::from_specs(&[
            SubjectSpec::new("Civil Law", 3),
            SubjectSpec::new("Portuguese", 1),
            SubjectSpec::new(" Portuguese", 2),
        ]);

        assert_eq!(registry.len(), 2);
        let portuguese = registry.resolve("Portuguese").unwrap();
        assert_eq!(portuguese, SubjectId(1));
        assert_eq!(registry.get(portuguese).unwrap().weight, 1);
    }

    #[test]
    fn test_retain_pending_splits_in_input_order() {
        let records = vec![
            TopicRecord::new("a", "Civil Law", "1"),
            TopicRecord::new("b", "Portuguese", "2"),
            TopicRecord::new("c", "Civil Law", "3"),
            TopicRecord::new("d", "Portuguese", "4"),
        ];
        let mut backlog = Backlog::build(registry(), &records);

        let removed = backlog.retain_pending(|index, _| index % 2 == 1);

        let kept: Vec<_> = backlog.pending().iter().map(|t| t.id.as_str()).collect();
        let removed: Vec<_> = removed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(kept, vec!["b", "d"]);
        assert_eq!(removed, vec!["a", "c"]);
    }

    #[test]
    fn test_backlog_topic_priority_defaults() {
        let records = vec![
            TopicRecord::new("1", "Civil Law", "Persons"),
            TopicRecord::new("2", "Civil Law", "Goods").with_priority(5),
        ];
        let backlog = Backlog::build(registry(), &records);

        assert_eq!(backlog.pending()[0].priority, DEFAULT_TOPIC_PRIORITY);
        assert_eq!(backlog.pending()[1].priority, 5);
    }

    #[test]
    fn test_backlog_drops_malformed_rows() {
        let records = vec![
            TopicRecord::new("1", "Civil Law", "Persons"),
            TopicRecord {
                id: None,
                subject: Some("Civil Law".into()),
                ..Default::default()
            },
            TopicRecord {
                id: Some(TopicId::new("3")),
                subject: None,
                ..Default::default()
            },
            TopicRecord::new("4", "Astronomy", "Stars"),
            TopicRecord::new("1", "Portuguese", "Duplicate id"),
            TopicRecord::new("6", "Portuguese", "Syntax"),
        ];

        let backlog = Backlog::build(registry(), &records);

        assert_eq!(backlog.len(), 2);
        let reasons: Vec<_> = backlog.dropped().iter().map(|d| d.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                DropReason::MissingId,
                DropReason::MissingSubject,
                DropReason::UnknownSubject {
                    name: "Astronomy".into()
                },
                DropReason::DuplicateId,
            ]
        );
        assert_eq!(backlog.dropped()[0].index, 1);
    }

    #[test]
    fn test_backlog_blank_id_is_missing() {
        let records = vec![TopicRecord::new("  ", "Civil Law", "Blank")];
        let backlog = Backlog::build(registry(), &records);
        assert!(backlog.is_empty());
        assert_eq!(backlog.dropped()[0].reason, DropReason::MissingId);
    }

    #[test]
    fn test_backlog_splits_completed_topics() {
        let done_on = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let mut no_date = TopicRecord::new("3", "Civil Law", "Obligations");
        no_date.status = TopicStatus::Completed;

        let records = vec![
            TopicRecord::new("1", "Civil Law", "Persons"),
            TopicRecord::new("2", "Civil Law", "Goods").completed(done_on),
            no_date,
        ];

        let backlog = Backlog::build(registry(), &records);

        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog.completed().len(), 1);
        assert_eq!(backlog.completed()[0].completed_on, done_on);
        assert_eq!(backlog.dropped()[0].reason, DropReason::MissingCompletionDate);
    }

    #[test]
    fn test_backlog_keeps_input_order() {
        let records = vec![
            TopicRecord::new("a", "Portuguese", "1"),
            TopicRecord::new("b", "Civil Law", "2"),
            TopicRecord::new("c", "Portuguese", "3"),
        ];
        let backlog = Backlog::build(registry(), &records);
        let ids: Vec<_> = backlog.pending().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(backlog.pending_for(SubjectId(1)), 2);
    }
}
