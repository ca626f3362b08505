//! Final-stretch topic selection
//!
//! Close to the exam the backlog may no longer fit the new-topic sessions
//! left. Final stretch keeps the `slots` most important pending topics and
//! reports the rest as excluded. Importance is the combined priority
//! `subject_weight * 10 + topic_priority`, so subject weight always dominates
//! and topic priority breaks ties within a subject weight.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::backlog::Backlog;
use super::weights::clamp_weight;
use crate::models::Topic;

/// Multiplier applied to the subject weight in the combined priority
pub const SUBJECT_PRIORITY_FACTOR: i64 = 10;

/// A pending topic left out by final-stretch selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedTopic {
    pub topic: Topic,
    pub subject_name: String,
    pub combined_priority: i64,
}

/// `subject_weight * 10 + topic_priority`, with the subject weight clamped
pub fn combined_priority(subject_weight: i64, topic_priority: i64) -> i64 {
    let subject = i64::try_from(clamp_weight(subject_weight)).unwrap_or(i64::MAX);
    subject
        .saturating_mul(SUBJECT_PRIORITY_FACTOR)
        .saturating_add(topic_priority)
}

/// Keep the `slots` highest-priority pending topics of the backlog
///
/// Ties keep input order. The kept topics stay in input order so every
/// subject queue is still FIFO. Returns the excluded topics, highest priority
/// first.
pub fn select(backlog: &mut Backlog, slots: usize) -> Vec<ExcludedTopic> {
    if backlog.len() <= slots {
        return Vec::new();
    }

    let weights: Vec<i64> = backlog.registry().iter().map(|s| s.weight).collect();
    let priority_of = |topic: &Topic| {
        let weight = weights.get(topic.subject.index()).copied().unwrap_or(1);
        combined_priority(weight, topic.priority)
    };

    let mut ranked: Vec<(usize, i64)> = backlog
        .pending()
        .iter()
        .enumerate()
        .map(|(index, topic)| (index, priority_of(topic)))
        .collect();
    // stable: equal priorities keep input order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let keep: HashSet<usize> = ranked.iter().take(slots).map(|(index, _)| *index).collect();

    let removed = backlog.retain_pending(|index, _| keep.contains(&index));

    let mut excluded: Vec<ExcludedTopic> = removed
        .into_iter()
        .map(|topic| ExcludedTopic {
            combined_priority: priority_of(&topic),
            subject_name: backlog.registry().name(topic.subject).to_string(),
            topic,
        })
        .collect();
    excluded.sort_by(|a, b| b.combined_priority.cmp(&a.combined_priority));

    for entry in &excluded {
        tracing::debug!(
            topic_id = %entry.topic.id,
            subject = %entry.subject_name,
            priority = entry.combined_priority,
            "Topic excluded by final stretch"
        );
    }
    tracing::warn!(
        kept = backlog.len(),
        excluded = excluded.len(),
        slots,
        "Final stretch: backlog trimmed to the sessions left"
    );

    excluded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubjectSpec, TopicRecord};
    use crate::scheduler::backlog::SubjectRegistry;

    fn backlog(records: &[TopicRecord]) -> Backlog {
        let registry = SubjectRegistry::from_specs(&[
            SubjectSpec::new("Civil Law", 3),
            SubjectSpec::new("Ethics", 1),
        ]);
        Backlog::build(registry, records)
    }

    #[test]
    fn test_combined_priority() {
        assert_eq!(combined_priority(3, 3), 33);
        assert_eq!(combined_priority(1, 5), 15);
        // non-positive weights count as the minimum
        assert_eq!(combined_priority(-4, 3), 13);
        assert_eq!(combined_priority(i64::MAX, 3), i64::MAX);
    }

    #[test]
    fn test_select_keeps_highest_priority() {
        let mut backlog = backlog(&[
            TopicRecord::new("e1", "Ethics", "Deontology").with_priority(5),
            TopicRecord::new("c1", "Civil Law", "Persons"),
            TopicRecord::new("e2", "Ethics", "Virtue"),
            TopicRecord::new("c2", "Civil Law", "Goods").with_priority(1),
            TopicRecord::new("c3", "Civil Law", "Contracts"),
        ]);

        let excluded = select(&mut backlog, 3);

        // kept: c1 (33), c3 (33), c2 (31), in input order
        let kept: Vec<_> = backlog.pending().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(kept, vec!["c1", "c2", "c3"]);

        let dropped: Vec<_> = excluded
            .iter()
            .map(|e| (e.topic.id.as_str(), e.combined_priority))
            .collect();
        assert_eq!(dropped, vec![("e1", 15), ("e2", 13)]);
        assert_eq!(excluded[0].subject_name, "Ethics");
    }

    #[test]
    fn test_select_ties_keep_input_order() {
        let mut backlog = backlog(&[
            TopicRecord::new("c1", "Civil Law", "1"),
            TopicRecord::new("c2", "Civil Law", "2"),
            TopicRecord::new("c3", "Civil Law", "3"),
        ]);

        let excluded = select(&mut backlog, 2);

        assert_eq!(backlog.len(), 2);
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].topic.id.as_str(), "c3");
    }

    #[test]
    fn test_select_noop_when_backlog_fits() {
        let mut backlog = backlog(&[TopicRecord::new("c1", "Civil Law", "1")]);
        assert!(select(&mut backlog, 1).is_empty());
        assert_eq!(backlog.len(), 1);
    }

    #[test]
    fn test_select_zero_slots_excludes_everything() {
        let mut backlog = backlog(&[
            TopicRecord::new("c1", "Civil Law", "1"),
            TopicRecord::new("e1", "Ethics", "1"),
        ]);
        let excluded = select(&mut backlog, 0);
        assert!(backlog.is_empty());
        assert_eq!(excluded.len(), 2);
    }
}
