//! Common test utilities

use chrono::NaiveDate;
use syllabus::models::{StudyPlan, SubjectSpec, TopicRecord};
use syllabus::scheduler::{Backlog, SubjectRegistry};

/// Date in March 2025 (the 3rd is a Monday)
#[allow(dead_code)]
pub fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

/// Topic records for `(subject, weight, topic_count)` triples, grouped by subject
pub fn records(subjects: &[(&str, i64, usize)]) -> Vec<TopicRecord> {
    let mut records = Vec::new();
    for (name, _, count) in subjects {
        for i in 0..*count {
            records.push(TopicRecord::new(
                format!("{name}-{i}").as_str(),
                name,
                &format!("{name} topic {i}"),
            ));
        }
    }
    records
}

pub fn specs(subjects: &[(&str, i64, usize)]) -> Vec<SubjectSpec> {
    subjects
        .iter()
        .map(|(name, weight, _)| SubjectSpec::new(*name, *weight))
        .collect()
}

/// Backlog with topics grouped by subject
#[allow(dead_code)]
pub fn backlog(subjects: &[(&str, i64, usize)]) -> Backlog {
    let registry = SubjectRegistry::from_specs(&specs(subjects));
    Backlog::build(registry, &records(subjects))
}

/// Plan spanning March 2025
#[allow(dead_code)]
pub fn plan(subjects: &[(&str, i64, usize)]) -> StudyPlan {
    StudyPlan {
        name: "Test plan".to_string(),
        start_date: Some(march(3)),
        exam_date: march(31),
        subjects: specs(subjects),
        topics: records(subjects),
    }
}

/// Path of the bundled sample plan
#[allow(dead_code)]
pub fn sample_plan_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("plans/sample_plan.toml")
}
