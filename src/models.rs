// Core data structures for study plans

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Stable subject identifier (index into the subject registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub usize);

impl SubjectId {
    /// Registry index
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Topic identifier as supplied by the persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TopicId(pub String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopicId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TopicId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for TopicId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

// Plan files written by hand use integer ids, exported ones use strings.
impl<'de> Deserialize<'de> for TopicId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => TopicId(s),
            RawId::Number(n) => TopicId(n.to_string()),
        })
    }
}

/// Subject as configured for a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSpec {
    pub name: String,
    #[serde(alias = "priority_weight")]
    pub weight: i64,
}

impl SubjectSpec {
    pub fn new(name: impl Into<String>, weight: i64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Registered subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    /// Weight exactly as configured (may be zero or negative)
    pub weight: i64,
}

/// Study status of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    #[default]
    Pending,
    #[serde(alias = "done")]
    Completed,
}

/// Topic priority used when a row carries none
pub const DEFAULT_TOPIC_PRIORITY: i64 = 3;

/// Raw topic row as it comes out of storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    #[serde(default)]
    pub id: Option<TopicId>,
    #[serde(default, alias = "subject_name")]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TopicStatus,
    #[serde(default, alias = "completion_date")]
    pub completed_on: Option<NaiveDate>,
    /// Topic weight within its subject, [`DEFAULT_TOPIC_PRIORITY`] when absent
    #[serde(default, alias = "topic_priority")]
    pub priority: Option<i64>,
}

impl TopicRecord {
    /// Pending topic with id and subject set
    pub fn new(id: impl Into<TopicId>, subject: &str, description: &str) -> Self {
        Self {
            id: Some(id.into()),
            subject: Some(subject.to_string()),
            description: description.to_string(),
            status: TopicStatus::Pending,
            completed_on: None,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Mark as completed on the given date
    pub fn completed(mut self, on: NaiveDate) -> Self {
        self.status = TopicStatus::Completed;
        self.completed_on = Some(on);
        self
    }
}

/// Normalized topic bound to a registered subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub subject: SubjectId,
    pub description: String,
    pub priority: i64,
}

/// Topic already studied, eligible for spaced repetition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTopic {
    pub topic: Topic,
    pub completed_on: NaiveDate,
}

/// Study plan input: subjects with weights plus the topic backlog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlan {
    pub name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    pub exam_date: NaiveDate,
    pub subjects: Vec<SubjectSpec>,
    #[serde(default)]
    pub topics: Vec<TopicRecord>,
}

impl StudyPlan {
    /// Load a plan from a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            other => Err(Error::config(format!(
                "Unsupported plan file extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Number of topics still to be studied
    pub fn pending_count(&self) -> usize {
        self.topics
            .iter()
            .filter(|t| t.status == TopicStatus::Pending)
            .count()
    }
}
