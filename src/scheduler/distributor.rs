//! Credit-based weighted round robin
//!
//! Turns a normalized [`Backlog`] into a single ordering of its pending topics,
//! interleaved across subjects in proportion to their weights.
//!
//! # Algorithm
//!
//! Every subject with pending topics gets a FIFO queue and starts with
//! `credits = weight`. Queues are visited in a fixed order (weight descending,
//! ties by registration order). In each round every queue that still has a
//! credit and a topic emits exactly one topic and pays one credit. When no
//! queue with pending topics has a credit left, every such queue is refilled
//! with its weight.
//!
//! ```text
//!  weights A=5 B=3 C=2, five topics each
//!
//!  round   1     2     3    4   5  | refill | 6    7   | refill | 8
//!          A B C A B C A B  A   A  |        | B C  B C  |        | C
//! ```
//!
//! The run is bounded: after `total_topics * round_cap_factor` rounds whatever
//! is left is drained in queue order.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::backlog::Backlog;
use super::weights::{is_clamped, WeightMode};
use crate::config::DistributionConfig;
use crate::models::{SubjectId, Topic, TopicId};

// ============================================================================
// Discipline Queue
// ============================================================================

/// Per-subject queue and credit account for one run
#[derive(Debug, Clone)]
pub struct DisciplineQueue {
    pub subject: SubjectId,
    pub name: String,
    pub topics: VecDeque<Topic>,
    pub configured_weight: i64,
    /// Effective weight, also the refill amount
    pub weight: u64,
    pub credits: u64,
    pub emitted: usize,
}

impl DisciplineQueue {
    fn new(subject: SubjectId, name: &str, configured_weight: i64, weight: u64) -> Self {
        Self {
            subject,
            name: name.to_string(),
            topics: VecDeque::new(),
            configured_weight,
            weight,
            credits: weight,
            emitted: 0,
        }
    }

    /// Has a topic and a credit to pay for it
    pub fn can_emit(&self) -> bool {
        self.credits >= 1 && !self.topics.is_empty()
    }

    pub fn has_topics(&self) -> bool {
        !self.topics.is_empty()
    }

    fn emit(&mut self) -> Option<Topic> {
        if !self.can_emit() {
            return None;
        }
        let topic = self.topics.pop_front()?;
        self.credits -= 1;
        self.emitted += 1;
        Some(topic)
    }

    fn refill(&mut self) {
        self.credits = self.credits.saturating_add(self.weight);
    }
}

// ============================================================================
// Phase
// ============================================================================

/// State of a distribution run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Queues with credits emit one topic per round
    Distributing,
    /// No queue with topics has credits left
    Refilling,
    /// Every queue is empty
    Done,
}

impl Phase {
    /// Phase that follows a round (or a refill) given the queue state
    pub fn after_round(queues: &[DisciplineQueue]) -> Self {
        if !queues.iter().any(DisciplineQueue::has_topics) {
            Self::Done
        } else if queues.iter().any(DisciplineQueue::can_emit) {
            Self::Distributing
        } else {
            Self::Refilling
        }
    }
}

// ============================================================================
// Distribution Result
// ============================================================================

/// Per-subject outcome of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectAllocation {
    pub subject: SubjectId,
    pub name: String,
    /// Weight as configured
    pub configured_weight: i64,
    /// Weight actually used for credits
    pub weight: u64,
    pub topics: usize,
    /// `weight / sum(weights)` over subjects with topics, in percent
    pub expected_share_pct: f64,
    /// `topics / total`, in percent
    pub actual_share_pct: f64,
}

/// Ordered output of the distributor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    /// Every pending topic exactly once
    pub order: Vec<Topic>,
    pub rounds: usize,
    pub refills: usize,
    /// The round cap was hit and the tail was drained in queue order
    pub capped: bool,
    pub allocations: Vec<SubjectAllocation>,
}

impl Distribution {
    fn empty() -> Self {
        Self {
            order: Vec::new(),
            rounds: 0,
            refills: 0,
            capped: false,
            allocations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn topic_ids(&self) -> Vec<&TopicId> {
        self.order.iter().map(|t| &t.id).collect()
    }

    /// Subject sequence of the output
    pub fn subject_sequence(&self) -> Vec<SubjectId> {
        self.order.iter().map(|t| t.subject).collect()
    }

    pub fn allocation(&self, subject: SubjectId) -> Option<&SubjectAllocation> {
        self.allocations.iter().find(|a| a.subject == subject)
    }
}

// ============================================================================
// Weighted Distributor
// ============================================================================

/// Weighted round-robin distributor
#[derive(Debug, Clone)]
pub struct WeightedDistributor {
    weight_mode: WeightMode,
    round_cap_factor: usize,
    max_rounds: Option<usize>,
}

impl WeightedDistributor {
    /// Distributor with direct weights and the default round cap
    pub fn new() -> Self {
        Self::from_config(&DistributionConfig::default())
    }

    pub fn from_config(config: &DistributionConfig) -> Self {
        Self {
            weight_mode: config.weight_mode,
            round_cap_factor: config.round_cap_factor.max(1),
            max_rounds: None,
        }
    }

    pub fn with_weight_mode(mut self, mode: WeightMode) -> Self {
        self.weight_mode = mode;
        self
    }

    /// Override the computed round cap
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    pub fn weight_mode(&self) -> WeightMode {
        self.weight_mode
    }

    /// Round cap for a backlog of `total` topics
    pub fn round_cap(&self, total: usize) -> usize {
        self.max_rounds
            .unwrap_or_else(|| total.saturating_mul(self.round_cap_factor))
    }

    /// Order every pending topic of the backlog
    pub fn distribute(&self, backlog: &Backlog) -> Distribution {
        let total = backlog.len();
        if total == 0 {
            tracing::info!("No pending topics to distribute");
            return Distribution::empty();
        }

        let mut queues = self.build_queues(backlog);
        let cap = self.round_cap(total);
        let mut order = Vec::with_capacity(total);
        let mut rounds = 0usize;
        let mut refills = 0usize;
        let mut capped = false;
        let mut phase = Phase::after_round(&queues);

        loop {
            match phase {
                Phase::Distributing => {
                    if rounds >= cap {
                        capped = true;
                        drain_remaining(&mut queues, &mut order);
                        tracing::warn!(
                            rounds,
                            cap,
                            "Round cap reached, draining remaining topics in queue order"
                        );
                        phase = Phase::Done;
                        continue;
                    }
                    rounds += 1;
                    run_round(&mut queues, &mut order);
                }
                Phase::Refilling => {
                    refills += 1;
                    for queue in queues.iter_mut().filter(|q| q.has_topics()) {
                        queue.refill();
                        tracing::debug!(
                            subject = %queue.name,
                            credits = queue.credits,
                            "Credits refilled"
                        );
                    }
                }
                Phase::Done => break,
            }
            phase = Phase::after_round(&queues);
        }

        let allocations = allocations(&queues, order.len());
        for allocation in &allocations {
            tracing::info!(
                subject = %allocation.name,
                weight = allocation.weight,
                topics = allocation.topics,
                expected_pct = %format!("{:.1}", allocation.expected_share_pct),
                actual_pct = %format!("{:.1}", allocation.actual_share_pct),
                "Subject allocation"
            );
        }
        tracing::info!(total = order.len(), rounds, refills, capped, "Distribution complete");

        Distribution {
            order,
            rounds,
            refills,
            capped,
            allocations,
        }
    }

    /// One queue per subject with pending topics, in round order
    fn build_queues(&self, backlog: &Backlog) -> Vec<DisciplineQueue> {
        let registry = backlog.registry();
        let mut queues: Vec<DisciplineQueue> = registry
            .iter()
            .map(|s| {
                let weight = self.weight_mode.effective_weight(s.weight);
                DisciplineQueue::new(s.id, &s.name, s.weight, weight)
            })
            .collect();

        for topic in backlog.pending() {
            if let Some(queue) = queues.get_mut(topic.subject.index()) {
                queue.topics.push_back(topic.clone());
            }
        }

        queues.retain(DisciplineQueue::has_topics);

        for queue in queues.iter().filter(|q| is_clamped(q.configured_weight)) {
            tracing::warn!(
                subject = %queue.name,
                configured = queue.configured_weight,
                effective = queue.weight,
                "Non-positive weight clamped to minimum"
            );
        }

        // stable: equal weights keep registration order
        queues.sort_by(|a, b| b.weight.cmp(&a.weight));
        queues
    }
}

impl Default for WeightedDistributor {
    fn default() -> Self {
        Self::new()
    }
}

fn run_round(queues: &mut [DisciplineQueue], order: &mut Vec<Topic>) {
    for queue in queues.iter_mut() {
        if let Some(topic) = queue.emit() {
            tracing::debug!(
                subject = %queue.name,
                topic_id = %topic.id,
                credits = queue.credits,
                "Topic emitted"
            );
            order.push(topic);
        }
    }
}

fn drain_remaining(queues: &mut [DisciplineQueue], order: &mut Vec<Topic>) {
    for queue in queues.iter_mut() {
        while let Some(topic) = queue.topics.pop_front() {
            queue.emitted += 1;
            order.push(topic);
        }
    }
}

fn allocations(queues: &[DisciplineQueue], total: usize) -> Vec<SubjectAllocation> {
    let weight_sum: f64 = queues.iter().map(|q| q.weight as f64).sum();
    queues
        .iter()
        .map(|q| SubjectAllocation {
            subject: q.subject,
            name: q.name.clone(),
            configured_weight: q.configured_weight,
            weight: q.weight,
            topics: q.emitted,
            expected_share_pct: percent(q.weight as f64, weight_sum),
            actual_share_pct: percent(q.emitted as f64, total as f64),
        })
        .collect()
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

// ============================================================================
// Tests
// ============================================================================
