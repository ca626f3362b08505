//! End-to-end planning: plan file in, dated schedule out

use chrono::NaiveDate;

use super::backlog::{Backlog, DroppedTopic, SubjectRegistry};
use super::calendar::CalendarMapper;
use super::distributor::{Distribution, WeightedDistributor};
use super::error::{SchedulerError, SchedulerResult};
use super::final_stretch::{self, ExcludedTopic};
use super::schedule::StudySchedule;
use crate::config::Config;
use crate::models::StudyPlan;

/// Result of planning one study plan
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub registry: SubjectRegistry,
    pub distribution: Distribution,
    pub schedule: StudySchedule,
    pub dropped: Vec<DroppedTopic>,
    /// New-topic sessions available before the exam
    pub slots: usize,
    /// Topics left out by final stretch, highest priority first
    pub excluded: Vec<ExcludedTopic>,
}

/// Registry, backlog, distributor and calendar mapper wired together
#[derive(Debug, Clone)]
pub struct Planner {
    distributor: WeightedDistributor,
    mapper: CalendarMapper,
}

impl Planner {
    pub fn new(distributor: WeightedDistributor, mapper: CalendarMapper) -> Self {
        Self { distributor, mapper }
    }

    pub fn from_config(config: &Config) -> SchedulerResult<Self> {
        Ok(Self {
            distributor: WeightedDistributor::from_config(&config.distribution),
            mapper: CalendarMapper::new(config.calendar.clone())?,
        })
    }

    pub fn distributor(&self) -> &WeightedDistributor {
        &self.distributor
    }

    /// Normalize the plan's topics against its subjects
    pub fn backlog(plan: &StudyPlan) -> Backlog {
        let registry = SubjectRegistry::from_specs(&plan.subjects);
        Backlog::build(registry, &plan.topics)
    }

    /// Order the plan's pending topics without mapping them to dates
    pub fn distribute(&self, plan: &StudyPlan) -> (Backlog, Distribution) {
        let backlog = Self::backlog(plan);
        let distribution = self.distributor.distribute(&backlog);
        (backlog, distribution)
    }

    /// Full plan: slot check, distribution and calendar
    ///
    /// Starts at `plan.start_date`, or `today` when the plan has none. A
    /// backlog larger than the new-topic sessions left is an
    /// [`SchedulerError::InfeasiblePlan`] unless `final_stretch` is enabled,
    /// in which case only the highest-priority topics are scheduled.
    pub fn plan(&self, plan: &StudyPlan, today: NaiveDate) -> SchedulerResult<PlanOutcome> {
        let start = plan.start_date.unwrap_or(today);
        tracing::info!(
            plan = %plan.name,
            subjects = plan.subjects.len(),
            topics = plan.topics.len(),
            start = %start,
            exam = %plan.exam_date,
            "Planning study schedule"
        );

        let mut backlog = Self::backlog(plan);
        let slots = self.mapper.new_topic_slots(start, plan.exam_date)?;

        let excluded = if backlog.len() > slots {
            if !self.mapper.config().final_stretch {
                tracing::error!(
                    topics = backlog.len(),
                    slots,
                    "Backlog does not fit the sessions left before the exam"
                );
                return Err(SchedulerError::infeasible_plan(backlog.len(), slots));
            }
            final_stretch::select(&mut backlog, slots)
        } else {
            Vec::new()
        };

        let distribution = self.distributor.distribute(&backlog);
        let mut schedule = self.mapper.map(
            &plan.name,
            backlog.registry(),
            &distribution,
            backlog.completed(),
            start,
            plan.exam_date,
        )?;
        schedule.excluded = excluded.iter().map(|e| e.topic.id.clone()).collect();

        Ok(PlanOutcome {
            registry: backlog.registry().clone(),
            distribution,
            schedule,
            dropped: backlog.dropped().to_vec(),
            slots,
            excluded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubjectSpec, TopicRecord};
    use crate::scheduler::backlog::DropReason;

    fn plan() -> StudyPlan {
        StudyPlan {
            name: "Court Clerk".to_string(),
            start_date: None,
            exam_date: NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
            subjects: vec![SubjectSpec::new("Civil Law", 3), SubjectSpec::new("Portuguese", 1)],
            topics: vec![
                TopicRecord::new("1", "Civil Law", "Persons"),
                TopicRecord::new("2", "Civil Law", "Goods"),
                TopicRecord::new("3", "Civil Law", "Contracts"),
                TopicRecord::new("4", "Portuguese", "Syntax"),
                TopicRecord::new("5", "Chemistry", "Bonds"),
            ],
        }
    }

    #[test]
    fn test_plan_end_to_end() {
        let planner = Planner::from_config(&Config::default()).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let outcome = planner.plan(&plan(), today).unwrap();

        assert_eq!(outcome.distribution.len(), 4);
        assert_eq!(outcome.schedule.start_date, today);
        assert_eq!(outcome.schedule.new_topic_sessions().len(), 4);
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(
            outcome.dropped[0].reason,
            DropReason::UnknownSubject {
                name: "Chemistry".into()
            }
        );
    }

    #[test]
    fn test_plan_start_date_overrides_today() {
        let mut plan = plan();
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        plan.start_date = Some(start);

        let planner = Planner::from_config(&Config::default()).unwrap();
        let outcome = planner
            .plan(&plan, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
            .unwrap();
        assert_eq!(outcome.schedule.start_date, start);
    }

    #[test]
    fn test_repeated_subject_still_plans() {
        let mut plan = plan();
        plan.subjects.push(SubjectSpec::new("Portuguese", 2));

        let planner = Planner::from_config(&Config::default()).unwrap();
        let outcome = planner
            .plan(&plan, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
            .unwrap();

        assert_eq!(outcome.registry.len(), 2);
        assert_eq!(outcome.distribution.len(), 4);
        assert_eq!(outcome.schedule.new_topic_sessions().len(), 4);
        // the first registration's weight is the one used
        let portuguese = outcome.registry.resolve("Portuguese").unwrap();
        assert_eq!(outcome.distribution.allocation(portuguese).unwrap().configured_weight, 1);
    }

    fn crowded_plan() -> StudyPlan {
        let mut plan = plan();
        plan.start_date = NaiveDate::from_ymd_opt(2025, 3, 3);
        // Monday to Wednesday at two sessions a day
        plan.exam_date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        plan.topics = (0..8)
            .map(|i| {
                let subject = if i < 4 { "Portuguese" } else { "Civil Law" };
                TopicRecord::new(format!("t{i}").as_str(), subject, "topic")
            })
            .collect();
        plan.topics[0].priority = Some(9);
        plan
    }

    #[test]
    fn test_oversized_backlog_is_infeasible() {
        let planner = Planner::from_config(&Config::default()).unwrap();
        let err = planner
            .plan(&crowded_plan(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
            .unwrap_err();

        assert!(matches!(
            err,
            SchedulerError::InfeasiblePlan { topics: 8, slots: 6 }
        ));
    }

    #[test]
    fn test_final_stretch_keeps_highest_priority() {
        let mut config = Config::default();
        config.calendar.final_stretch = true;
        let planner = Planner::from_config(&config).unwrap();
        let outcome = planner
            .plan(&crowded_plan(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
            .unwrap();

        // Civil Law topics score 33, t0 scores 19, other Portuguese topics 13
        assert_eq!(outcome.slots, 6);
        let excluded: Vec<_> = outcome.excluded.iter().map(|e| e.topic.id.as_str()).collect();
        assert_eq!(excluded, vec!["t2", "t3"]);
        assert_eq!(outcome.distribution.len(), 6);
        assert!(outcome.schedule.unscheduled.is_empty());
        assert_eq!(outcome.schedule.excluded.len(), 2);

        let scheduled: Vec<_> = outcome
            .schedule
            .new_topic_sessions()
            .iter()
            .filter_map(|s| s.topic.as_ref().map(|t| t.as_str().to_string()))
            .collect();
        assert!(scheduled.contains(&"t0".to_string()));
        assert!(scheduled.contains(&"t1".to_string()));
    }
}
