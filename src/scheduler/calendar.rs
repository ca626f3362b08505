//! Calendar-constraint mapping
//!
//! Walks a [`Distribution`] and assigns every topic a concrete date between
//! the start date and the exam date.
//!
//! Placement rules, applied in this order:
//!
//! 1. Essays: with `essay_sundays` on, every Sunday that has capacity gets one
//!    essay session. Sundays are then closed to new topics.
//! 2. New topics: in distribution order, each topic takes the first date on or
//!    after the previous new-topic date that is allowed (Mon-Fri when
//!    `weekday_only_new_topics`) and still has room.
//! 3. Reviews: for every studied or previously completed topic and every
//!    configured offset, the first Saturday on or after `base + offset` that
//!    still has room, up to the exam date.
//!
//! Daily capacity is `floor(hours * 60 / session_duration_minutes)`.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::HashMap;

use super::backlog::SubjectRegistry;
use super::distributor::Distribution;
use super::error::{SchedulerError, SchedulerResult};
use super::schedule::{StudySchedule, StudySession};
use crate::config::CalendarConfig;
use crate::models::{CompletedTopic, Topic};

/// Maps an ordered topic sequence onto dates
#[derive(Debug, Clone)]
pub struct CalendarMapper {
    config: CalendarConfig,
}

impl CalendarMapper {
    pub fn new(config: CalendarConfig) -> SchedulerResult<Self> {
        if config.session_duration_minutes == 0 {
            return Err(SchedulerError::InvalidSessionDuration { minutes: 0 });
        }
        if config.review_offsets_days.contains(&0) {
            return Err(SchedulerError::invalid_calendar(
                "review_offsets_days",
                "offsets must be positive",
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    /// Number of sessions that fit on a date
    pub fn capacity(&self, date: NaiveDate) -> usize {
        let hours = self.config.study_hours.for_weekday(date.weekday());
        if !hours.is_finite() || hours <= 0.0 {
            return 0;
        }
        (hours * 60.0 / f64::from(self.config.session_duration_minutes)).floor() as usize
    }

    /// Whether a new topic may be studied on this date at all
    pub fn allows_new_topic(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday();
        if self.config.essay_sundays && weekday == Weekday::Sun {
            return false;
        }
        if self.config.weekday_only_new_topics && matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return false;
        }
        true
    }

    /// New-topic sessions available in `[start, exam]`
    ///
    /// Every backlog of at most this many topics maps without leaving
    /// anything unscheduled.
    pub fn new_topic_slots(&self, start: NaiveDate, exam: NaiveDate) -> SchedulerResult<usize> {
        if exam < start {
            return Err(SchedulerError::invalid_date_range(start, exam));
        }
        Ok(dates(start, exam)
            .filter(|d| self.allows_new_topic(*d))
            .map(|d| self.capacity(d))
            .sum())
    }

    /// Build the dated schedule
    pub fn map(
        &self,
        plan_name: &str,
        registry: &SubjectRegistry,
        distribution: &Distribution,
        completed: &[CompletedTopic],
        start: NaiveDate,
        exam: NaiveDate,
    ) -> SchedulerResult<StudySchedule> {
        if exam < start {
            return Err(SchedulerError::invalid_date_range(start, exam));
        }

        let mut agenda = Agenda::new(self);
        let mut schedule = StudySchedule::new(plan_name, start, exam);

        if self.config.essay_sundays {
            self.place_essays(&mut agenda, &mut schedule, start, exam);
        }

        let studied = self.place_new_topics(&mut agenda, &mut schedule, registry, distribution, start, exam);

        if self.config.reviews_enabled {
            let bases = completed
                .iter()
                .map(|c| (&c.topic, c.completed_on))
                .chain(studied.iter().map(|(topic, date)| (*topic, *date)));
            for (topic, base) in bases {
                self.place_reviews(&mut agenda, &mut schedule, registry, topic, base);
            }
        }

        // stable: sessions of one day keep placement order
        schedule.sessions.sort_by_key(|s| s.date);

        tracing::info!(
            plan = %plan_name,
            sessions = schedule.sessions.len(),
            unscheduled = schedule.unscheduled.len(),
            unplaced_reviews = schedule.unplaced_reviews,
            "Calendar mapping complete"
        );

        Ok(schedule)
    }

    fn place_essays(
        &self,
        agenda: &mut Agenda<'_>,
        schedule: &mut StudySchedule,
        start: NaiveDate,
        exam: NaiveDate,
    ) {
        let mut essays = 0usize;
        for date in dates(start, exam).filter(|d| d.weekday() == Weekday::Sun) {
            if agenda.try_book(date) {
                schedule.sessions.push(StudySession::essay(date));
                essays += 1;
            }
        }
        tracing::debug!(essays, "Essay Sundays reserved");
    }

    /// Returns each placed topic with its study date
    fn place_new_topics<'a>(
        &self,
        agenda: &mut Agenda<'_>,
        schedule: &mut StudySchedule,
        registry: &SubjectRegistry,
        distribution: &'a Distribution,
        start: NaiveDate,
        exam: NaiveDate,
    ) -> Vec<(&'a Topic, NaiveDate)> {
        let mut studied = Vec::with_capacity(distribution.len());
        let mut cursor = Some(start);

        for (sequence, topic) in distribution.order.iter().enumerate() {
            let slot = cursor.and_then(|from| {
                dates(from, exam).find(|d| self.allows_new_topic(*d) && agenda.has_room(*d))
            });

            match slot {
                Some(date) => {
                    agenda.try_book(date);
                    schedule.sessions.push(StudySession::new_topic(
                        date,
                        topic,
                        registry.name(topic.subject),
                        sequence,
                    ));
                    studied.push((topic, date));
                    cursor = Some(date);
                }
                None => {
                    // nothing after the cursor has room, so nothing later will fit either
                    cursor = None;
                    schedule.unscheduled.push(topic.id.clone());
                }
            }
        }

        if !schedule.unscheduled.is_empty() {
            tracing::warn!(
                unscheduled = schedule.unscheduled.len(),
                exam = %exam,
                "Not every topic fits before the exam date"
            );
        }

        studied
    }

    fn place_reviews(
        &self,
        agenda: &mut Agenda<'_>,
        schedule: &mut StudySchedule,
        registry: &SubjectRegistry,
        topic: &Topic,
        base: NaiveDate,
    ) {
        for &offset in &self.config.review_offsets_days {
            let Some(target) = base.checked_add_days(Days::new(u64::from(offset))) else {
                continue;
            };
            if target < schedule.start_date || target > schedule.exam_date {
                continue;
            }

            let saturday = dates(target, schedule.exam_date)
                .filter(|d| d.weekday() == Weekday::Sat)
                .find(|d| agenda.has_room(*d));

            match saturday {
                Some(date) => {
                    agenda.try_book(date);
                    schedule.sessions.push(StudySession::review(
                        date,
                        topic,
                        registry.name(topic.subject),
                        offset,
                    ));
                }
                None => {
                    schedule.unplaced_reviews += 1;
                    tracing::debug!(
                        topic_id = %topic.id,
                        offset,
                        target = %target,
                        "No Saturday room left for review"
                    );
                }
            }
        }
    }
}

/// Sessions booked per date
struct Agenda<'m> {
    mapper: &'m CalendarMapper,
    booked: HashMap<NaiveDate, usize>,
}

impl<'m> Agenda<'m> {
    fn new(mapper: &'m CalendarMapper) -> Self {
        Self {
            mapper,
            booked: HashMap::new(),
        }
    }

    fn has_room(&self, date: NaiveDate) -> bool {
        self.booked.get(&date).copied().unwrap_or(0) < self.mapper.capacity(date)
    }

    fn try_book(&mut self, date: NaiveDate) -> bool {
        if !self.has_room(date) {
            return false;
        }
        *self.booked.entry(date).or_insert(0) += 1;
        true
    }
}

/// Every date in `[from, to]`
fn dates(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(from), |d| d.succ_opt()).take_while(move |d| *d <= to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeeklyHours;
    use crate::models::{SubjectSpec, TopicRecord};
    use crate::scheduler::backlog::Backlog;
    use crate::scheduler::distributor::WeightedDistributor;
    use crate::scheduler::schedule::SessionKind;

    // 2025-03-03 is a Monday
    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn config(hours: f64) -> CalendarConfig {
        CalendarConfig {
            session_duration_minutes: 60,
            study_hours: WeeklyHours::uniform(hours),
            reviews_enabled: false,
            ..CalendarConfig::default()
        }
    }

    fn backlog(topics: usize) -> Backlog {
        let registry = SubjectRegistry::from_specs(&[
            SubjectSpec::new("Civil Law", 2),
            SubjectSpec::new("Portuguese", 1),
        ]);
        let records: Vec<_> = (0..topics)
            .map(|i| {
                let subject = if i % 2 == 0 { "Civil Law" } else { "Portuguese" };
                TopicRecord::new(format!("t{i}").as_str(), subject, "topic")
            })
            .collect();
        Backlog::build(registry, &records)
    }

    fn map(mapper: &CalendarMapper, backlog: &Backlog, start: NaiveDate, exam: NaiveDate) -> StudySchedule {
        let distribution = WeightedDistributor::new().distribute(backlog);
        mapper
            .map("test", backlog.registry(), &distribution, backlog.completed(), start, exam)
            .unwrap()
    }

    #[test]
    fn test_capacity_floors_hours() {
        let mut cfg = config(0.0);
        cfg.session_duration_minutes = 50;
        cfg.study_hours.set(Weekday::Mon, 2.0);
        cfg.study_hours.set(Weekday::Tue, 0.5);
        let mapper = CalendarMapper::new(cfg).unwrap();

        assert_eq!(mapper.capacity(day(3)), 2); // 120 / 50
        assert_eq!(mapper.capacity(day(4)), 0); // 30 / 50
        assert_eq!(mapper.capacity(day(5)), 0);
    }

    #[test]
    fn test_new_topic_slots() {
        let mut cfg = config(2.0);
        cfg.essay_sundays = true;
        let mapper = CalendarMapper::new(cfg).unwrap();

        // Mar 3rd to Mar 16th: ten weekdays at two sessions each
        assert_eq!(mapper.new_topic_slots(day(3), day(16)).unwrap(), 20);
        assert!(mapper.new_topic_slots(day(16), day(3)).is_err());
    }

    #[test]
    fn test_backlog_within_slots_is_fully_placed() {
        let mapper = CalendarMapper::new(config(2.0)).unwrap();
        let slots = mapper.new_topic_slots(day(3), day(7)).unwrap();
        let schedule = map(&mapper, &backlog(slots), day(3), day(7));

        assert_eq!(slots, 10);
        assert!(schedule.unscheduled.is_empty());
        assert_eq!(schedule.new_topic_sessions().len(), 10);
    }

    #[test]
    fn test_rejects_zero_duration() {
        let mut cfg = config(2.0);
        cfg.session_duration_minutes = 0;
        assert!(matches!(
            CalendarMapper::new(cfg),
            Err(SchedulerError::InvalidSessionDuration { minutes: 0 })
        ));
    }

    #[test]
    fn test_rejects_exam_before_start() {
        let mapper = CalendarMapper::new(config(2.0)).unwrap();
        let backlog = backlog(2);
        let distribution = WeightedDistributor::new().distribute(&backlog);
        let err = mapper
            .map("test", backlog.registry(), &distribution, &[], day(10), day(3))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_new_topics_fill_weekdays_in_order() {
        let mapper = CalendarMapper::new(config(2.0)).unwrap();
        let backlog = backlog(12);
        let schedule = map(&mapper, &backlog, day(3), day(31));

        let sessions = schedule.new_topic_sessions();
        assert_eq!(sessions.len(), 12);
        // two per weekday: Mon..Fri, then Mon
        let dates: Vec<_> = sessions.iter().map(|s| s.date).collect();
        assert_eq!(dates[0], day(3));
        assert_eq!(dates[1], day(3));
        assert_eq!(dates[9], day(7));
        assert_eq!(dates[10], day(10));
        assert!(dates.windows(2).all(|w| w[0] <= w[1]));
        assert!(schedule.unscheduled.is_empty());
    }

    #[test]
    fn test_weekends_allowed_when_not_weekday_only() {
        let mut cfg = config(1.0);
        cfg.weekday_only_new_topics = false;
        let mapper = CalendarMapper::new(cfg).unwrap();
        let schedule = map(&mapper, &backlog(7), day(3), day(31));

        let last = schedule.new_topic_sessions().last().map(|s| s.date);
        assert_eq!(last, Some(day(9)));
    }

    #[test]
    fn test_overflow_reported_as_unscheduled() {
        let mapper = CalendarMapper::new(config(1.0)).unwrap();
        // Mon..Wed gives three slots
        let schedule = map(&mapper, &backlog(5), day(3), day(5));

        assert_eq!(schedule.new_topic_sessions().len(), 3);
        assert_eq!(schedule.unscheduled.len(), 2);
    }

    #[test]
    fn test_essay_sundays_reserved() {
        let mut cfg = config(1.0);
        cfg.essay_sundays = true;
        cfg.weekday_only_new_topics = false;
        let mapper = CalendarMapper::new(cfg).unwrap();
        let schedule = map(&mapper, &backlog(10), day(3), day(16));

        let essays: Vec<_> = schedule
            .sessions
            .iter()
            .filter(|s| s.kind == SessionKind::Essay)
            .map(|s| s.date)
            .collect();
        assert_eq!(essays, vec![day(9), day(16)]);
        assert!(schedule
            .new_topic_sessions()
            .iter()
            .all(|s| s.date.weekday() != Weekday::Sun));
    }

    #[test]
    fn test_reviews_land_on_saturdays() {
        let mut cfg = config(2.0);
        cfg.reviews_enabled = true;
        let mapper = CalendarMapper::new(cfg).unwrap();
        let schedule = map(&mapper, &backlog(1), day(3), day(31));

        let reviews: Vec<_> = schedule
            .sessions
            .iter()
            .filter(|s| s.kind.is_review())
            .map(|s| (s.kind, s.date))
            .collect();
        // studied Mon 3rd: +7 = Mon 10th -> Sat 15th, +14 -> Sat 22nd, +28 = 31st is past the last Saturday
        assert_eq!(
            reviews,
            vec![
                (SessionKind::Review { offset_days: 7 }, day(15)),
                (SessionKind::Review { offset_days: 14 }, day(22)),
            ]
        );
        assert_eq!(schedule.unplaced_reviews, 1);
    }

    #[test]
    fn test_completed_topics_get_reviews() {
        let mut cfg = config(2.0);
        cfg.reviews_enabled = true;
        let mapper = CalendarMapper::new(cfg).unwrap();

        let registry = SubjectRegistry::from_specs(&[SubjectSpec::new("Civil Law", 1)]);
        let records = vec![TopicRecord::new("done", "Civil Law", "Persons").completed(day(1))];
        let backlog = Backlog::build(registry, &records);
        let schedule = map(&mapper, &backlog, day(3), day(31));

        // +7 = 8th (Sat), +14 = 15th (Sat), +28 = 29th (Sat)
        let dates: Vec<_> = schedule.sessions.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(8), day(15), day(29)]);
    }

    #[test]
    fn test_review_before_start_is_skipped() {
        let mut cfg = config(2.0);
        cfg.reviews_enabled = true;
        let mapper = CalendarMapper::new(cfg).unwrap();

        let registry = SubjectRegistry::from_specs(&[SubjectSpec::new("Civil Law", 1)]);
        let records = vec![TopicRecord::new("old", "Civil Law", "Persons")
            .completed(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())];
        let backlog = Backlog::build(registry, &records);
        let schedule = map(&mapper, &backlog, day(3), day(31));

        // Feb 8th, Feb 15th and Mar 1st are all before the start date
        assert!(schedule.is_empty());
        assert_eq!(schedule.unplaced_reviews, 0);
    }

    #[test]
    fn test_single_day_range() {
        let mapper = CalendarMapper::new(config(3.0)).unwrap();
        let schedule = map(&mapper, &backlog(2), day(3), day(3));
        assert_eq!(schedule.len(), 2);
    }
}
