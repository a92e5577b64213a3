//! Workforce accounting and the daily demand histogram.
//!
//! The histogram is built with a sorted-event sweep: each task contributes a
//! `+workers` event on its start day and a `-workers` event the day after it
//! finishes. Sorting the events and walking them once gives the demand of every
//! active day in O(n log n + D) instead of comparing tasks pairwise per day.

use std::collections::BTreeMap;

use canteiro_core::{Day, ScheduleTask, TaskUid};
use chrono::NaiveDate;

/// Workers a task occupies on every day it is active.
///
/// Sums the units of its labor resources. Tasks without labor (pure material
/// or equipment rows) still take one crew-scheduling slot, so the result is
/// never below 1.
pub fn task_worker_count(task: &ScheduleTask) -> u32 {
    let units: f64 = task
        .resources
        .iter()
        .filter(|r| r.is_labor())
        .map(|r| r.units.max(0.0))
        .sum();
    // Drop float noise left by proportional splits before rounding up
    let units = (units * 1e6).round() / 1e6;
    (units.ceil() as u32).max(1)
}

/// Day range a task occupies, never inverted
pub(crate) fn active_range(task: &ScheduleTask) -> (Day, Day) {
    let start = Day::from_date(task.start_date);
    let finish = Day::from_date(task.finish_date);
    (start, finish.max(start))
}

pub(crate) fn is_active_on(task: &ScheduleTask, day: Day) -> bool {
    let (start, end) = active_range(task);
    start <= day && day <= end
}

/// Aggregate workforce demand per day for all non-summary tasks.
///
/// Days on which no task is active are absent from the map.
pub fn build_daily_histogram(tasks: &[ScheduleTask]) -> BTreeMap<NaiveDate, u32> {
    WorkforceTimeline::from_tasks(tasks, u32::MAX).to_dates()
}

/// A run of consecutive days above the workforce limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverloadPeriod {
    pub start: Day,
    pub end: Day,
    pub peak: u32,
}

/// Day-indexed workforce usage against a capacity
#[derive(Debug, Clone)]
pub struct WorkforceTimeline {
    pub capacity: u32,
    usage: BTreeMap<Day, u32>,
}

impl WorkforceTimeline {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            usage: BTreeMap::new(),
        }
    }

    /// Sweep all non-summary tasks into a timeline
    pub fn from_tasks(tasks: &[ScheduleTask], capacity: u32) -> Self {
        // (day, worker delta, active-task delta)
        let mut events: Vec<(Day, i64, i64)> = Vec::with_capacity(tasks.len() * 2);
        for task in tasks.iter().filter(|t| !t.is_summary) {
            let (start, end) = active_range(task);
            let workers = i64::from(task_worker_count(task));
            events.push((start, workers, 1));
            events.push((end.succ(), -workers, -1));
        }
        events.sort_unstable();

        let mut usage = BTreeMap::new();
        let mut workers = 0i64;
        let mut active = 0i64;
        let mut i = 0;
        while i < events.len() {
            let day = events[i].0;
            while i < events.len() && events[i].0 == day {
                workers += events[i].1;
                active += events[i].2;
                i += 1;
            }
            if active > 0 {
                if let Some(&(next_day, _, _)) = events.get(i) {
                    let mut d = day;
                    while d < next_day {
                        usage.insert(d, workers.max(0) as u32);
                        d = d.succ();
                    }
                }
            }
        }

        Self { capacity, usage }
    }

    /// Add usage for a task over `[start, end]`
    pub fn add_usage(&mut self, start: Day, end: Day, workers: u32) {
        let mut day = start;
        while day <= end {
            *self.usage.entry(day).or_insert(0) += workers;
            day = day.succ();
        }
    }

    /// Remove usage previously added over `[start, end]`
    pub fn remove_usage(&mut self, start: Day, end: Day, workers: u32) {
        let mut day = start;
        while day <= end {
            if let Some(total) = self.usage.get_mut(&day) {
                *total = total.saturating_sub(workers);
                if *total == 0 {
                    self.usage.remove(&day);
                }
            }
            day = day.succ();
        }
    }

    pub fn total(&self, day: Day) -> u32 {
        self.usage.get(&day).copied().unwrap_or(0)
    }

    pub fn is_overloaded(&self, day: Day) -> bool {
        self.total(day) > self.capacity
    }

    /// First overloaded day on or after `from`
    pub fn next_overloaded_day(&self, from: Day) -> Option<Day> {
        self.usage
            .range(from..)
            .find(|(_, &total)| total > self.capacity)
            .map(|(&day, _)| day)
    }

    /// Last day of the consecutive overloaded run that contains `day`
    pub fn overloaded_run_end(&self, day: Day) -> Day {
        let mut end = day;
        while self.is_overloaded(end.succ()) {
            end = end.succ();
        }
        end
    }

    /// All over-capacity periods, consecutive days merged
    pub fn overload_periods(&self) -> Vec<OverloadPeriod> {
        let mut periods = Vec::new();
        let mut current: Option<OverloadPeriod> = None;

        for (&day, &total) in &self.usage {
            if total > self.capacity {
                match &mut current {
                    Some(period) if period.end.succ() == day => {
                        period.end = day;
                        period.peak = period.peak.max(total);
                    }
                    _ => {
                        if let Some(period) = current.take() {
                            periods.push(period);
                        }
                        current = Some(OverloadPeriod {
                            start: day,
                            end: day,
                            peak: total,
                        });
                    }
                }
            } else if let Some(period) = current.take() {
                periods.push(period);
            }
        }

        if let Some(period) = current {
            periods.push(period);
        }

        periods
    }

    pub fn peak(&self) -> u32 {
        self.usage.values().copied().max().unwrap_or(0)
    }

    pub fn to_dates(&self) -> BTreeMap<NaiveDate, u32> {
        self.usage
            .iter()
            .map(|(day, total)| (day.to_date(), *total))
            .collect()
    }
}

/// Over-limit periods of an already built histogram
pub fn overload_periods(histogram: &BTreeMap<NaiveDate, u32>, limit: u32) -> Vec<OverloadPeriod> {
    let usage = histogram
        .iter()
        .map(|(date, total)| (Day::from_date(*date), *total))
        .collect();
    WorkforceTimeline {
        capacity: limit,
        usage,
    }
    .overload_periods()
}

/// Summary figures of a daily histogram
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramStats {
    pub peak_day: Option<NaiveDate>,
    pub peak_workers: u32,
    /// Mean demand over days with any activity
    pub average_workers: f64,
    pub active_days: usize,
}

pub fn histogram_stats(histogram: &BTreeMap<NaiveDate, u32>) -> HistogramStats {
    let mut peak_day = None;
    let mut peak_workers = 0;
    for (&day, &total) in histogram {
        if total > peak_workers {
            peak_workers = total;
            peak_day = Some(day);
        }
    }
    let sum: u64 = histogram.values().map(|&t| u64::from(t)).sum();
    let average_workers = if histogram.is_empty() {
        0.0
    } else {
        sum as f64 / histogram.len() as f64
    };

    HistogramStats {
        peak_day,
        peak_workers,
        average_workers,
        active_days: histogram.len(),
    }
}

/// Non-summary tasks active anywhere in `[start, end]`, in uid order
pub(crate) fn tasks_overlapping(
    tasks: &[ScheduleTask],
    start: Day,
    end: Day,
) -> Vec<&ScheduleTask> {
    let mut found: Vec<&ScheduleTask> = tasks
        .iter()
        .filter(|t| !t.is_summary)
        .filter(|t| {
            let (s, e) = active_range(t);
            s <= end && start <= e
        })
        .collect();
    found.sort_by_key(|t| t.uid);
    found
}

/// Calendar-day span of the non-summary tasks, 0 when there are none
pub fn schedule_span_days(tasks: &[ScheduleTask]) -> i64 {
    let mut leaves = tasks.iter().filter(|t| !t.is_summary).map(active_range);
    let Some((first_start, first_end)) = leaves.next() else {
        return 0;
    };
    let (start, end) = leaves.fold((first_start, first_end), |(s, e), (ts, te)| {
        (s.min(ts), e.max(te))
    });
    start.days_until(end) + 1
}

pub(crate) fn uid_list(tasks: &[&ScheduleTask]) -> Vec<TaskUid> {
    tasks.iter().map(|t| t.uid).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteiro_core::{ResourceKind, TaskResource};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn worker_count_sums_labor_only() {
        let task = ScheduleTask::new(1, "Alvenaria", d(1), d(5))
            .labor("Pedreiro", 4.0)
            .labor("Servente", 3.0)
            .material("Bloco cerâmico", 2400.0)
            .machinery("Betoneira", 1.0);
        assert_eq!(task_worker_count(&task), 7);
    }

    #[test]
    fn worker_count_defaults_to_one() {
        let material_only =
            ScheduleTask::new(1, "Entrega de aço", d(1), d(1)).material("CA-50", 5.0);
        let empty = ScheduleTask::new(2, "Marco", d(1), d(1)).milestone();
        assert_eq!(task_worker_count(&material_only), 1);
        assert_eq!(task_worker_count(&empty), 1);
    }

    #[test]
    fn worker_count_rounds_fractions_up() {
        let mut task = ScheduleTask::new(1, "Pintura", d(1), d(2));
        task.resources.push(TaskResource::new("Pintor", ResourceKind::Labor, 2.5));
        assert_eq!(task_worker_count(&task), 3);

        let mut noisy = ScheduleTask::new(2, "Pintura", d(1), d(2));
        noisy
            .resources
            .push(TaskResource::new("Pintor", ResourceKind::Labor, 7.199_999_999_999_999));
        noisy
            .resources
            .push(TaskResource::new("Ajudante", ResourceKind::Labor, 0.800_000_000_000_000_1));
        assert_eq!(task_worker_count(&noisy), 8);
    }

    #[test]
    fn histogram_sums_overlapping_days() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(3)).labor("Pedreiro", 5.0),
            ScheduleTask::new(2, "B", d(3), d(4)).labor("Servente", 2.0),
        ];
        let histogram = build_daily_histogram(&tasks);

        let expected: BTreeMap<NaiveDate, u32> =
            [(d(1), 5), (d(2), 5), (d(3), 7), (d(4), 2)].into_iter().collect();
        assert_eq!(histogram, expected);
    }

    #[test]
    fn histogram_skips_summary_tasks() {
        let tasks = vec![
            ScheduleTask::new(1, "Fase 1", d(1), d(10)).summary().labor("X", 50.0),
            ScheduleTask::new(2, "Fase 2", d(5), d(12)).summary(),
        ];
        assert!(build_daily_histogram(&tasks).is_empty());
    }

    #[test]
    fn histogram_leaves_idle_gaps_out() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(2)).labor("P", 1.0),
            ScheduleTask::new(2, "B", d(5), d(5)).labor("P", 1.0),
        ];
        let histogram = build_daily_histogram(&tasks);
        assert_eq!(histogram.len(), 3);
        assert!(!histogram.contains_key(&d(3)));
    }

    #[test]
    fn timeline_tracks_add_and_remove() {
        let mut timeline = WorkforceTimeline::new(10);
        let start = Day::from(d(1));
        let end = Day::from(d(3));

        timeline.add_usage(start, end, 6);
        timeline.add_usage(start, start, 6);
        assert!(timeline.is_overloaded(start));
        assert!(!timeline.is_overloaded(end));

        timeline.remove_usage(start, end, 6);
        assert_eq!(timeline.total(start), 6);
        assert_eq!(timeline.total(end), 0);
    }

    #[test]
    fn overload_periods_merge_consecutive_days() {
        let mut timeline = WorkforceTimeline::new(10);
        let day = |n| Day::from(d(n));

        timeline.add_usage(day(1), day(2), 12);
        timeline.add_usage(day(3), day(3), 8);
        timeline.add_usage(day(5), day(5), 15);

        let periods = timeline.overload_periods();
        assert_eq!(periods.len(), 2);
        assert_eq!((periods[0].start, periods[0].end, periods[0].peak), (day(1), day(2), 12));
        assert_eq!((periods[1].start, periods[1].end, periods[1].peak), (day(5), day(5), 15));
        assert_eq!(timeline.next_overloaded_day(day(3)), Some(day(5)));
        assert_eq!(timeline.overloaded_run_end(day(1)), day(2));
    }

    #[test]
    fn overload_periods_from_histogram() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(4)).labor("Pedreiro", 12.0),
            ScheduleTask::new(2, "B", d(3), d(6)).labor("Servente", 6.0),
        ];
        let periods = overload_periods(&build_daily_histogram(&tasks), 15);
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].start.to_date(), d(3));
        assert_eq!(periods[0].end.to_date(), d(4));
        assert_eq!(periods[0].peak, 18);
    }

    #[test]
    fn stats_report_peak_and_average() {
        let histogram: BTreeMap<NaiveDate, u32> =
            [(d(1), 4), (d(2), 10), (d(3), 10), (d(4), 0)].into_iter().collect();
        let stats = histogram_stats(&histogram);
        assert_eq!(stats.peak_day, Some(d(2)));
        assert_eq!(stats.peak_workers, 10);
        assert_eq!(stats.active_days, 4);
        assert!((stats.average_workers - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn span_covers_leaf_tasks_only() {
        let tasks = vec![
            ScheduleTask::new(1, "Obra", d(1), d(31)).summary(),
            ScheduleTask::new(2, "A", d(3), d(5)),
            ScheduleTask::new(3, "B", d(4), d(9)),
        ];
        assert_eq!(schedule_span_days(&tasks), 7);
        assert_eq!(schedule_span_days(&[]), 0);
    }
}
