//! Total float calculation
//!
//! CPM-style float over a schedule whose dates are already fixed:
//!
//! 1. Critical-path tasks: float 0, critical.
//! 2. Tasks with finish-to-start successors: earliest successor start minus own finish.
//! 3. Tasks without successors: project finish minus own finish.
//!
//! Float is whole calendar days and never negative. A successor starting on
//! the same day the task finishes gives float 0.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use canteiro_core::{Day, ScheduleTask, TaskFloat, TaskUid};
use chrono::NaiveDate;

use crate::workforce::active_range;

/// Float of every non-summary task, project finish taken from the latest task
pub fn compute_task_floats(
    tasks: &[ScheduleTask],
    critical_path: &BTreeSet<TaskUid>,
) -> BTreeMap<TaskUid, TaskFloat> {
    let horizon = latest_finish(tasks);
    match horizon {
        Some(horizon) => floats_against(tasks, critical_path, horizon),
        None => BTreeMap::new(),
    }
}

/// Float of every non-summary task against an explicit project finish.
///
/// The effective finish is never earlier than the latest task finish.
pub fn compute_task_floats_until(
    tasks: &[ScheduleTask],
    critical_path: &BTreeSet<TaskUid>,
    project_finish: NaiveDate,
) -> BTreeMap<TaskUid, TaskFloat> {
    let requested = Day::from_date(project_finish);
    let horizon = latest_finish(tasks).map_or(requested, |latest| latest.max(requested));
    floats_against(tasks, critical_path, horizon)
}

fn latest_finish(tasks: &[ScheduleTask]) -> Option<Day> {
    tasks
        .iter()
        .filter(|t| !t.is_summary)
        .map(|t| active_range(t).1)
        .max()
}

fn floats_against(
    tasks: &[ScheduleTask],
    critical_path: &BTreeSet<TaskUid>,
    horizon: Day,
) -> BTreeMap<TaskUid, TaskFloat> {
    // Earliest start of any task holding an FS reference to the key
    let mut earliest_successor: HashMap<TaskUid, Day> = HashMap::new();
    for task in tasks {
        let start = Day::from_date(task.start_date);
        for pred in task.predecessors.iter().filter(|p| p.is_finish_to_start()) {
            earliest_successor
                .entry(pred.uid)
                .and_modify(|s| *s = (*s).min(start))
                .or_insert(start);
        }
    }

    tasks
        .iter()
        .filter(|t| !t.is_summary)
        .map(|task| {
            let float = if critical_path.contains(&task.uid) {
                TaskFloat {
                    task_uid: task.uid,
                    total_float_days: 0,
                    is_critical: true,
                }
            } else {
                let finish = active_range(task).1;
                let limit = earliest_successor.get(&task.uid).copied().unwrap_or(horizon);
                TaskFloat {
                    task_uid: task.uid,
                    total_float_days: finish.days_until(limit).max(0),
                    is_critical: false,
                }
            };
            (task.uid, float)
        })
        .collect()
}

/// Remaining float per task while tasks are being shifted.
///
/// Critical tasks have no budget at all, so they can never be moved.
#[derive(Debug, Clone, Default)]
pub struct FloatBudget {
    remaining: HashMap<TaskUid, i64>,
}

impl FloatBudget {
    pub fn new(floats: &BTreeMap<TaskUid, TaskFloat>) -> Self {
        let remaining = floats
            .values()
            .filter(|f| !f.is_critical)
            .map(|f| (f.task_uid, f.total_float_days))
            .collect();
        Self { remaining }
    }

    pub fn remaining(&self, uid: TaskUid) -> i64 {
        self.remaining.get(&uid).copied().unwrap_or(0)
    }

    /// Whether the task can move forward by exactly `days`
    pub fn can_shift(&self, uid: TaskUid, days: i64) -> bool {
        days > 0 && self.remaining(uid) >= days
    }

    pub fn consume(&mut self, uid: TaskUid, days: i64) {
        if let Some(remaining) = self.remaining.get_mut(&uid) {
            *remaining = (*remaining - days).max(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteiro_core::LinkType;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn critical(uids: &[TaskUid]) -> BTreeSet<TaskUid> {
        uids.iter().copied().collect()
    }

    #[test]
    fn critical_tasks_have_zero_float() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(3)),
            ScheduleTask::new(2, "B", d(10), d(12)),
        ];
        let floats = compute_task_floats(&tasks, &critical(&[1]));

        assert!(floats[&1].is_critical);
        assert_eq!(floats[&1].total_float_days, 0);
        assert!(!floats[&2].is_critical);
    }

    #[test]
    fn float_runs_to_earliest_fs_successor() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(3)),
            ScheduleTask::new(2, "B", d(8), d(9)).depends_on(1),
            ScheduleTask::new(3, "C", d(6), d(9)).depends_on(1),
        ];
        let floats = compute_task_floats(&tasks, &BTreeSet::new());
        assert_eq!(floats[&1].total_float_days, 3);
    }

    #[test]
    fn successor_on_finish_day_is_zero_not_negative() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(5)),
            ScheduleTask::new(2, "B", d(5), d(9)).depends_on(1),
            ScheduleTask::new(3, "C", d(2), d(3)),
            ScheduleTask::new(4, "D", d(1), d(9)).depends_on(3),
        ];
        let floats = compute_task_floats(&tasks, &BTreeSet::new());
        assert_eq!(floats[&1].total_float_days, 0);
        assert_eq!(floats[&3].total_float_days, 0);
    }

    #[test]
    fn non_fs_links_do_not_bound_float() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(3)),
            ScheduleTask::new(2, "B", d(2), d(12)).with_predecessor(1, LinkType::StartToStart),
        ];
        let floats = compute_task_floats(&tasks, &BTreeSet::new());
        assert_eq!(floats[&1].total_float_days, 9);
    }

    #[test]
    fn project_finish_extends_float_of_terminal_tasks() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(10)),
            ScheduleTask::new(2, "B", d(8), d(15)),
        ];
        let floats = compute_task_floats_until(&tasks, &BTreeSet::new(), d(31));
        assert_eq!(floats[&2].total_float_days, 16);

        // An earlier finish never cuts below the latest task
        let floats = compute_task_floats_until(&tasks, &BTreeSet::new(), d(12));
        assert_eq!(floats[&2].total_float_days, 0);
        assert_eq!(floats[&1].total_float_days, 5);
    }

    #[test]
    fn summary_tasks_are_skipped() {
        let tasks = vec![
            ScheduleTask::new(1, "Fase", d(1), d(20)).summary(),
            ScheduleTask::new(2, "A", d(1), d(5)),
        ];
        let floats = compute_task_floats(&tasks, &BTreeSet::new());
        assert_eq!(floats.len(), 1);
        assert!(floats.contains_key(&2));
        assert!(compute_task_floats(&[], &BTreeSet::new()).is_empty());
    }

    #[test]
    fn budget_blocks_critical_and_tracks_consumption() {
        let tasks = vec![
            ScheduleTask::new(1, "A", d(1), d(3)),
            ScheduleTask::new(2, "B", d(1), d(5)),
        ];
        let floats = compute_task_floats(&tasks, &critical(&[2]));
        let mut budget = FloatBudget::new(&floats);

        assert!(!budget.can_shift(2, 1));
        assert_eq!(budget.remaining(1), 2);
        assert!(budget.can_shift(1, 2));
        assert!(!budget.can_shift(1, 3));
        assert!(!budget.can_shift(1, 0));

        budget.consume(1, 2);
        assert_eq!(budget.remaining(1), 0);
    }
}
