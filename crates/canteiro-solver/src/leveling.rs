//! Resource Leveling Algorithm
//!
//! Flattens workforce overloads by shifting non-critical tasks forward within
//! their float.
//!
//! This is a greedy heuristic, not an optimizer: multi-resource leveling is
//! NP-hard. Days are visited in ascending order on a live histogram. Tasks
//! only ever move forward, so a day that has been visited is never disturbed
//! again and each day is handled once. Whatever overload is left when float
//! runs out is reported later as a bottleneck.

use std::cmp::Reverse;
use std::collections::HashMap;

use canteiro_core::{Adjustment, Day, ScheduleTask, TaskUid};

use crate::float::FloatBudget;
use crate::workforce::{active_range, is_active_on, task_worker_count, WorkforceTimeline};

/// Task candidate for shifting on one overloaded day
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct ShiftCandidate {
    uid: TaskUid,
    index: usize,
    remaining_float: i64,
    workers: u32,
}

impl ShiftCandidate {
    /// Prefer tasks with more float, then lower uid
    fn sort_key(&self) -> (Reverse<i64>, TaskUid) {
        (Reverse(self.remaining_float), self.uid)
    }
}

/// Shift non-critical tasks to keep daily workforce within `max_workers`.
///
/// Float consumed here is taken out of `budget`. Returns one adjustment per
/// shift, in the order shifts were made.
pub fn level_workforce(
    tasks: &mut [ScheduleTask],
    budget: &mut FloatBudget,
    max_workers: u32,
) -> Vec<Adjustment> {
    let mut timeline = WorkforceTimeline::from_tasks(tasks, max_workers);
    let mut adjustments = Vec::new();
    let mut cursor = Day(i32::MIN);

    while let Some(day) = timeline.next_overloaded_day(cursor) {
        let window_end = timeline.overloaded_run_end(day);
        let demand = timeline.total(day);

        let mut candidates: Vec<ShiftCandidate> = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_summary && is_active_on(t, day))
            .filter(|(_, t)| budget.remaining(t.uid) > 0)
            .map(|(index, t)| ShiftCandidate {
                uid: t.uid,
                index,
                remaining_float: budget.remaining(t.uid),
                workers: task_worker_count(t),
            })
            .collect();
        candidates.sort_by_key(ShiftCandidate::sort_key);

        for candidate in candidates {
            if !timeline.is_overloaded(day) {
                break;
            }
            let task = &mut tasks[candidate.index];
            let (start, end) = active_range(task);
            // Smallest shift that moves the task past the overloaded window
            let needed = start.days_until(window_end) + 1;
            let shift = needed.min(candidate.remaining_float);
            if shift <= 0 {
                continue;
            }

            timeline.remove_usage(start, end, candidate.workers);
            shift_task(task, shift);
            timeline.add_usage(start.offset(shift), end.offset(shift), candidate.workers);
            budget.consume(candidate.uid, shift);

            tracing::debug!(
                task = candidate.uid,
                days = shift,
                day = %day,
                partial = shift < needed,
                "leveling shift"
            );
            adjustments.push(Adjustment {
                task_uid: candidate.uid,
                original_start: start.to_date(),
                new_start: task.start_date,
                reason: format!(
                    "Nivelamento de recursos: {} trabalhadores em {} excedem o limite de {} por pavimento",
                    demand, day, max_workers
                ),
            });
        }

        cursor = day.succ();
    }

    adjustments
}

/// Move a task forward by `days`, keeping its duration
pub(crate) fn shift_task(task: &mut ScheduleTask, days: i64) {
    let (start, end) = active_range(task);
    task.start_date = start.offset(days).to_date();
    task.finish_date = end.offset(days).to_date();
}

/// Uid → position lookup over a task list
pub(crate) fn index_by_uid(tasks: &[ScheduleTask]) -> HashMap<TaskUid, usize> {
    tasks.iter().enumerate().map(|(i, t)| (t.uid, i)).collect()
}
