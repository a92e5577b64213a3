//! Bottleneck-driven task splitting
//!
//! A task is split when it is active on an over-capacity day and its own crew
//! is larger than [`SPLIT_WORKER_THRESHOLD`]. The split is pure graph surgery
//! on the flat task list:
//!
//! ```text
//!   before:  P --FS--> A --FS--> S
//!   after:   P --FS--> A(Parte 1) --FS--> A'(Parte 2) --FS--> S
//! ```
//!
//! Part 1 keeps the uid, so every non-FS reference to the original stays
//! valid. FS successors are rewritten to Part 2. Part 2 gets a fresh uid from
//! an explicit [`UidAllocator`], so no reference can dangle and uids are never
//! reused within a run.

use std::collections::BTreeSet;

use canteiro_core::{Predecessor, ScheduleTask, SplitRecord, TaskUid};
use rust_decimal::Decimal;

use crate::workforce::{active_range, task_worker_count, WorkforceTimeline};

/// Crews at or below this size are never split
pub const SPLIT_WORKER_THRESHOLD: u32 = 8;

const PART1_SUFFIX: &str = " - Parte 1";
const PART2_SUFFIX: &str = " - Parte 2";

/// Hands out task uids strictly above everything already in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidAllocator {
    next: TaskUid,
}

impl UidAllocator {
    /// Start above every task uid and every predecessor reference in `tasks`
    pub fn after(tasks: &[ScheduleTask]) -> Self {
        let max_uid = tasks
            .iter()
            .flat_map(|t| std::iter::once(t.uid).chain(t.predecessors.iter().map(|p| p.uid)))
            .max()
            .unwrap_or(0);
        Self { next: max_uid + 1 }
    }

    pub fn starting_at(next: TaskUid) -> Self {
        Self { next }
    }

    /// The uid the next call to [`allocate`](Self::allocate) returns
    pub fn peek(&self) -> TaskUid {
        self.next
    }

    pub fn allocate(&mut self) -> TaskUid {
        let uid = self.next;
        self.next += 1;
        uid
    }
}

/// Result of the split stage
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub splits: Vec<SplitRecord>,
    /// Allocator state after the stage, for any later uid minting
    pub uids: UidAllocator,
}

/// Tasks that should be split, in ascending uid order.
///
/// A candidate is a non-summary, non-critical task spanning at least two days,
/// with more than `threshold` workers, active on at least one day where the
/// aggregate demand exceeds `max_workers`.
pub fn select_split_candidates(
    tasks: &[ScheduleTask],
    max_workers: u32,
    critical_path: &BTreeSet<TaskUid>,
    threshold: u32,
) -> Vec<TaskUid> {
    let periods = WorkforceTimeline::from_tasks(tasks, max_workers).overload_periods();
    if periods.is_empty() {
        return Vec::new();
    }

    let candidates: BTreeSet<TaskUid> = tasks
        .iter()
        .filter(|t| !t.is_summary && !critical_path.contains(&t.uid))
        .filter(|t| t.span_days() >= 2 && task_worker_count(t) > threshold)
        .filter(|t| {
            let (start, end) = active_range(t);
            periods.iter().any(|p| p.start <= end && start <= p.end)
        })
        .map(|t| t.uid)
        .collect();

    candidates.into_iter().collect()
}

/// Split every candidate task once, rewriting dependency references.
///
/// Part 2 of each split is inserted directly after Part 1.
pub fn split_oversized_tasks(
    tasks: &mut Vec<ScheduleTask>,
    max_workers: u32,
    critical_path: &BTreeSet<TaskUid>,
    threshold: u32,
    mut uids: UidAllocator,
) -> SplitOutcome {
    let candidates = select_split_candidates(tasks, max_workers, critical_path, threshold);
    let mut splits = Vec::with_capacity(candidates.len());

    for uid in candidates {
        let Some(index) = tasks.iter().position(|t| t.uid == uid) else {
            continue;
        };
        let part2_uid = uids.peek();
        let Some((part1, part2)) = split_task(&tasks[index], part2_uid) else {
            continue;
        };
        uids.allocate();

        tasks[index] = part1;
        tasks.insert(index + 1, part2);
        remap_fs_successors(tasks, uid, part2_uid);

        tracing::debug!(original = uid, part2 = part2_uid, "split oversized task");
        splits.push(SplitRecord {
            original_uid: uid,
            part1_uid: uid,
            part2_uid,
        });
    }

    SplitOutcome { splits, uids }
}

/// Split one task into two consecutive parts.
///
/// Part 1 takes the first ⌈span/2⌉ days; cost, material cost, duration and
/// every resource line are shared in the same ratio, with Part 2 taking the
/// exact remainder. Returns `None` for single-day tasks.
pub fn split_task(
    original: &ScheduleTask,
    part2_uid: TaskUid,
) -> Option<(ScheduleTask, ScheduleTask)> {
    let span = original.span_days();
    if span < 2 {
        return None;
    }
    let part1_span = (span + 1) / 2;
    let ratio = part1_span as f64 / span as f64;
    let money_ratio = Decimal::from(part1_span) / Decimal::from(span);

    let (start, _) = active_range(original);
    let part1_finish = start.offset(part1_span - 1);

    let cost1 = part1_share(original.cost, money_ratio);
    let material1 = part1_share(original.material_cost, money_ratio);
    let days1 = (original.duration_days as f64 * ratio).round() as i64;
    let hours1 = original.duration_hours * ratio;

    let mut part1 = original.clone();
    part1.name = format!("{}{}", original.name, PART1_SUFFIX);
    part1.finish_date = part1_finish.to_date();
    part1.cost = cost1;
    part1.material_cost = material1;
    part1.duration_days = days1;
    part1.duration_hours = hours1;

    let mut part2 = original.clone();
    part2.uid = part2_uid;
    part2.name = format!("{}{}", original.name, PART2_SUFFIX);
    part2.start_date = part1_finish.succ().to_date();
    part2.cost = original.cost - cost1;
    part2.material_cost = original.material_cost - material1;
    part2.duration_days = original.duration_days - days1;
    part2.duration_hours = original.duration_hours - hours1;
    part2.predecessors = vec![Predecessor::finish_to_start(original.uid)];
    part2.is_milestone = None;

    for (r1, r2) in part1.resources.iter_mut().zip(part2.resources.iter_mut()) {
        let units1 = r1.units * ratio;
        let hours1 = r1.hours * ratio;
        r2.units = r1.units - units1;
        r2.hours = r1.hours - hours1;
        r1.units = units1;
        r1.hours = hours1;
    }

    Some((part1, part2))
}

/// Part 1's share of `amount` in whole cents, never all of it and never none
/// of it. Amounts under two cents keep the exact fraction.
fn part1_share(amount: Decimal, ratio: Decimal) -> Decimal {
    let share = (amount * ratio).round_dp(2);
    if amount.is_zero() || (!share.is_zero() && share != amount) {
        return share;
    }
    let cent = if amount.is_sign_negative() {
        Decimal::new(-1, 2)
    } else {
        Decimal::new(1, 2)
    };
    if amount.abs() < Decimal::new(2, 2) {
        amount * ratio
    } else if share.is_zero() {
        cent
    } else {
        amount - cent
    }
}

/// Point every FS reference to `original` at `part2` instead, except Part 2's own
fn remap_fs_successors(tasks: &mut [ScheduleTask], original: TaskUid, part2: TaskUid) {
    for task in tasks.iter_mut().filter(|t| t.uid != part2) {
        for pred in task
            .predecessors
            .iter_mut()
            .filter(|p| p.uid == original && p.is_finish_to_start())
        {
            pred.uid = part2;
        }
    }
}
