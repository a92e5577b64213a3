//! Constraint violation detection.
//!
//! Runs after leveling. Phase sequencing rules are enforced first because they
//! may still move tasks; the workforce and equipment checks then look at the
//! final dates.

use std::collections::{BTreeMap, BTreeSet};

use canteiro_core::{
    Adjustment, Bottleneck, BottleneckKind, ConstructionPhase, Constraints, DateRange, Day,
    EquipmentConflictRule, PhaseOverlapRule, ScheduleTask, TaskUid,
};

use crate::float::FloatBudget;
use crate::leveling::{index_by_uid, shift_task};
use crate::workforce::{active_range, tasks_overlapping, uid_list, WorkforceTimeline};

/// Bottlenecks found and the extra shifts made while enforcing phase gaps
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    /// Workforce overloads, then equipment conflicts, then phase sequencing
    pub bottlenecks: Vec<Bottleneck>,
    pub adjustments: Vec<Adjustment>,
}

/// Enforce phase gaps, then report everything still violating `constraints`
pub fn detect_conflicts(
    tasks: &mut [ScheduleTask],
    constraints: &Constraints,
    budget: &mut FloatBudget,
) -> ConflictReport {
    let (phase_bottlenecks, adjustments) =
        enforce_phase_sequencing(tasks, &constraints.phase_overlap_rules, budget);

    let mut bottlenecks = detect_workforce_overloads(tasks, constraints.max_workers_per_floor);
    bottlenecks.extend(detect_equipment_conflicts(tasks, &constraints.equipment_conflicts));
    bottlenecks.extend(phase_bottlenecks);

    ConflictReport {
        bottlenecks,
        adjustments,
    }
}

/// One bottleneck per run of days above the workforce limit
pub fn detect_workforce_overloads(tasks: &[ScheduleTask], max_workers: u32) -> Vec<Bottleneck> {
    WorkforceTimeline::from_tasks(tasks, max_workers)
        .overload_periods()
        .into_iter()
        .map(|period| {
            let involved = tasks_overlapping(tasks, period.start, period.end);
            let date_range = DateRange::new(period.start.to_date(), period.end.to_date());
            Bottleneck {
                kind: BottleneckKind::WorkforceOverload,
                reason: format!(
                    "Sobrecarga de mão de obra: pico de {} trabalhadores (limite {}) em {}",
                    period.peak, max_workers, date_range
                ),
                phases: distinct_phases(&involved),
                date_range,
                equipment: None,
                task_uids: uid_list(&involved),
                peak: period.peak,
                limit: max_workers,
                resolved: false,
            }
        })
        .collect()
}

/// Equipment rules whose concurrent use exceeds `max_concurrent`.
///
/// Tasks count as users of a piece of equipment when their phase is listed in
/// the rule. Exactly `max_concurrent` simultaneous tasks is allowed.
pub fn detect_equipment_conflicts(
    tasks: &[ScheduleTask],
    rules: &[EquipmentConflictRule],
) -> Vec<Bottleneck> {
    rules
        .iter()
        .filter_map(|rule| equipment_conflict(tasks, rule))
        .collect()
}

fn equipment_conflict(tasks: &[ScheduleTask], rule: &EquipmentConflictRule) -> Option<Bottleneck> {
    let users: Vec<&ScheduleTask> = tasks
        .iter()
        .filter(|t| !t.is_summary && rule.phases.contains(&t.phase))
        .collect();

    let mut events: Vec<(Day, i32)> = Vec::with_capacity(users.len() * 2);
    for task in &users {
        let (start, end) = active_range(task);
        events.push((start, 1));
        events.push((end.succ(), -1));
    }
    events.sort_unstable();

    // Peak concurrency and the first interval where it holds
    let mut concurrent = 0i32;
    let mut peak = 0i32;
    let mut peak_window: Option<(Day, Day)> = None;
    let mut i = 0;
    while i < events.len() {
        let day = events[i].0;
        while i < events.len() && events[i].0 == day {
            concurrent += events[i].1;
            i += 1;
        }
        if concurrent > peak {
            if let Some(&(next_day, _)) = events.get(i) {
                peak = concurrent;
                peak_window = Some((day, next_day.offset(-1)));
            }
        }
    }

    let peak = u32::try_from(peak).unwrap_or(0);
    if peak <= rule.max_concurrent {
        return None;
    }
    let (start, end) = peak_window?;

    let involved: Vec<&ScheduleTask> = users
        .iter()
        .copied()
        .filter(|t| {
            let (s, e) = active_range(t);
            s <= end && start <= e
        })
        .collect();
    let phases = rule
        .phases
        .iter()
        .copied()
        .filter(|p| involved.iter().any(|t| t.phase == *p))
        .collect();
    let date_range = DateRange::new(start.to_date(), end.to_date());

    Some(Bottleneck {
        kind: BottleneckKind::EquipmentConflict,
        reason: format!(
            "Conflito de equipamento: {} requisitado por {} tarefas simultâneas (máximo {}) em {}",
            rule.equipment_name, peak, rule.max_concurrent, date_range
        ),
        phases,
        date_range,
        equipment: Some(rule.equipment_name.clone()),
        task_uids: uid_list(&involved),
        peak,
        limit: rule.max_concurrent,
        resolved: false,
    })
}

/// Push `phase_b` tasks past the required gap after `phase_a`.
///
/// A task is only moved when its whole shift fits in its remaining float;
/// otherwise it stays and the bottleneck is left unresolved. A later rule can
/// move an earlier rule's `phase_a`, so rules are re-applied until nothing
/// moves, at most once more than there are rules. `resolved` is judged on the
/// final dates.
pub fn enforce_phase_sequencing(
    tasks: &mut [ScheduleTask],
    rules: &[PhaseOverlapRule],
    budget: &mut FloatBudget,
) -> (Vec<Bottleneck>, Vec<Adjustment>) {
    let rules: Vec<&PhaseOverlapRule> = rules
        .iter()
        .filter(|r| !r.allow_overlap && r.phase_a != r.phase_b)
        .collect();
    let index = index_by_uid(tasks);
    let mut adjustments = Vec::new();
    let mut violations: BTreeMap<usize, GapViolation> = BTreeMap::new();

    for round in 0..=rules.len() {
        let mut moved = false;
        for (r, rule) in rules.iter().enumerate() {
            let Some(threshold) = gap_threshold(tasks, rule) else {
                continue;
            };
            let offenders = gap_offenders(tasks, rule, threshold);
            if offenders.is_empty() {
                continue;
            }
            let violation = violations.entry(r).or_insert_with(|| GapViolation {
                offenders: BTreeSet::new(),
                earliest: threshold,
            });
            let reason = gap_reason(rule, threshold);

            for (uid, start) in offenders {
                violation.offenders.insert(uid);
                violation.earliest = violation.earliest.min(start);
                let shift = start.days_until(threshold);
                let Some(&i) = index.get(&uid) else {
                    continue;
                };
                if !budget.can_shift(uid, shift) {
                    tracing::debug!(task = uid, days = shift, "phase gap exceeds float");
                    continue;
                }
                shift_task(&mut tasks[i], shift);
                budget.consume(uid, shift);
                moved = true;
                adjustments.push(Adjustment {
                    task_uid: uid,
                    original_start: start.to_date(),
                    new_start: tasks[i].start_date,
                    reason: reason.clone(),
                });
            }
        }
        if !moved {
            break;
        }
        tracing::trace!(round, "phase gaps moved tasks");
    }

    let tasks: &[ScheduleTask] = tasks;
    let bottlenecks = rules
        .iter()
        .enumerate()
        .filter_map(|(r, rule)| {
            let threshold = gap_threshold(tasks, rule)?;
            let remaining = gap_offenders(tasks, rule, threshold);
            let mut violation = violations.remove(&r).unwrap_or(GapViolation {
                offenders: BTreeSet::new(),
                earliest: threshold,
            });
            for &(uid, start) in &remaining {
                violation.offenders.insert(uid);
                violation.earliest = violation.earliest.min(start);
            }
            if violation.offenders.is_empty() {
                return None;
            }
            Some(Bottleneck {
                kind: BottleneckKind::PhaseSequencing,
                reason: gap_reason(rule, threshold),
                phases: vec![rule.phase_a, rule.phase_b],
                date_range: DateRange::new(
                    violation.earliest.to_date(),
                    threshold.offset(-1).to_date(),
                ),
                equipment: None,
                task_uids: violation.offenders.into_iter().collect(),
                peak: 0,
                limit: u32::try_from(rule.min_gap_days).unwrap_or(u32::MAX),
                resolved: remaining.is_empty(),
            })
        })
        .collect();

    (bottlenecks, adjustments)
}

/// Offending `phase_b` tasks seen for one rule across all rounds
struct GapViolation {
    offenders: BTreeSet<TaskUid>,
    earliest: Day,
}

/// First day `phase_b` may start, `None` when `phase_a` has no tasks
fn gap_threshold(tasks: &[ScheduleTask], rule: &PhaseOverlapRule) -> Option<Day> {
    tasks
        .iter()
        .filter(|t| !t.is_summary && t.phase == rule.phase_a)
        .map(|t| active_range(t).1)
        .max()
        .map(|latest_a| latest_a.offset(rule.min_gap_days))
}

fn gap_offenders(
    tasks: &[ScheduleTask],
    rule: &PhaseOverlapRule,
    threshold: Day,
) -> Vec<(TaskUid, Day)> {
    let mut offenders: Vec<(TaskUid, Day)> = tasks
        .iter()
        .filter(|t| !t.is_summary && t.phase == rule.phase_b)
        .map(|t| (t.uid, Day::from_date(t.start_date)))
        .filter(|&(_, start)| start < threshold)
        .collect();
    offenders.sort_unstable();
    offenders
}

fn gap_reason(rule: &PhaseOverlapRule, threshold: Day) -> String {
    format!(
        "Sequenciamento de fases: {} deve iniciar {} dias após o término de {} ({})",
        rule.phase_b,
        rule.min_gap_days,
        rule.phase_a,
        threshold.to_date()
    )
}

fn distinct_phases(tasks: &[&ScheduleTask]) -> Vec<ConstructionPhase> {
    tasks
        .iter()
        .map(|t| t.phase)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
