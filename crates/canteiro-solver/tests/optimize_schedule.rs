//! Integration tests for the optimization pipeline
//!
//! Each test builds a small site schedule and runs `optimize_schedule` end to end.

use std::collections::{BTreeSet, HashSet};

use canteiro_core::{
    validate_tasks, BottleneckKind, ConstructionPhase, Constraints, EquipmentConflictRule,
    OptimizationResult, PhaseOverlapRule, ProjectResources, ProjectSchedule, ScheduleTask,
};
use canteiro_solver::{
    build_daily_histogram, default_constraints, optimize_schedule, ScheduleOptimizer,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

fn schedule_with(tasks: Vec<ScheduleTask>) -> ProjectSchedule {
    let mut schedule = ProjectSchedule::new("Edifício Ipê", date(3, 1), date(3, 31));
    schedule.tasks = tasks;
    schedule
}

// =============================================================================
// Reference Scenarios
// =============================================================================

#[test]
fn two_large_crews_over_limit_are_split() {
    let schedule = schedule_with(vec![
        ScheduleTask::new(1, "Formas", date(3, 1), date(3, 10))
            .labor("Carpinteiro", 12.0)
            .costs(dec!(10000.00), dec!(2500.00)),
        ScheduleTask::new(2, "Armação", date(3, 1), date(3, 10))
            .labor("Armador", 12.0)
            .costs(dec!(8000.00), dec!(3000.00)),
    ]);
    let constraints = Constraints::with_max_workers(15);

    let result = optimize_schedule(&schedule, &ProjectResources::default(), Some(&constraints));

    let names: Vec<&str> = result.optimized_tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Formas - Parte 1",
            "Formas - Parte 2",
            "Armação - Parte 1",
            "Armação - Parte 2",
        ]
    );
    assert_eq!(result.splits.len(), 2);
    for split in &result.splits {
        assert!(split.part2_uid > 2, "part 2 uid must be above both originals");
    }

    let histogram = build_daily_histogram(&result.optimized_tasks);
    assert!(histogram.values().all(|&workers| workers <= 15));
    assert_eq!(result.peak_workers_before, 24);
    assert_eq!(result.peak_workers_after, 12);
    assert_eq!(result.efficiency_gain, 50.0);
    assert!(result.is_conflict_free());
}

#[test]
fn shared_crane_is_reported() {
    let schedule = schedule_with(vec![
        ScheduleTask::new(1, "Escavação", date(3, 1), date(3, 5))
            .phase(ConstructionPhase::Earthworks),
        ScheduleTask::new(2, "Estacas", date(3, 3), date(3, 8))
            .phase(ConstructionPhase::Foundations),
    ]);
    let mut constraints = Constraints::with_max_workers(20);
    constraints.equipment_conflicts = vec![EquipmentConflictRule::new(
        "crane",
        1,
        vec![ConstructionPhase::Earthworks, ConstructionPhase::Foundations],
    )];

    let result = optimize_schedule(&schedule, &ProjectResources::default(), Some(&constraints));

    let crane: Vec<_> = result
        .bottlenecks
        .iter()
        .filter(|b| b.kind == BottleneckKind::EquipmentConflict)
        .collect();
    assert_eq!(crane.len(), 1);
    assert_eq!(crane[0].equipment.as_deref(), Some("crane"));
    assert!(crane[0].reason.contains("crane"));
    assert!(result
        .suggestions
        .iter()
        .any(|s| s.title.contains("crane")));
}

#[test]
fn waterproofing_waits_for_structure_gap() {
    let mut schedule = schedule_with(vec![
        ScheduleTask::new(1, "Estrutura", date(3, 1), date(3, 10))
            .phase(ConstructionPhase::Structure),
        ScheduleTask::new(2, "Impermeabilização", date(3, 8), date(3, 15))
            .phase(ConstructionPhase::Waterproofing),
    ]);
    schedule.critical_path = BTreeSet::from([1]);

    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);

    let waterproofing = result.find_task(2).unwrap();
    assert!(waterproofing.start_date >= date(3, 17));
    assert_eq!(result.find_task(1).unwrap().start_date, date(3, 1));

    let phase = result
        .bottlenecks
        .iter()
        .find(|b| b.kind == BottleneckKind::PhaseSequencing)
        .unwrap();
    assert!(phase.resolved);
    assert!(result.adjustments.iter().any(|a| a.task_uid == 2));
}

#[test]
fn chained_gaps_listed_out_of_order_all_hold() {
    let mut schedule = schedule_with(vec![
        ScheduleTask::new(1, "Sapatas", date(3, 1), date(3, 5))
            .phase(ConstructionPhase::Foundations),
        ScheduleTask::new(2, "Estrutura", date(3, 1), date(3, 10))
            .phase(ConstructionPhase::Structure),
        ScheduleTask::new(3, "Impermeabilização", date(3, 8), date(3, 15))
            .phase(ConstructionPhase::Waterproofing),
    ]);
    schedule.finish_date = date(6, 30);
    let mut constraints = Constraints::with_max_workers(50);
    constraints.phase_overlap_rules = vec![
        PhaseOverlapRule::sequential(
            ConstructionPhase::Structure,
            ConstructionPhase::Waterproofing,
            7,
        ),
        PhaseOverlapRule::sequential(
            ConstructionPhase::Foundations,
            ConstructionPhase::Structure,
            7,
        ),
    ];

    let result = optimize_schedule(&schedule, &ProjectResources::default(), Some(&constraints));

    assert_eq!(result.find_task(2).unwrap().start_date, date(3, 12));
    assert_eq!(result.find_task(3).unwrap().start_date, date(3, 28));
    assert!(result.unresolved_bottlenecks().next().is_none());
    assert_phase_gaps_reported(&result, &constraints.phase_overlap_rules);
}

#[test]
fn empty_schedule_yields_empty_result() {
    let schedule = schedule_with(Vec::new());

    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);

    assert!(result.optimized_tasks.is_empty());
    assert!(result.bottlenecks.is_empty());
    assert!(result.adjustments.is_empty());
    assert!(result.splits.is_empty());
    assert_eq!(result.suggestions.len(), 1);
    assert_eq!(result.efficiency_gain, 0.0);
    assert_eq!(result.original_duration, 0);
    assert_eq!(result.optimized_duration, 0);
}

#[test]
fn milestones_and_labor_free_tasks_are_tolerated() {
    let schedule = schedule_with(vec![
        ScheduleTask::new(1, "Início da obra", date(3, 1), date(3, 1)).milestone(),
        ScheduleTask::new(2, "Entrega de cimento", date(3, 2), date(3, 2))
            .material("Cimento", 40.0),
        ScheduleTask::new(3, "Fase estrutural", date(3, 1), date(3, 20)).summary(),
    ]);

    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);

    assert_eq!(result.optimized_tasks.len(), 3);
    assert_eq!(result.original_duration, 2);
    assert!(result.is_conflict_free());
}

// =============================================================================
// Properties over a generated site
// =============================================================================

const PHASES: [ConstructionPhase; 8] = [
    ConstructionPhase::Earthworks,
    ConstructionPhase::Foundations,
    ConstructionPhase::Structure,
    ConstructionPhase::Masonry,
    ConstructionPhase::Plumbing,
    ConstructionPhase::Electrical,
    ConstructionPhase::Plastering,
    ConstructionPhase::Painting,
];

/// Deterministic schedule with overlapping crews, FS chains and a critical spine
fn generated_site(count: u32) -> ProjectSchedule {
    let start = date(3, 1);
    let mut tasks = Vec::new();
    let mut critical = BTreeSet::new();

    for uid in 1..=count {
        let offset = i64::from((uid * 7) % 240);
        let span = i64::from(uid % 9) + 1;
        let task_start = start + chrono::Duration::days(offset);
        let task_finish = task_start + chrono::Duration::days(span - 1);
        let phase = PHASES[(uid as usize * 3) % PHASES.len()];
        let workers = f64::from((uid * 5) % 13 + 1);

        let mut task = ScheduleTask::new(uid, format!("Serviço {uid}"), task_start, task_finish)
            .wbs(format!("{}.{}", uid / 10 + 1, uid % 10))
            .phase(phase)
            .labor("Equipe", workers)
            .costs(
                Decimal::new(i64::from(uid) * 12_345 + 1, 2),
                Decimal::new(i64::from(uid) * 678, 2),
            );
        if uid % 10 == 0 {
            critical.insert(uid);
        }
        if uid > 40 && uid % 3 == 0 {
            // Predecessor that ends before this task starts
            let pred = uid - 40;
            let pred_offset = i64::from((pred * 7) % 240);
            let pred_span = i64::from(pred % 9) + 1;
            if pred_offset + pred_span <= offset {
                task = task.depends_on(pred);
            }
        }
        tasks.push(task);
    }

    let mut schedule = ProjectSchedule::new("Condomínio Jacarandá", start, date(12, 31));
    schedule.tasks = tasks;
    schedule.critical_path = critical;
    schedule
}

#[test]
fn optimized_uids_are_unique_and_references_resolve() {
    let schedule = generated_site(300);
    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);

    let mut seen = HashSet::new();
    for task in &result.optimized_tasks {
        assert!(seen.insert(task.uid), "duplicate uid {}", task.uid);
    }
    assert!(validate_tasks(&result.optimized_tasks).is_empty());
}

/// Every sequencing rule either holds on the final dates or is reported
/// unresolved, and a rule reported resolved really holds
fn assert_phase_gaps_reported(result: &OptimizationResult, rules: &[PhaseOverlapRule]) {
    for rule in rules.iter().filter(|r| !r.allow_overlap && r.phase_a != r.phase_b) {
        let holds = gap_holds(&result.optimized_tasks, rule);
        let reported = result.bottlenecks.iter().find(|b| {
            b.kind == BottleneckKind::PhaseSequencing && b.phases == [rule.phase_a, rule.phase_b]
        });
        match reported {
            Some(b) => assert_eq!(b.resolved, holds, "{} -> {}", rule.phase_a, rule.phase_b),
            None => assert!(holds, "{} -> {} broken but not reported", rule.phase_a, rule.phase_b),
        }
    }
}

fn gap_holds(tasks: &[ScheduleTask], rule: &PhaseOverlapRule) -> bool {
    let Some(latest_a) = tasks
        .iter()
        .filter(|t| !t.is_summary && t.phase == rule.phase_a)
        .map(|t| t.finish_date.max(t.start_date))
        .max()
    else {
        return true;
    };
    let threshold = latest_a + chrono::Duration::days(rule.min_gap_days);
    tasks
        .iter()
        .filter(|t| !t.is_summary && t.phase == rule.phase_b)
        .all(|t| t.start_date >= threshold)
}

#[test]
fn default_phase_rules_hold_or_are_reported() {
    let schedule = generated_site(300);
    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);

    assert!(result
        .bottlenecks
        .iter()
        .any(|b| b.kind == BottleneckKind::PhaseSequencing));
    assert_phase_gaps_reported(&result, &default_constraints().phase_overlap_rules);
}

#[test]
fn reversed_rule_chain_holds_or_is_reported() {
    let schedule = generated_site(300);
    let mut constraints = Constraints::with_max_workers(200);
    // Latest pair first, so each rule moves the previous rule's first phase
    constraints.phase_overlap_rules = PHASES
        .windows(2)
        .rev()
        .map(|pair| PhaseOverlapRule::sequential(pair[0], pair[1], 2))
        .collect();

    let result = optimize_schedule(&schedule, &ProjectResources::default(), Some(&constraints));

    assert!(!result.adjustments.is_empty());
    assert_phase_gaps_reported(&result, &constraints.phase_overlap_rules);
}

#[test]
fn critical_tasks_keep_their_start() {
    let schedule = generated_site(300);
    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);

    for uid in &schedule.critical_path {
        let before = schedule.find_task(*uid).unwrap();
        let after = result.find_task(*uid).unwrap();
        assert_eq!(after.start_date, before.start_date, "critical task {uid} moved");
    }
}

#[test]
fn splits_conserve_total_cost() {
    let schedule = generated_site(300);
    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);
    assert!(!result.splits.is_empty());

    let cost = |tasks: &[ScheduleTask]| -> (Decimal, Decimal) {
        tasks.iter().fold((Decimal::ZERO, Decimal::ZERO), |(c, m), t| {
            (c + t.cost, m + t.material_cost)
        })
    };
    assert_eq!(cost(&result.optimized_tasks), cost(&schedule.tasks));

    for split in &result.splits {
        let original = schedule.find_task(split.original_uid).unwrap();
        let part1 = result.find_task(split.part1_uid).unwrap();
        let part2 = result.find_task(split.part2_uid).unwrap();
        assert_ne!(part1.cost, original.cost);
        assert_ne!(part2.cost, original.cost);
        assert!(part2.has_fs_predecessor(part1.uid));
    }
}

#[test]
fn shifts_only_move_forward() {
    let schedule = generated_site(300);
    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);

    for adjustment in &result.adjustments {
        assert!(adjustment.days_shifted() > 0);
        assert!(!schedule.critical_path.contains(&adjustment.task_uid));
    }
}

#[test]
fn identical_input_gives_identical_output() {
    let schedule = generated_site(200);
    let optimizer = ScheduleOptimizer::default();

    let first = optimizer.optimize(&schedule, &ProjectResources::default());
    let second = optimizer.optimize(&schedule, &ProjectResources::default());

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn input_schedule_is_not_mutated() {
    let schedule = generated_site(100);
    let snapshot = schedule.clone();

    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);

    assert_eq!(schedule, snapshot);
    assert_eq!(result.original_schedule, snapshot);
}

#[test]
fn six_hundred_tasks_finish_quickly() {
    let schedule = generated_site(600);

    let started = std::time::Instant::now();
    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);
    let elapsed = started.elapsed();

    assert!(result.optimized_tasks.len() >= 600);
    assert!(elapsed.as_millis() < 500, "took {elapsed:?}");
}

#[test]
fn schedule_and_result_survive_json() {
    let schedule = generated_site(50);
    let json = serde_json::to_string(&schedule).unwrap();
    assert!(json.contains("\"startDate\""));
    assert!(json.contains("\"criticalPath\""));
    let back: ProjectSchedule = serde_json::from_str(&json).unwrap();
    assert_eq!(back, schedule);

    let result = optimize_schedule(&schedule, &ProjectResources::default(), None);
    let value = serde_json::to_value(&result).unwrap();
    assert!(value.get("optimizedTasks").is_some());
    assert!(value.get("efficiencyGain").is_some());
}
