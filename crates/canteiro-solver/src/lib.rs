//! # canteiro-solver
//!
//! Resource leveling and constraint checking for construction schedules.
//!
//! This crate provides:
//! - Daily workforce histograms
//! - Total float over fixed schedule dates
//! - Splitting of oversized crews into dependency-linked parts
//! - Greedy workforce leveling within float
//! - Equipment and phase sequencing conflict detection
//! - Localized remediation suggestions
//!
//! ## Example
//!
//! ```rust
//! use canteiro_core::{ProjectResources, ProjectSchedule};
//! use canteiro_solver::optimize_schedule;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let finish = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
//! let schedule = ProjectSchedule::new("Residencial Aurora", start, finish);
//!
//! let result = optimize_schedule(&schedule, &ProjectResources::default(), None);
//! assert!(result.optimized_tasks.is_empty());
//! assert_eq!(result.suggestions.len(), 1);
//! ```

pub mod conflicts;
pub mod float;
pub mod leveling;
pub mod split;
pub mod suggestions;
pub mod workforce;

pub use canteiro_core::default_constraints;
pub use conflicts::{detect_conflicts, ConflictReport};
pub use float::{compute_task_floats, compute_task_floats_until, FloatBudget};
pub use leveling::level_workforce;
pub use split::{split_oversized_tasks, UidAllocator, SPLIT_WORKER_THRESHOLD};
pub use suggestions::generate_suggestions;
pub use workforce::{
    build_daily_histogram, histogram_stats, overload_periods, task_worker_count, OverloadPeriod,
    WorkforceTimeline,
};

use canteiro_core::{Constraints, OptimizationResult, ProjectResources, ProjectSchedule};

/// Pipeline stages, run once each in this order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Split,
    Float,
    Level,
    DetectConflicts,
    Suggest,
    Assemble,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Split => "split",
            Stage::Float => "float",
            Stage::Level => "level",
            Stage::DetectConflicts => "detect-conflicts",
            Stage::Suggest => "suggest",
            Stage::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

/// Schedule optimizer
#[derive(Clone, Debug)]
pub struct ScheduleOptimizer {
    pub constraints: Constraints,
    /// Tasks with more workers than this may be split
    pub split_threshold: u32,
}

impl ScheduleOptimizer {
    pub fn new(constraints: Constraints) -> Self {
        Self {
            constraints,
            split_threshold: SPLIT_WORKER_THRESHOLD,
        }
    }

    pub fn split_threshold(mut self, threshold: u32) -> Self {
        self.split_threshold = threshold;
        self
    }

    /// Run the full pipeline on a copy of `schedule`.
    ///
    /// Never fails: constraints the engine cannot satisfy come back as
    /// unresolved bottlenecks.
    pub fn optimize(
        &self,
        schedule: &ProjectSchedule,
        resources: &ProjectResources,
    ) -> OptimizationResult {
        let span = tracing::info_span!(
            "optimize",
            schedule = %schedule.name,
            tasks = schedule.tasks.len()
        );
        let _guard = span.enter();

        let max_workers = self.constraints.max_workers_per_floor;
        let critical = &schedule.critical_path;
        let mut tasks = schedule.tasks.clone();
        let peak_workers_before = WorkforceTimeline::from_tasks(&tasks, max_workers).peak();

        tracing::debug!(stage = %Stage::Split, "stage");
        let uids = UidAllocator::after(&tasks);
        let split =
            split_oversized_tasks(&mut tasks, max_workers, critical, self.split_threshold, uids);

        tracing::debug!(stage = %Stage::Float, splits = split.splits.len(), "stage");
        let floats = compute_task_floats_until(&tasks, critical, schedule.finish_date);
        let mut budget = FloatBudget::new(&floats);

        tracing::debug!(stage = %Stage::Level, "stage");
        let mut adjustments = level_workforce(&mut tasks, &mut budget, max_workers);

        tracing::debug!(stage = %Stage::DetectConflicts, shifts = adjustments.len(), "stage");
        let report = detect_conflicts(&mut tasks, &self.constraints, &mut budget);
        adjustments.extend(report.adjustments);

        tracing::debug!(stage = %Stage::Suggest, bottlenecks = report.bottlenecks.len(), "stage");
        let suggestions = generate_suggestions(
            &report.bottlenecks,
            &adjustments,
            &split.splits,
            resources,
            &self.constraints,
        );

        tracing::debug!(stage = %Stage::Assemble, "stage");
        let peak_workers_after = WorkforceTimeline::from_tasks(&tasks, max_workers).peak();
        let efficiency_gain = efficiency_gain(peak_workers_before, peak_workers_after);
        let result = OptimizationResult {
            original_duration: workforce::schedule_span_days(&schedule.tasks),
            optimized_duration: workforce::schedule_span_days(&tasks),
            optimized_tasks: tasks,
            bottlenecks: report.bottlenecks,
            adjustments,
            suggestions,
            splits: split.splits,
            efficiency_gain,
            peak_workers_before,
            peak_workers_after,
            original_schedule: schedule.clone(),
        };

        tracing::info!(
            splits = result.splits.len(),
            adjustments = result.adjustments.len(),
            bottlenecks = result.bottlenecks.len(),
            unresolved = result.unresolved_bottlenecks().count(),
            peak_before = peak_workers_before,
            peak_after = peak_workers_after,
            "optimization finished"
        );
        result
    }
}

impl Default for ScheduleOptimizer {
    fn default() -> Self {
        Self::new(default_constraints())
    }
}

/// Optimize a schedule; `None` uses [`default_constraints`]
pub fn optimize_schedule(
    schedule: &ProjectSchedule,
    resources: &ProjectResources,
    constraints: Option<&Constraints>,
) -> OptimizationResult {
    let optimizer = match constraints {
        Some(c) => ScheduleOptimizer::new(c.clone()),
        None => ScheduleOptimizer::default(),
    };
    optimizer.optimize(schedule, resources)
}

/// Peak workforce reduction in percent, one decimal, never negative
fn efficiency_gain(peak_before: u32, peak_after: u32) -> f64 {
    if peak_before == 0 || peak_after >= peak_before {
        return 0.0;
    }
    let gain = f64::from(peak_before - peak_after) / f64::from(peak_before) * 100.0;
    (gain * 10.0).round() / 10.0
}
