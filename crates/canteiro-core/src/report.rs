//! Optimization result types.
//!
//! These are the only shapes downstream consumers (schedule export, dashboards)
//! depend on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{ConstructionPhase, ProjectSchedule, ScheduleTask, TaskUid};

/// Total float of a single task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFloat {
    pub task_uid: TaskUid,
    pub total_float_days: i64,
    pub is_critical: bool,
}

/// Inclusive calendar range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} a {}", self.start, self.end)
        }
    }
}

/// What kind of constraint a bottleneck violates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    /// Daily workforce above the site limit
    WorkforceOverload,
    /// Shared equipment demanded by too many tasks at once
    EquipmentConflict,
    /// Phase B starts too early relative to phase A
    PhaseSequencing,
}

/// A constraint violation found in the schedule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    /// Localized description
    pub reason: String,
    pub phases: Vec<ConstructionPhase>,
    pub date_range: DateRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(default)]
    pub task_uids: Vec<TaskUid>,
    /// Observed demand (workers or concurrent uses); 0 for phase sequencing
    #[serde(default)]
    pub peak: u32,
    /// Allowed demand; for phase sequencing the required gap in days
    #[serde(default)]
    pub limit: u32,
    /// The engine shifted tasks so the violation no longer holds
    #[serde(default)]
    pub resolved: bool,
}

/// A task date change made by the optimizer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub task_uid: TaskUid,
    pub original_start: NaiveDate,
    pub new_start: NaiveDate,
    pub reason: String,
}

impl Adjustment {
    pub fn days_shifted(&self) -> i64 {
        (self.new_start - self.original_start).num_days()
    }
}

/// Human-readable remediation hint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
}

impl Suggestion {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// A task that was split into two dependency-linked parts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRecord {
    pub original_uid: TaskUid,
    pub part1_uid: TaskUid,
    pub part2_uid: TaskUid,
}

/// Full output of one optimization run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub optimized_tasks: Vec<ScheduleTask>,
    pub bottlenecks: Vec<Bottleneck>,
    pub adjustments: Vec<Adjustment>,
    pub suggestions: Vec<Suggestion>,
    #[serde(default)]
    pub splits: Vec<SplitRecord>,
    /// Peak workforce reduction in percent
    pub efficiency_gain: f64,
    /// Calendar-day span of the input schedule
    pub original_duration: i64,
    /// Calendar-day span of the optimized schedule
    pub optimized_duration: i64,
    pub peak_workers_before: u32,
    pub peak_workers_after: u32,
    /// Unmodified copy of the input
    pub original_schedule: ProjectSchedule,
}

impl OptimizationResult {
    pub fn find_task(&self, uid: TaskUid) -> Option<&ScheduleTask> {
        self.optimized_tasks.iter().find(|t| t.uid == uid)
    }

    /// Bottlenecks the engine could not remove
    pub fn unresolved_bottlenecks(&self) -> impl Iterator<Item = &Bottleneck> {
        self.bottlenecks.iter().filter(|b| !b.resolved)
    }

    pub fn is_conflict_free(&self) -> bool {
        self.unresolved_bottlenecks().next().is_none()
    }
}
