//! # canteiro-core
//!
//! Core domain model for the canteiro construction schedule leveling engine.
//!
//! This crate provides:
//! - Domain types: `ScheduleTask`, `ProjectSchedule`, `ProjectResources`
//! - Leveling configuration: `Constraints` and its default rule set
//! - Result types: `OptimizationResult`, `Bottleneck`, `Adjustment`, `Suggestion`
//! - Day-ordinal arithmetic used by the solver
//! - Error types and input validation
//!
//! ## Example
//!
//! ```rust
//! use canteiro_core::{ConstructionPhase, ProjectSchedule, ScheduleTask};
//! use chrono::NaiveDate;
//!
//! let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
//!
//! let mut schedule = ProjectSchedule::new("Residencial Aurora", d(1), d(20));
//! schedule.tasks.push(
//!     ScheduleTask::new(1, "Escavação", d(1), d(5))
//!         .phase(ConstructionPhase::Earthworks)
//!         .labor("Servente", 6.0),
//! );
//! schedule.tasks.push(
//!     ScheduleTask::new(2, "Sapatas", d(6), d(12))
//!         .phase(ConstructionPhase::Foundations)
//!         .labor("Armador", 4.0)
//!         .depends_on(1),
//! );
//! assert!(schedule.validate().is_empty());
//! ```

pub mod constraints;
pub mod day;
pub mod report;

pub use constraints::{
    default_constraints, ConfigError, Constraints, EquipmentConflictRule, PhaseOverlapRule,
    MAX_GAP_DAYS,
};
pub use day::Day;
pub use report::{
    Adjustment, Bottleneck, BottleneckKind, DateRange, OptimizationResult, SplitRecord,
    Suggestion, TaskFloat,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for a schedule task
pub type TaskUid = u32;

// ============================================================================
// Dependencies
// ============================================================================

/// Types of task dependencies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    /// Finish-to-Start: successor starts after predecessor finishes
    #[default]
    #[serde(rename = "FS")]
    FinishToStart,
    /// Start-to-Start: successor starts when predecessor starts
    #[serde(rename = "SS")]
    StartToStart,
    /// Finish-to-Finish: successor finishes when predecessor finishes
    #[serde(rename = "FF")]
    FinishToFinish,
    /// Start-to-Finish: successor finishes when predecessor starts
    #[serde(rename = "SF")]
    StartToFinish,
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkType::FinishToStart => write!(f, "FS"),
            LinkType::StartToStart => write!(f, "SS"),
            LinkType::FinishToFinish => write!(f, "FF"),
            LinkType::StartToFinish => write!(f, "SF"),
        }
    }
}

/// Predecessor reference held by a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predecessor {
    /// Uid of the predecessor task
    pub uid: TaskUid,
    /// Type of dependency
    #[serde(rename = "type", default)]
    pub link: LinkType,
}

impl Predecessor {
    /// Finish-to-start reference
    pub fn finish_to_start(uid: TaskUid) -> Self {
        Self {
            uid,
            link: LinkType::FinishToStart,
        }
    }

    pub fn is_finish_to_start(&self) -> bool {
        self.link == LinkType::FinishToStart
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Classification of a resource line on a task
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Crew members; units are workers
    #[default]
    Labor,
    /// Consumed material; units are quantities
    Material,
    /// Equipment and machinery
    Machinery,
}

/// A resource line assigned to a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResource {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ResourceKind,
    /// Workers for labor, quantity for material, machines for machinery
    #[serde(default)]
    pub units: f64,
    /// Cost rate per hour (labor, machinery) or per unit (material)
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default)]
    pub hours: f64,
}

impl TaskResource {
    pub fn new(name: impl Into<String>, kind: ResourceKind, units: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            units,
            rate: Decimal::ZERO,
            hours: 0.0,
        }
    }

    pub fn is_labor(&self) -> bool {
        self.kind == ResourceKind::Labor
    }
}

/// Project-level resource catalogue entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResource {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ResourceKind,
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default)]
    pub max_units: f64,
}

/// Crew composition summary attached to a schedule
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    #[serde(default)]
    pub total_workers: u32,
    #[serde(default)]
    pub crews: Vec<Crew>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crew {
    pub role: String,
    pub workers: u32,
}

/// Resources the contractor has on hand for the project.
///
/// The engine only reads this to enrich suggestion texts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResources {
    #[serde(default)]
    pub labor: Vec<LaborCrew>,
    #[serde(default)]
    pub equipment: Vec<EquipmentUnit>,
    #[serde(default)]
    pub materials: Vec<MaterialStock>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborCrew {
    pub role: String,
    pub available: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentUnit {
    pub name: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStock {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub quantity: f64,
}

impl ProjectResources {
    /// Total workers available across all crews
    pub fn total_labor(&self) -> u32 {
        self.labor.iter().map(|c| c.available).sum()
    }

    /// Owned quantity of a piece of equipment (case-insensitive name match)
    pub fn equipment_quantity(&self, name: &str) -> Option<u32> {
        self.equipment
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.quantity)
    }
}

// ============================================================================
// Construction Phase
// ============================================================================

/// Construction phase a task belongs to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionPhase {
    Preliminary,
    Earthworks,
    Foundations,
    Structure,
    Masonry,
    Roofing,
    Waterproofing,
    Plumbing,
    Electrical,
    Hvac,
    Plastering,
    Flooring,
    Painting,
    Finishing,
    Landscaping,
    Cleanup,
    #[default]
    Other,
}

impl ConstructionPhase {
    /// Localized (pt-BR) label used in report texts
    pub fn label(&self) -> &'static str {
        match self {
            ConstructionPhase::Preliminary => "Serviços preliminares",
            ConstructionPhase::Earthworks => "Terraplenagem",
            ConstructionPhase::Foundations => "Fundações",
            ConstructionPhase::Structure => "Estrutura",
            ConstructionPhase::Masonry => "Alvenaria",
            ConstructionPhase::Roofing => "Cobertura",
            ConstructionPhase::Waterproofing => "Impermeabilização",
            ConstructionPhase::Plumbing => "Instalações hidráulicas",
            ConstructionPhase::Electrical => "Instalações elétricas",
            ConstructionPhase::Hvac => "Climatização",
            ConstructionPhase::Plastering => "Revestimentos",
            ConstructionPhase::Flooring => "Pisos",
            ConstructionPhase::Painting => "Pintura",
            ConstructionPhase::Finishing => "Acabamentos",
            ConstructionPhase::Landscaping => "Paisagismo",
            ConstructionPhase::Cleanup => "Limpeza final",
            ConstructionPhase::Other => "Outros",
        }
    }
}

impl std::fmt::Display for ConstructionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Task
// ============================================================================

/// A schedulable unit of construction work
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTask {
    /// Unique positive identifier
    pub uid: TaskUid,
    /// WBS code (e.g. "1.2.3")
    #[serde(default)]
    pub wbs: String,
    pub name: String,
    #[serde(default)]
    pub duration_days: i64,
    #[serde(default)]
    pub duration_hours: f64,
    pub start_date: NaiveDate,
    pub finish_date: NaiveDate,
    #[serde(default)]
    pub predecessors: Vec<Predecessor>,
    #[serde(default)]
    pub phase: ConstructionPhase,
    #[serde(default)]
    pub resources: Vec<TaskResource>,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub material_cost: Decimal,
    #[serde(default)]
    pub outline_level: u32,
    #[serde(default)]
    pub percent_complete: f64,
    #[serde(default)]
    pub is_summary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_milestone: Option<bool>,
}

impl ScheduleTask {
    /// Create a leaf task spanning `[start, finish]` inclusive
    pub fn new(uid: TaskUid, name: impl Into<String>, start: NaiveDate, finish: NaiveDate) -> Self {
        let span = (finish - start).num_days() + 1;
        Self {
            uid,
            wbs: String::new(),
            name: name.into(),
            duration_days: span.max(0),
            duration_hours: span.max(0) as f64 * 8.0,
            start_date: start,
            finish_date: finish,
            predecessors: Vec::new(),
            phase: ConstructionPhase::Other,
            resources: Vec::new(),
            cost: Decimal::ZERO,
            material_cost: Decimal::ZERO,
            outline_level: 1,
            percent_complete: 0.0,
            is_summary: false,
            is_milestone: None,
        }
    }

    /// Set the WBS code
    pub fn wbs(mut self, wbs: impl Into<String>) -> Self {
        self.wbs = wbs.into();
        self
    }

    /// Set the construction phase
    pub fn phase(mut self, phase: ConstructionPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Add a labor resource line (units = workers)
    pub fn labor(mut self, role: impl Into<String>, workers: f64) -> Self {
        self.resources
            .push(TaskResource::new(role, ResourceKind::Labor, workers));
        self
    }

    /// Add a material resource line
    pub fn material(mut self, name: impl Into<String>, quantity: f64) -> Self {
        self.resources
            .push(TaskResource::new(name, ResourceKind::Material, quantity));
        self
    }

    /// Add a machinery resource line
    pub fn machinery(mut self, name: impl Into<String>, units: f64) -> Self {
        self.resources
            .push(TaskResource::new(name, ResourceKind::Machinery, units));
        self
    }

    /// Add a finish-to-start predecessor
    pub fn depends_on(mut self, uid: TaskUid) -> Self {
        self.predecessors.push(Predecessor::finish_to_start(uid));
        self
    }

    /// Add a predecessor with an explicit link type
    pub fn with_predecessor(mut self, uid: TaskUid, link: LinkType) -> Self {
        self.predecessors.push(Predecessor { uid, link });
        self
    }

    /// Set labor and material cost
    pub fn costs(mut self, cost: Decimal, material_cost: Decimal) -> Self {
        self.cost = cost;
        self.material_cost = material_cost;
        self
    }

    /// Mark as a WBS summary row
    pub fn summary(mut self) -> Self {
        self.is_summary = true;
        self.outline_level = 0;
        self
    }

    /// Mark as milestone (zero duration, single day)
    pub fn milestone(mut self) -> Self {
        self.is_milestone = Some(true);
        self.duration_days = 0;
        self.duration_hours = 0.0;
        self.finish_date = self.start_date;
        self
    }

    /// Calendar days covered by `[start, finish]`, never less than one
    pub fn span_days(&self) -> i64 {
        ((self.finish_date - self.start_date).num_days() + 1).max(1)
    }

    pub fn is_milestone(&self) -> bool {
        self.is_milestone.unwrap_or(false)
    }

    /// Whether any predecessor entry points at `uid` with a finish-to-start link
    pub fn has_fs_predecessor(&self, uid: TaskUid) -> bool {
        self.predecessors
            .iter()
            .any(|p| p.uid == uid && p.is_finish_to_start())
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// A complete construction schedule as produced by the WBS generator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSchedule {
    pub name: String,
    pub start_date: NaiveDate,
    pub finish_date: NaiveDate,
    /// Total duration in calendar days
    #[serde(default)]
    pub total_duration: i64,
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub tasks: Vec<ScheduleTask>,
    #[serde(default)]
    pub resources: Vec<ProjectResource>,
    #[serde(default)]
    pub critical_path: BTreeSet<TaskUid>,
    #[serde(default)]
    pub team: TeamSummary,
}

impl ProjectSchedule {
    /// Create an empty schedule for the given window
    pub fn new(name: impl Into<String>, start: NaiveDate, finish: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start_date: start,
            finish_date: finish,
            total_duration: ((finish - start).num_days() + 1).max(0),
            total_cost: Decimal::ZERO,
            tasks: Vec::new(),
            resources: Vec::new(),
            critical_path: BTreeSet::new(),
            team: TeamSummary::default(),
        }
    }

    /// Get a task by uid
    pub fn find_task(&self, uid: TaskUid) -> Option<&ScheduleTask> {
        self.tasks.iter().find(|t| t.uid == uid)
    }

    /// Non-summary tasks
    pub fn leaf_tasks(&self) -> impl Iterator<Item = &ScheduleTask> {
        self.tasks.iter().filter(|t| !t.is_summary)
    }

    /// Check structural integrity of the task list.
    ///
    /// Returns every finding; an empty list means the schedule is well formed.
    pub fn validate(&self) -> Vec<ScheduleError> {
        validate_tasks(&self.tasks)
    }
}

/// Structural checks shared by input validation and result invariants
pub fn validate_tasks(tasks: &[ScheduleTask]) -> Vec<ScheduleError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<TaskUid> = HashSet::with_capacity(tasks.len());

    for task in tasks {
        if !seen.insert(task.uid) {
            errors.push(ScheduleError::DuplicateUid(task.uid));
        }
        if task.finish_date < task.start_date {
            errors.push(ScheduleError::InvalidDateRange {
                task: task.uid,
                start: task.start_date,
                finish: task.finish_date,
            });
        }
    }

    for task in tasks {
        for pred in &task.predecessors {
            if !seen.contains(&pred.uid) {
                errors.push(ScheduleError::DanglingPredecessor {
                    task: task.uid,
                    missing: pred.uid,
                });
            }
        }
    }

    errors
}

// ============================================================================
// Errors
// ============================================================================

/// Structural problem found in a schedule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Duplicate task uid: {0}")]
    DuplicateUid(TaskUid),

    #[error("Task {task} references predecessor {missing} which doesn't exist")]
    DanglingPredecessor { task: TaskUid, missing: TaskUid },

    #[error("Task {task} finishes ({finish}) before it starts ({start})")]
    InvalidDateRange {
        task: TaskUid,
        start: NaiveDate,
        finish: NaiveDate,
    },
}

// ============================================================================
// Tests
// ============================================================================
