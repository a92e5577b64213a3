//! Leveling constraints and their configuration format.
//!
//! `Constraints` is supplied per optimization call. It can be built in code,
//! taken from [`default_constraints`], or loaded from a TOML or JSON file:
//!
//! ```toml
//! maxWorkersPerFloor = 18
//!
//! [[equipmentConflicts]]
//! equipmentName = "Grua"
//! maxConcurrent = 1
//! phases = ["structure", "roofing"]
//!
//! [[phaseOverlapRules]]
//! phaseA = "structure"
//! phaseB = "waterproofing"
//! allowOverlap = false
//! minGapDays = 7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ConstructionPhase;

/// Longest accepted phase gap, ten years
pub const MAX_GAP_DAYS: i64 = 3650;

/// Limits the optimizer levels against
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Maximum aggregate workforce on site per day
    pub max_workers_per_floor: u32,
    #[serde(default)]
    pub equipment_conflicts: Vec<EquipmentConflictRule>,
    #[serde(default)]
    pub phase_overlap_rules: Vec<PhaseOverlapRule>,
}

/// Shared equipment that can serve at most `max_concurrent` tasks at once
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentConflictRule {
    pub equipment_name: String,
    pub max_concurrent: u32,
    /// Phases whose tasks use this equipment
    pub phases: Vec<ConstructionPhase>,
}

/// Sequencing rule between two phases
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseOverlapRule {
    pub phase_a: ConstructionPhase,
    pub phase_b: ConstructionPhase,
    pub allow_overlap: bool,
    /// Days `phase_b` must wait after the last `phase_a` task finishes
    #[serde(default)]
    pub min_gap_days: i64,
}

impl EquipmentConflictRule {
    pub fn new(
        equipment_name: impl Into<String>,
        max_concurrent: u32,
        phases: impl Into<Vec<ConstructionPhase>>,
    ) -> Self {
        Self {
            equipment_name: equipment_name.into(),
            max_concurrent,
            phases: phases.into(),
        }
    }
}

impl PhaseOverlapRule {
    /// Phase B may not start until `min_gap_days` after phase A finishes
    pub fn sequential(a: ConstructionPhase, b: ConstructionPhase, min_gap_days: i64) -> Self {
        Self {
            phase_a: a,
            phase_b: b,
            allow_overlap: false,
            min_gap_days,
        }
    }

    /// Phases may run concurrently
    pub fn overlapping(a: ConstructionPhase, b: ConstructionPhase) -> Self {
        Self {
            phase_a: a,
            phase_b: b,
            allow_overlap: true,
            min_gap_days: 0,
        }
    }
}

/// Errors while loading constraints
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid constraints: {0}")]
    Invalid(String),
}

impl Constraints {
    /// Constraints with only a workforce limit and no equipment or phase rules
    pub fn with_max_workers(max_workers_per_floor: u32) -> Self {
        Self {
            max_workers_per_floor,
            equipment_conflicts: Vec::new(),
            phase_overlap_rules: Vec::new(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let constraints: Constraints = toml::from_str(s)?;
        constraints.validate()?;
        Ok(constraints)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let constraints: Constraints = serde_json::from_str(s)?;
        constraints.validate()?;
        Ok(constraints)
    }

    /// Load from a file; `.toml` files are parsed as TOML, anything else as JSON
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject limits that would make every schedule infeasible
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers_per_floor == 0 {
            return Err(ConfigError::Invalid(
                "maxWorkersPerFloor must be at least 1".into(),
            ));
        }
        if let Some(rule) = self
            .equipment_conflicts
            .iter()
            .find(|r| r.max_concurrent == 0)
        {
            return Err(ConfigError::Invalid(format!(
                "equipment '{}' must allow at least one concurrent use",
                rule.equipment_name
            )));
        }
        if let Some(rule) = self.phase_overlap_rules.iter().find(|r| r.min_gap_days < 0) {
            return Err(ConfigError::Invalid(format!(
                "negative gap between {:?} and {:?}",
                rule.phase_a, rule.phase_b
            )));
        }
        if let Some(rule) = self
            .phase_overlap_rules
            .iter()
            .find(|r| r.min_gap_days > MAX_GAP_DAYS)
        {
            return Err(ConfigError::Invalid(format!(
                "gap between {:?} and {:?} exceeds {MAX_GAP_DAYS} days",
                rule.phase_a, rule.phase_b
            )));
        }
        Ok(())
    }
}

impl Default for Constraints {
    fn default() -> Self {
        default_constraints()
    }
}

/// Baseline constraints for a typical multi-storey residential site.
///
/// Workforce limit of 20, three shared-equipment rules and twenty
/// phase sequencing rules.
pub fn default_constraints() -> Constraints {
    use ConstructionPhase::*;

    Constraints {
        max_workers_per_floor: 20,
        equipment_conflicts: vec![
            EquipmentConflictRule::new("Grua", 1, [Structure, Roofing]),
            EquipmentConflictRule::new("Andaime", 2, [Masonry, Plastering, Painting]),
            EquipmentConflictRule::new("Escavadeira", 1, [Earthworks, Foundations]),
        ],
        phase_overlap_rules: vec![
            PhaseOverlapRule::sequential(Preliminary, Earthworks, 0),
            PhaseOverlapRule::sequential(Earthworks, Foundations, 0),
            // concrete cure before loading
            PhaseOverlapRule::sequential(Foundations, Structure, 7),
            PhaseOverlapRule::overlapping(Structure, Masonry),
            PhaseOverlapRule::sequential(Structure, Roofing, 0),
            PhaseOverlapRule::sequential(Structure, Waterproofing, 7),
            PhaseOverlapRule::overlapping(Masonry, Plumbing),
            PhaseOverlapRule::overlapping(Masonry, Electrical),
            PhaseOverlapRule::sequential(Masonry, Plastering, 2),
            PhaseOverlapRule::sequential(Plumbing, Plastering, 0),
            PhaseOverlapRule::sequential(Electrical, Plastering, 0),
            PhaseOverlapRule::overlapping(Roofing, Waterproofing),
            PhaseOverlapRule::overlapping(Electrical, Hvac),
            PhaseOverlapRule::sequential(Waterproofing, Flooring, 3),
            PhaseOverlapRule::sequential(Plastering, Flooring, 2),
            PhaseOverlapRule::sequential(Plastering, Painting, 7),
            PhaseOverlapRule::overlapping(Flooring, Painting),
            PhaseOverlapRule::sequential(Painting, Finishing, 0),
            PhaseOverlapRule::overlapping(Finishing, Landscaping),
            PhaseOverlapRule::sequential(Finishing, Cleanup, 0),
        ],
    }
}
