//! Agent phases and their context packing budgets.
//!
//! Each [`UniversalPhase`] selects a [`ContextPackingConfig`]: a total token
//! budget plus an ordered allocation of that budget across memory types.
//! The bundled defaults are immutable; callers override them by passing
//! their own config.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::memory::MemoryType;

/// The agent's current high-level activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniversalPhase {
    Define,
    Implement,
    Validate,
    Refine,
    Explore,
    Reflect,
}

impl UniversalPhase {
    pub const ALL: [UniversalPhase; 6] = [
        UniversalPhase::Define,
        UniversalPhase::Implement,
        UniversalPhase::Validate,
        UniversalPhase::Refine,
        UniversalPhase::Explore,
        UniversalPhase::Reflect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Define => "define",
            Self::Implement => "implement",
            Self::Validate => "validate",
            Self::Refine => "refine",
            Self::Explore => "explore",
            Self::Reflect => "reflect",
        }
    }

    /// The bundled packing config for this phase.
    pub fn default_packing(&self) -> &'static ContextPackingConfig {
        let idx = match self {
            Self::Define => 0,
            Self::Implement => 1,
            Self::Validate => 2,
            Self::Refine => 3,
            Self::Explore => 4,
            Self::Reflect => 5,
        };
        &DEFAULT_PACKING_CONFIGS[idx]
    }
}

impl fmt::Display for UniversalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UniversalPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown phase '{s}' (expected one of: define, implement, validate, refine, explore, reflect)"
                )
            })
    }
}

/// Token budget and per-type allocation for one packing pass.
///
/// Allocation fractions need not sum to 1. Types missing from the map share
/// whatever budget the allocated types leave behind. Map order is the order
/// in which types are packed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPackingConfig {
    pub total_budget: usize,

    #[serde(default)]
    pub allocation: IndexMap<MemoryType, f64>,
}

impl ContextPackingConfig {
    pub fn new(total_budget: usize) -> Self {
        Self {
            total_budget,
            allocation: IndexMap::new(),
        }
    }

    /// Append an allocation entry. Re-allocating a type keeps its position.
    pub fn allocate(mut self, memory_type: MemoryType, fraction: f64) -> Self {
        self.allocation.insert(memory_type, fraction);
        self
    }

    /// Token budget for one allocated type: `floor(total × fraction)`.
    pub fn type_budget(&self, memory_type: &MemoryType) -> Option<usize> {
        self.allocation
            .get(memory_type)
            .map(|fraction| (self.total_budget as f64 * fraction).floor().max(0.0) as usize)
    }
}

fn config(total_budget: usize, allocation: &[(MemoryType, f64)]) -> ContextPackingConfig {
    allocation
        .iter()
        .cloned()
        .fold(ContextPackingConfig::new(total_budget), |cfg, (t, f)| {
            cfg.allocate(t, f)
        })
}

/// Default packing configs, indexed in [`UniversalPhase::ALL`] order.
static DEFAULT_PACKING_CONFIGS: LazyLock<[ContextPackingConfig; 6]> = LazyLock::new(|| {
    use MemoryType::*;
    [
        // define
        config(
            2500,
            &[
                (WorkflowRecipe, 0.30),
                (Requirement, 0.20),
                (Decision, 0.20),
                (DeadEnd, 0.15),
                (TaskCalibration, 0.10),
            ],
        ),
        // implement
        config(
            3000,
            &[
                (Gotcha, 0.30),
                (ErrorPattern, 0.25),
                (CausalDependency, 0.15),
                (Pattern, 0.15),
                (DeadEnd, 0.10),
            ],
        ),
        // validate
        config(
            2500,
            &[
                (ErrorPattern, 0.30),
                (Requirement, 0.25),
                (E2eObservation, 0.25),
                (WorkUnitOutcome, 0.15),
            ],
        ),
        // refine
        config(
            2000,
            &[
                (ErrorPattern, 0.35),
                (Gotcha, 0.25),
                (DeadEnd, 0.20),
                (Pattern, 0.15),
            ],
        ),
        // explore
        config(
            2000,
            &[
                (ModuleInsight, 0.40),
                (Decision, 0.25),
                (Pattern, 0.20),
                (CausalDependency, 0.15),
            ],
        ),
        // reflect
        config(
            1500,
            &[
                (WorkUnitOutcome, 0.40),
                (TaskCalibration, 0.35),
                (DeadEnd, 0.25),
            ],
        ),
    ]
});
