//! Adaptive stop condition — how many steps the agent loop gets.
//!
//! The base step budget is scaled by the calibration factor (capped), then
//! clamped to an absolute ceiling:
//!
//! ```text
//! multiplier = min(factor ?? 1.0, 2.0)
//! max_steps  = min(ceil(base × multiplier), 2000)
//! ```

use recallkit_config::CalibrationConfig;
use recallkit_core::memory::MemoryStore;
use tracing::debug;

use crate::calibration::CalibrationEngine;

/// Largest multiplier a calibration factor may apply.
pub const MAX_CALIBRATION_MULTIPLIER: f64 = 2.0;

/// Absolute step ceiling, whatever the base or multiplier.
pub const MAX_STEPS_CEILING: u32 = 2000;

/// A resolved step budget for one agent run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopCondition {
    base_steps: u32,
    multiplier: f64,
    max_steps: u32,
}

impl StopCondition {
    pub fn base_steps(&self) -> u32 {
        self.base_steps
    }

    /// The multiplier actually applied (after capping).
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// The adjusted step budget.
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Whether an agent at `step` should stop.
    pub fn should_stop(&self, step: u32) -> bool {
        step >= self.max_steps
    }

    /// A stateless predicate for loops that only take a closure.
    pub fn into_predicate(self) -> Box<dyn Fn(u32) -> bool + Send + Sync> {
        Box::new(move |step| self.should_stop(step))
    }
}

/// Builds [`StopCondition`]s with a configurable multiplier cap and ceiling.
#[derive(Debug, Clone, Copy)]
pub struct StopConditionBuilder {
    max_multiplier: f64,
    ceiling: u32,
}

impl Default for StopConditionBuilder {
    fn default() -> Self {
        Self {
            max_multiplier: MAX_CALIBRATION_MULTIPLIER,
            ceiling: MAX_STEPS_CEILING,
        }
    }
}

impl StopConditionBuilder {
    pub fn new(max_multiplier: f64, ceiling: u32) -> Self {
        Self {
            max_multiplier,
            ceiling,
        }
    }

    /// Combine `base_steps` with an optional calibration factor.
    ///
    /// A missing, NaN or non-positive factor leaves the base unchanged.
    /// Anything above the cap, `+inf` included, is clamped to it.
    pub fn build(&self, base_steps: u32, calibration_factor: Option<f64>) -> StopCondition {
        let factor = calibration_factor
            .filter(|f| !f.is_nan() && *f > 0.0)
            .unwrap_or(1.0);
        let multiplier = factor.min(self.max_multiplier);
        let adjusted = (f64::from(base_steps) * multiplier).ceil();
        let max_steps = if adjusted >= f64::from(self.ceiling) {
            self.ceiling
        } else {
            adjusted as u32
        };

        debug!(
            base_steps,
            factor = ?calibration_factor,
            multiplier,
            max_steps,
            "Stop condition built"
        );

        StopCondition {
            base_steps,
            multiplier,
            max_steps,
        }
    }
}

impl From<&CalibrationConfig> for StopConditionBuilder {
    fn from(config: &CalibrationConfig) -> Self {
        Self::new(config.max_multiplier, config.max_steps_ceiling)
    }
}

/// Stop condition with the default cap and ceiling.
pub fn build_memory_aware_stop_condition(
    base_steps: u32,
    calibration_factor: Option<f64>,
) -> StopCondition {
    StopConditionBuilder::default().build(base_steps, calibration_factor)
}

/// Look up the calibration factor for `modules` and build a stop condition
/// with the default engine and limits.
///
/// A failed lookup falls back to the uncalibrated base.
pub async fn calibrated_stop_condition(
    store: &dyn MemoryStore,
    modules: &[String],
    project_id: &str,
    base_steps: u32,
) -> StopCondition {
    calibrated_stop_condition_with(
        &CalibrationEngine::new(),
        &StopConditionBuilder::default(),
        store,
        modules,
        project_id,
        base_steps,
    )
    .await
}

/// Like [`calibrated_stop_condition`], with a caller-supplied sample cap
/// and multiplier/ceiling limits.
pub async fn calibrated_stop_condition_with(
    engine: &CalibrationEngine,
    builder: &StopConditionBuilder,
    store: &dyn MemoryStore,
    modules: &[String],
    project_id: &str,
    base_steps: u32,
) -> StopCondition {
    let factor = engine.factor(store, modules, project_id).await;
    builder.build(base_steps, factor)
}
