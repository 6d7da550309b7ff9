//! Calibration engine — turns past planned/actual effort into a step factor.
//!
//! Each `task_calibration` memory carries a JSON payload with a `ratio`
//! (actual ÷ planned steps for earlier work in a module). The engine fetches
//! the ones relevant to the modules being touched and averages them.
//!
//! Calibration is best-effort: a failing store or an empty history yields
//! `None` ("no signal"), and a malformed payload counts as a neutral `1.0`.

use recallkit_config::CalibrationConfig;
use recallkit_core::memory::{Memory, MemorySearchFilter, MemoryStore, MemoryType, SortOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ratio substituted for payloads that don't parse or lack a `ratio`.
pub const NEUTRAL_RATIO: f64 = 1.0;

/// The JSON convention stored in `task_calibration` content.
///
/// Only `ratio` is read back; the rest is bookkeeping for humans and for
/// whatever process writes calibrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCalibration {
    pub module: String,
    pub ratio: f64,
    #[serde(default)]
    pub average_actual_steps: f64,
    #[serde(default)]
    pub average_planned_steps: f64,
    #[serde(default)]
    pub sample_count: u32,
}

impl TaskCalibration {
    /// Build a calibration from observed step counts.
    ///
    /// A zero planned count gives a neutral ratio.
    pub fn from_steps(
        module: impl Into<String>,
        average_planned_steps: f64,
        average_actual_steps: f64,
        sample_count: u32,
    ) -> Self {
        let ratio = if average_planned_steps > 0.0 {
            average_actual_steps / average_planned_steps
        } else {
            NEUTRAL_RATIO
        };
        Self {
            module: module.into(),
            ratio,
            average_actual_steps,
            average_planned_steps,
            sample_count,
        }
    }

    /// Wrap this payload in a `task_calibration` memory for `project_id`.
    pub fn into_memory(self, project_id: impl Into<String>) -> Memory {
        let content = serde_json::to_string(&self).unwrap_or_default();
        Memory::new(MemoryType::TaskCalibration, content)
            .with_modules([self.module])
            .with_project(project_id)
    }
}

/// Read the `ratio` field out of a calibration payload.
///
/// Anything other than a JSON object with a numeric `ratio` yields
/// [`NEUTRAL_RATIO`].
pub fn extract_ratio(content: &str) -> f64 {
    serde_json::from_str::<serde_json::Value>(content)
        .ok()
        .and_then(|v| v.get("ratio").and_then(serde_json::Value::as_f64))
        .unwrap_or(NEUTRAL_RATIO)
}

/// Aggregates calibration memories into a single multiplicative factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationEngine {
    sample_limit: Option<usize>,
}

impl CalibrationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap how many of the most recent calibrations are averaged.
    pub fn with_sample_limit(mut self, limit: Option<usize>) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn sample_limit(&self) -> Option<usize> {
        self.sample_limit
    }

    /// Mean calibration ratio for `modules` in `project_id`, if any history exists.
    pub async fn factor(
        &self,
        store: &dyn MemoryStore,
        modules: &[String],
        project_id: &str,
    ) -> Option<f64> {
        let filter = MemorySearchFilter::default()
            .with_types([MemoryType::TaskCalibration])
            .with_modules(modules)
            .with_project(project_id)
            .with_sort(SortOrder::Recency)
            .with_limit(self.sample_limit);

        let calibrations = match store.search(filter).await {
            Ok(found) => found,
            Err(e) => {
                warn!(store = store.name(), "Calibration lookup failed: {e}");
                return None;
            }
        };

        if calibrations.is_empty() {
            debug!(modules = ?modules, project = project_id, "No calibration history");
            return None;
        }

        let sum: f64 = calibrations.iter().map(|m| extract_ratio(&m.content)).sum();
        let factor = sum / calibrations.len() as f64;
        debug!(
            modules = ?modules,
            samples = calibrations.len(),
            factor,
            "Calibration factor computed"
        );
        Some(factor)
    }
}

impl From<&CalibrationConfig> for CalibrationEngine {
    fn from(config: &CalibrationConfig) -> Self {
        Self::new().with_sample_limit(config.sample_limit)
    }
}

/// Calibration factor with no sample cap.
pub async fn get_calibration_factor(
    store: &dyn MemoryStore,
    modules: &[String],
    project_id: &str,
) -> Option<f64> {
    CalibrationEngine::new().factor(store, modules, project_id).await
}
