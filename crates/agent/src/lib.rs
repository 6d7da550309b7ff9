//! Memory-retrieval shaping for coding agents.
//!
//! Two independent paths feed the agent loop:
//!
//! 1. **Context**: ranked memories → [`ContextPacker`] → a token-bounded
//!    prompt block for the current [`UniversalPhase`](recallkit_core::UniversalPhase)
//! 2. **Step budget**: modules + project → [`CalibrationEngine`] → factor →
//!    [`StopConditionBuilder`] → when the loop should give up
//!
//! [`HydeAugmenter`] optionally rewrites sparse queries into hypothetical
//! answers before they are embedded for retrieval.

pub mod calibration;
pub mod context;
pub mod hyde;
pub mod stop_condition;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use calibration::{CalibrationEngine, TaskCalibration, extract_ratio, get_calibration_factor};
pub use context::{
    ContextPacker, DropInfo, DropReason, JaccardSimilarity, PackedContext, PackingReport,
    SimilarityCheck, TypeStats, pack,
};
pub use hyde::{HydeAugmenter, HydeConfig, HydeEmbedding};
pub use stop_condition::{
    StopCondition, StopConditionBuilder, build_memory_aware_stop_condition,
    calibrated_stop_condition, calibrated_stop_condition_with,
};
