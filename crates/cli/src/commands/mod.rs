//! Subcommand implementations.

pub mod calibrate;
pub mod config_cmd;
pub mod memory;
pub mod pack;
pub mod phases;

use recallkit_config::AppConfig;
use recallkit_core::memory::MemoryStore;
use std::sync::Arc;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Open the store named in `config.memory`.
pub(crate) fn open_configured_store(config: &AppConfig) -> Arc<dyn MemoryStore> {
    recallkit_memory::open_store(&config.memory.backend, config.memory.path.clone())
}
