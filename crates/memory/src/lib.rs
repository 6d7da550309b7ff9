//! Memory store implementations for RecallKit.

pub mod file_backend;
pub mod in_memory;
pub mod noop;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
pub use noop::NoopStore;

use recallkit_core::memory::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Open the store named by configuration (`file`, `in_memory`, `none`).
///
/// Unknown names fall back to the no-op store with a warning, so a typo in
/// config disables memory rather than aborting the agent.
pub fn open_store(backend: &str, path: Option<PathBuf>) -> Arc<dyn MemoryStore> {
    match backend {
        "file" => Arc::new(FileStore::open(path.unwrap_or_else(FileStore::default_path))),
        "in_memory" => Arc::new(InMemoryStore::new()),
        "none" => Arc::new(NoopStore),
        other => {
            tracing::warn!(backend = other, "Unknown memory backend, memory disabled");
            Arc::new(NoopStore)
        }
    }
}
