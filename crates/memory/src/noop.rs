//! No-op memory store — disables persistent memory entirely.
//!
//! Searches always come back empty, so calibration reports no signal and
//! the packer renders nothing.

use async_trait::async_trait;
use recallkit_core::error::MemoryError;
use recallkit_core::memory::{Memory, MemorySearchFilter, MemoryStore};

/// A no-op memory store that stores nothing.
pub struct NoopStore;

#[async_trait]
impl MemoryStore for NoopStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn search(&self, _filter: MemorySearchFilter) -> Result<Vec<Memory>, MemoryError> {
        Ok(Vec::new())
    }

    async fn store(&self, _memory: Memory) -> Result<String, MemoryError> {
        Ok(String::new())
    }

    async fn update_access_count(&self, _id: &str) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn deprecate_memory(&self, _id: &str) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn verify_memory(&self, _id: &str) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn pin_memory(&self, _id: &str, _pinned: bool) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn delete_memory(&self, _id: &str) -> Result<bool, MemoryError> {
        Ok(false)
    }

    async fn search_by_pattern(&self, _pattern: &str) -> Result<Vec<Memory>, MemoryError> {
        Ok(Vec::new())
    }

    async fn insert_user_taught(
        &self,
        _content: &str,
        _project_id: &str,
        _tags: Vec<String>,
    ) -> Result<String, MemoryError> {
        Ok(String::new())
    }

    async fn search_workflow_recipe(
        &self,
        _task_description: &str,
        _limit: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        Ok(Vec::new())
    }
}
