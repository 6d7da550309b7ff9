//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use recallkit_core::error::MemoryError;
use recallkit_core::memory::{
    Memory, MemorySearchFilter, MemorySource, MemoryStore, MemoryType,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// An in-memory store that keeps memories in a Vec.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryStore {
    entries: Arc<RwLock<Vec<Memory>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed the store with an existing list, assigning IDs where missing.
    pub fn from_memories(memories: Vec<Memory>) -> Self {
        let entries = memories.into_iter().map(with_assigned_id).collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Get a memory by ID, including deprecated ones.
    pub async fn get(&self, id: &str) -> Option<Memory> {
        self.entries.read().await.iter().find(|m| m.id == id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Every stored memory in insertion order.
    pub async fn snapshot(&self) -> Vec<Memory> {
        self.entries.read().await.clone()
    }

    /// Swap the whole contents, e.g. to undo a mutation that couldn't be persisted.
    pub(crate) async fn replace_all(&self, memories: Vec<Memory>) {
        *self.entries.write().await = memories;
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Apply `update` to the memory with the given ID.
    async fn modify<F>(&self, id: &str, update: F) -> Result<(), MemoryError>
    where
        F: FnOnce(&mut Memory),
    {
        let mut entries = self.entries.write().await;
        let memory = entries
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;
        update(memory);
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn with_assigned_id(mut memory: Memory) -> Memory {
    if memory.id.is_empty() {
        memory.id = Uuid::new_v4().to_string();
    }
    memory
}

/// Lower-cased alphanumeric words of three or more characters.
fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(&self, filter: MemorySearchFilter) -> Result<Vec<Memory>, MemoryError> {
        let entries = self.entries.read().await;
        let matched: Vec<Memory> = entries
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        Ok(filter.order(matched))
    }

    async fn store(&self, memory: Memory) -> Result<String, MemoryError> {
        let memory = with_assigned_id(memory);
        let id = memory.id.clone();
        self.entries.write().await.push(memory);
        Ok(id)
    }

    async fn update_access_count(&self, id: &str) -> Result<(), MemoryError> {
        self.modify(id, |m| {
            m.access_count += 1;
            m.last_accessed_at = Utc::now();
        })
        .await
    }

    async fn deprecate_memory(&self, id: &str) -> Result<(), MemoryError> {
        self.modify(id, |m| m.deprecated = true).await
    }

    async fn verify_memory(&self, id: &str) -> Result<(), MemoryError> {
        self.modify(id, |m| m.user_verified = true).await
    }

    async fn pin_memory(&self, id: &str, pinned: bool) -> Result<(), MemoryError> {
        self.modify(id, |m| m.pinned = pinned).await
    }

    async fn delete_memory(&self, id: &str) -> Result<bool, MemoryError> {
        let mut entries = self.entries.write().await;
        let len_before = entries.len();
        entries.retain(|m| m.id != id);
        Ok(entries.len() < len_before)
    }

    async fn search_by_pattern(&self, pattern: &str) -> Result<Vec<Memory>, MemoryError> {
        let needle = pattern.to_lowercase();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|m| !m.deprecated && m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn insert_user_taught(
        &self,
        content: &str,
        project_id: &str,
        tags: Vec<String>,
    ) -> Result<String, MemoryError> {
        let mut memory = Memory::new(MemoryType::Preference, content)
            .with_project(project_id)
            .with_tags(tags)
            .with_source(MemorySource::UserTaught);
        memory.user_verified = true;
        self.store(memory).await
    }

    async fn search_workflow_recipe(
        &self,
        task_description: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        let wanted = keywords(task_description);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<(usize, Memory)> = entries
            .iter()
            .filter(|m| !m.deprecated && m.memory_type == MemoryType::WorkflowRecipe)
            .filter_map(|m| {
                let overlap = keywords(&m.content).intersection(&wanted).count();
                (overlap > 0).then(|| (overlap, m.clone()))
            })
            .collect();

        // Stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(_, m)| m).collect())
    }
}
