//! File-based memory store — persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded [`Memory`] in the same camelCase shape the
//! agent writes, so a store exported by the host application can be read
//! directly.
//!
//! Storage location: `~/.recallkit/memory/memories.jsonl`

use async_trait::async_trait;
use recallkit_core::error::MemoryError;
use recallkit_core::memory::{Memory, MemorySearchFilter, MemoryStore};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::in_memory::InMemoryStore;

/// A file-backed memory store using JSONL (one JSON object per line).
///
/// Entries are loaded into memory on creation and flushed to disk on every
/// mutation. A mutation whose flush fails is rolled back, so the in-memory
/// view never holds a write the caller saw fail.
pub struct FileStore {
    path: PathBuf,
    inner: InMemoryStore,
    /// Held across mutate + flush so a rollback can't clobber another write.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a file-based store at the given path.
    ///
    /// If the file exists, entries are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn open(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File memory store loaded");
        Self {
            path,
            inner: InMemoryStore::from_memories(entries),
            write_lock: Mutex::new(()),
        }
    }

    /// Default path: `~/.recallkit/memory/memories.jsonl`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".recallkit")
            .join("memory")
            .join("memories.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a memory by ID, including deprecated ones.
    pub async fn get(&self, id: &str) -> Option<Memory> {
        self.inner.get(id).await
    }

    pub async fn count(&self) -> usize {
        self.inner.count().await
    }

    pub async fn snapshot(&self) -> Vec<Memory> {
        self.inner.snapshot().await
    }

    /// Load entries from a JSONL file.
    fn load_from_disk(path: &Path) -> Vec<Memory> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(), // No file yet, start empty
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Memory>(line) {
                Ok(memory) => Some(memory),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory entry");
                    None
                }
            })
            .collect()
    }

    /// Flush all entries to disk as JSONL.
    async fn flush(&self) -> Result<(), MemoryError> {
        let entries = self.inner.snapshot().await;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for memory in &entries {
            let line = serde_json::to_string(memory).map_err(|e| {
                MemoryError::Storage(format!("Failed to serialize memory: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;

        Ok(())
    }

    /// Flush after a mutation, restoring `before` if the write fails.
    async fn commit<T>(&self, before: Vec<Memory>, value: T) -> Result<T, MemoryError> {
        match self.flush().await {
            Ok(()) => Ok(value),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Memory write failed, rolling back");
                self.inner.replace_all(before).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl MemoryStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn search(&self, filter: MemorySearchFilter) -> Result<Vec<Memory>, MemoryError> {
        self.inner.search(filter).await
    }

    async fn store(&self, memory: Memory) -> Result<String, MemoryError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let id = self.inner.store(memory).await?;
        self.commit(before, id).await
    }

    async fn update_access_count(&self, id: &str) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        self.inner.update_access_count(id).await?;
        self.commit(before, ()).await
    }

    async fn deprecate_memory(&self, id: &str) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        self.inner.deprecate_memory(id).await?;
        self.commit(before, ()).await
    }

    async fn verify_memory(&self, id: &str) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        self.inner.verify_memory(id).await?;
        self.commit(before, ()).await
    }

    async fn pin_memory(&self, id: &str, pinned: bool) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        self.inner.pin_memory(id, pinned).await?;
        self.commit(before, ()).await
    }

    async fn delete_memory(&self, id: &str) -> Result<bool, MemoryError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let deleted = self.inner.delete_memory(id).await?;
        if !deleted {
            return Ok(false);
        }
        self.commit(before, true).await
    }

    async fn search_by_pattern(&self, pattern: &str) -> Result<Vec<Memory>, MemoryError> {
        self.inner.search_by_pattern(pattern).await
    }

    async fn insert_user_taught(
        &self,
        content: &str,
        project_id: &str,
        tags: Vec<String>,
    ) -> Result<String, MemoryError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let id = self.inner.insert_user_taught(content, project_id, tags).await?;
        self.commit(before, id).await
    }

    async fn search_workflow_recipe(
        &self,
        task_description: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        self.inner
            .search_workflow_recipe(task_description, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recallkit_core::memory::MemoryType;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn fresh_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory").join("memories.jsonl");
        (dir, path)
    }

    #[tokio::test]
    async fn store_and_retrieve_persists() {
        let (_dir, path) = fresh_path();

        let store = FileStore::open(path.clone());
        let id = store
            .store(Memory::new(MemoryType::Decision, "Use sqlx for the DB layer"))
            .await
            .unwrap();
        assert!(!id.is_empty());

        // Verify file was written
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Use sqlx for the DB layer"));
        assert!(content.contains("\"type\":\"decision\""));

        // Reload from disk and find the entry
        let reopened = FileStore::open(path);
        let memory = reopened.get(&id).await.unwrap();
        assert_eq!(memory.content, "Use sqlx for the DB layer");
    }

    #[tokio::test]
    async fn flag_updates_persist() {
        let (_dir, path) = fresh_path();

        let store = FileStore::open(path.clone());
        let id = store
            .store(Memory::new(MemoryType::Gotcha, "CI caches target/"))
            .await
            .unwrap();
        store.deprecate_memory(&id).await.unwrap();
        store.update_access_count(&id).await.unwrap();

        let reopened = FileStore::open(path);
        let memory = reopened.get(&id).await.unwrap();
        assert!(memory.deprecated);
        assert_eq!(memory.access_count, 1);
    }

    #[tokio::test]
    async fn delete_persists() {
        let (_dir, path) = fresh_path();

        let store = FileStore::open(path.clone());
        let id = store
            .store(Memory::new(MemoryType::Gotcha, "To be deleted"))
            .await
            .unwrap();
        assert!(store.delete_memory(&id).await.unwrap());

        let reopened = FileStore::open(path);
        assert!(reopened.get(&id).await.is_none());
        assert_eq!(reopened.count().await, 0);
    }

    #[tokio::test]
    async fn handles_missing_file_gracefully() {
        let (_dir, path) = fresh_path();
        let store = FileStore::open(path);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn handles_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"id":"1","type":"gotcha","content":"valid"}}"#).unwrap();
        writeln!(tmp, "this is not json").unwrap();
        writeln!(tmp, r#"{{"id":"2","type":"pattern","content":"also valid"}}"#).unwrap();
        let path = tmp.path().to_path_buf();

        let store = FileStore::open(path);
        // Should load 2 valid entries, skip the corrupted one
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn failed_write_is_not_visible() {
        // A directory where the file should be makes every write fail.
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().to_path_buf());

        let result = store.store(Memory::new(MemoryType::Gotcha, "ghost")).await;
        assert!(result.is_err());
        assert_eq!(store.count().await, 0);
        assert!(
            store
                .search(MemorySearchFilter::default())
                .await
                .unwrap()
                .is_empty()
        );

        let taught = store.insert_user_taught("also a ghost", "p1", vec![]).await;
        assert!(taught.is_err());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn failed_update_rolls_back() {
        let (_dir, path) = fresh_path();
        let store = FileStore::open(path.clone());
        let id = store
            .store(Memory::new(MemoryType::Gotcha, "CI caches target/"))
            .await
            .unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.deprecate_memory(&id).await.is_err());
        assert!(store.delete_memory(&id).await.is_err());

        let memory = store.get(&id).await.unwrap();
        assert!(!memory.deprecated);
        assert_eq!(store.count().await, 1);

        // Once the path is writable again, later writes persist normally.
        std::fs::remove_dir(&path).unwrap();
        store.update_access_count(&id).await.unwrap();
        let reopened = FileStore::open(path);
        let memory = reopened.get(&id).await.unwrap();
        assert!(!memory.deprecated);
        assert_eq!(memory.access_count, 1);
    }
}
