//! Shared fakes for agent tests.

use async_trait::async_trait;
use recallkit_core::error::{GenerationError, MemoryError};
use recallkit_core::memory::{Memory, MemorySearchFilter, MemoryStore};
use recallkit_core::provider::{Embedder, TextGenerator};
use std::sync::Mutex;

/// A store whose every operation fails, as if the backend were unreachable.
pub struct FailingStore;

fn unavailable() -> MemoryError {
    MemoryError::QueryFailed("store unavailable".into())
}

#[async_trait]
impl MemoryStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(&self, _filter: MemorySearchFilter) -> Result<Vec<Memory>, MemoryError> {
        Err(unavailable())
    }

    async fn store(&self, _memory: Memory) -> Result<String, MemoryError> {
        Err(unavailable())
    }

    async fn update_access_count(&self, _id: &str) -> Result<(), MemoryError> {
        Err(unavailable())
    }

    async fn deprecate_memory(&self, _id: &str) -> Result<(), MemoryError> {
        Err(unavailable())
    }

    async fn verify_memory(&self, _id: &str) -> Result<(), MemoryError> {
        Err(unavailable())
    }

    async fn pin_memory(&self, _id: &str, _pinned: bool) -> Result<(), MemoryError> {
        Err(unavailable())
    }

    async fn delete_memory(&self, _id: &str) -> Result<bool, MemoryError> {
        Err(unavailable())
    }

    async fn search_by_pattern(&self, _pattern: &str) -> Result<Vec<Memory>, MemoryError> {
        Err(unavailable())
    }

    async fn insert_user_taught(
        &self,
        _content: &str,
        _project_id: &str,
        _tags: Vec<String>,
    ) -> Result<String, MemoryError> {
        Err(unavailable())
    }

    async fn search_workflow_recipe(
        &self,
        _task_description: &str,
        _limit: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        Err(unavailable())
    }
}

/// A generator that always gives the same scripted reply and records prompts.
pub struct ScriptedGenerator {
    reply: Result<String, GenerationError>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(prompt, max_output_tokens)` for each call so far.
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_output_tokens));
        self.reply.clone()
    }
}

/// An embedder that records its inputs and returns a constant vector.
#[derive(Default)]
pub struct RecordingEmbedder {
    fail: bool,
    calls: Mutex<Vec<(String, usize)>>,
}

impl RecordingEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(text, dimensions)` for each call so far.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    fn name(&self) -> &str {
        "recording"
    }

    async fn embed(&self, text: &str, dimensions: usize) -> Result<Vec<f32>, MemoryError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), dimensions));
        if self.fail {
            return Err(MemoryError::EmbeddingFailed("model offline".into()));
        }
        Ok(vec![0.5; dimensions])
    }
}
