//! Model capabilities consumed by retrieval augmentation.
//!
//! RecallKit never talks to a model vendor directly. The host application
//! wraps its LLM client in these traits and hands them in; tests hand in
//! scripted fakes.

use async_trait::async_trait;
use crate::error::{GenerationError, MemoryError};

/// Free-form text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A human-readable name for this generator (e.g., "haiku", "local").
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`, stopping after roughly
    /// `max_output_tokens` tokens.
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> std::result::Result<String, GenerationError>;
}

/// Text embedding into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// Embed `text` into a vector of exactly `dimensions` floats.
    async fn embed(
        &self,
        text: &str,
        dimensions: usize,
    ) -> std::result::Result<Vec<f32>, MemoryError>;
}
