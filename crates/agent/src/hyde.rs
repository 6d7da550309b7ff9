//! HyDE (Hypothetical Document Embeddings) query augmentation.
//!
//! Short or vague queries embed poorly. Instead of embedding the query
//! itself, ask a text generator for a short passage that *would* answer it
//! and embed that. When generation fails the raw query is embedded, so the
//! search still runs.

use recallkit_config::HydeSettings;
use recallkit_core::error::MemoryError;
use recallkit_core::provider::{Embedder, TextGenerator};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tuning knobs for the augmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydeConfig {
    /// Output cap for the hypothetical passage.
    pub max_output_tokens: u32,
    /// Dimensionality requested from the embedder.
    pub dimensions: usize,
    /// First-pass result counts below this are worth augmenting.
    pub min_results: usize,
}

impl Default for HydeConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 150,
            dimensions: 256,
            min_results: 3,
        }
    }
}

impl From<&HydeSettings> for HydeConfig {
    fn from(settings: &HydeSettings) -> Self {
        Self {
            max_output_tokens: settings.max_output_tokens,
            dimensions: settings.embedding_dimensions,
            min_results: settings.min_results,
        }
    }
}

/// The vector to search with and what it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct HydeEmbedding {
    pub vector: Vec<f32>,
    pub embedded_text: String,
    /// `false` when generation failed and the raw query was embedded.
    pub used_hypothetical: bool,
}

/// Rewrites queries into hypothetical answers before embedding them.
pub struct HydeAugmenter {
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn Embedder>,
    config: HydeConfig,
}

impl HydeAugmenter {
    pub fn new(generator: Arc<dyn TextGenerator>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            generator,
            embedder,
            config: HydeConfig::default(),
        }
    }

    /// Build an augmenter from the `[hyde]` config section, or `None` when
    /// it is disabled.
    pub fn from_settings(
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        settings: &HydeSettings,
    ) -> Option<Self> {
        if !settings.enabled {
            debug!("HyDE disabled by config");
            return None;
        }
        Some(Self::new(generator, embedder).with_config(HydeConfig::from(settings)))
    }

    pub fn with_config(mut self, config: HydeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &HydeConfig {
        &self.config
    }

    /// Whether a first pass that found `result_count` memories is sparse
    /// enough to justify a generation call.
    pub fn should_augment(&self, result_count: usize) -> bool {
        result_count < self.config.min_results
    }

    /// Embed `query` through a hypothetical answer, falling back to the
    /// query itself if generation fails or comes back blank.
    ///
    /// Embedding errors are returned as-is.
    pub async fn embed_query(&self, query: &str) -> Result<HydeEmbedding, MemoryError> {
        let prompt = hypothetical_prompt(query);
        let hypothetical = match self
            .generator
            .generate(&prompt, self.config.max_output_tokens)
            .await
        {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!(generator = self.generator.name(), "HyDE generation returned no text");
                None
            }
            Err(e) => {
                warn!(generator = self.generator.name(), "HyDE generation failed: {e}");
                None
            }
        };

        let used_hypothetical = hypothetical.is_some();
        let embedded_text = hypothetical.unwrap_or_else(|| query.to_string());
        let vector = self
            .embedder
            .embed(&embedded_text, self.config.dimensions)
            .await?;

        debug!(
            embedder = self.embedder.name(),
            used_hypothetical,
            dimensions = vector.len(),
            "HyDE query embedded"
        );

        Ok(HydeEmbedding {
            vector,
            embedded_text,
            used_hypothetical,
        })
    }
}

/// Prompt asking for a passage that would answer `query`.
pub fn hypothetical_prompt(query: &str) -> String {
    format!(
        "Write a short passage (2-4 sentences) that directly answers the question below, \
         as it might appear in a project's engineering notes. Do not add caveats or \
         mention that the passage is hypothetical.\n\nQuestion: {query}\n\nPassage:"
    )
}
