//! Redundancy suppression for packed memories.
//!
//! A cheap lexical stand-in for Maximal Marginal Relevance: two memories are
//! near-duplicates when the Jaccard similarity of their word sets is above a
//! threshold. The packer only sees the [`SimilarityCheck`] trait, so an
//! embedding-based check can replace this without touching the packing loop.

use std::collections::HashSet;

/// Jaccard similarity above which two contents count as near-duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Decides whether two memory contents are redundant with each other.
pub trait SimilarityCheck: Send + Sync {
    fn is_too_similar(&self, a: &str, b: &str) -> bool;
}

/// Word-set Jaccard similarity with a fixed threshold.
#[derive(Debug, Clone, Copy)]
pub struct JaccardSimilarity {
    threshold: f64,
}

impl JaccardSimilarity {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for JaccardSimilarity {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityCheck for JaccardSimilarity {
    fn is_too_similar(&self, a: &str, b: &str) -> bool {
        jaccard(a, b) > self.threshold
    }
}

/// Lower-cased words of at least 3 characters, split on non-word characters
/// (anything other than ASCII letters, digits and `_`).
pub fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| w.len() >= 3)
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the two texts' word sets.
///
/// An empty word set on either side yields 0.0, so content with no
/// qualifying words never counts as a duplicate.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a_words = word_set(a);
    let b_words = word_set(b);
    if a_words.is_empty() || b_words.is_empty() {
        return 0.0;
    }
    let intersection = a_words.intersection(&b_words).count();
    let union = a_words.union(&b_words).count();
    intersection as f64 / union as f64
}
