//! Phase-aware context packing.
//!
//! Turns a relevance-ranked list of memories into a compact, token-bounded
//! text block for the current phase of work.
//!
//! # Pipeline
//!
//! | Step | Module | What happens |
//! |------|--------|--------------|
//! | 1. Cost | [`token`] | Each formatted memory is priced in estimated tokens |
//! | 2. Diversity | [`diversity`] | Near-duplicates of accepted memories are skipped |
//! | 3. Budget | [`packer`] | Per-type allocations, then a shared remainder |

pub mod diversity;
pub mod packer;
pub mod token;

pub use diversity::{JaccardSimilarity, SimilarityCheck};
pub use packer::{
    ContextPacker, DropInfo, DropReason, PackedContext, PackingReport, TypeStats, format_memory,
    pack,
};
