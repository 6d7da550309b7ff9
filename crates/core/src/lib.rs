//! # RecallKit Core
//!
//! Domain types, capability traits, and error definitions for RecallKit,
//! the memory-retrieval shaping layer of a coding agent. No I/O happens
//! here; the other crates and the host application implement against it.
//!
//! External collaborators (memory store, text generation, embeddings) are
//! traits, so the packer and calibration engine run against fakes in tests
//! and store implementations are picked by configuration.

pub mod error;
pub mod memory;
pub mod phase;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GenerationError, MemoryError, Result};
pub use memory::{
    Memory, MemoryScope, MemorySearchFilter, MemorySource, MemoryStore, MemoryType, SortOrder,
};
pub use phase::{ContextPackingConfig, UniversalPhase};
pub use provider::{Embedder, TextGenerator};
