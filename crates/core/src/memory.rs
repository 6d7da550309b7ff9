//! Memory model and the store capability.
//!
//! A [`Memory`] is a single recorded fact about a project: a decision, a
//! gotcha, an error pattern, a calibration sample. RecallKit never creates
//! memories on its own behalf; it consumes lists handed to it by a
//! retrieval stage or queried through a [`MemoryStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MemoryError;

/// The kind of fact a memory records.
///
/// Unknown type strings are preserved in [`MemoryType::Other`] so that a
/// newer writer never makes an older reader drop memories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemoryType {
    Gotcha,
    Decision,
    Preference,
    Pattern,
    Requirement,
    ErrorPattern,
    ModuleInsight,
    PrefetchPattern,
    WorkState,
    CausalDependency,
    TaskCalibration,
    E2eObservation,
    DeadEnd,
    WorkUnitOutcome,
    WorkflowRecipe,
    ContextCost,
    Other(String),
}

impl MemoryType {
    /// Every known memory type, in canonical order.
    pub const KNOWN: [MemoryType; 16] = [
        MemoryType::Gotcha,
        MemoryType::Decision,
        MemoryType::Preference,
        MemoryType::Pattern,
        MemoryType::Requirement,
        MemoryType::ErrorPattern,
        MemoryType::ModuleInsight,
        MemoryType::PrefetchPattern,
        MemoryType::WorkState,
        MemoryType::CausalDependency,
        MemoryType::TaskCalibration,
        MemoryType::E2eObservation,
        MemoryType::DeadEnd,
        MemoryType::WorkUnitOutcome,
        MemoryType::WorkflowRecipe,
        MemoryType::ContextCost,
    ];

    /// The wire name (e.g. `error_pattern`).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gotcha => "gotcha",
            Self::Decision => "decision",
            Self::Preference => "preference",
            Self::Pattern => "pattern",
            Self::Requirement => "requirement",
            Self::ErrorPattern => "error_pattern",
            Self::ModuleInsight => "module_insight",
            Self::PrefetchPattern => "prefetch_pattern",
            Self::WorkState => "work_state",
            Self::CausalDependency => "causal_dependency",
            Self::TaskCalibration => "task_calibration",
            Self::E2eObservation => "e2e_observation",
            Self::DeadEnd => "dead_end",
            Self::WorkUnitOutcome => "work_unit_outcome",
            Self::WorkflowRecipe => "workflow_recipe",
            Self::ContextCost => "context_cost",
            Self::Other(raw) => raw,
        }
    }

    /// Human-readable label used when rendering a memory for the model.
    ///
    /// Unknown types fall back to their raw type string.
    pub fn label(&self) -> &str {
        match self {
            Self::Gotcha => "Gotcha",
            Self::Decision => "Decision",
            Self::Preference => "Preference",
            Self::Pattern => "Pattern",
            Self::Requirement => "Requirement",
            Self::ErrorPattern => "Error Pattern",
            Self::ModuleInsight => "Module Insight",
            Self::PrefetchPattern => "Prefetch Pattern",
            Self::WorkState => "Work State",
            Self::CausalDependency => "Causal Dependency",
            Self::TaskCalibration => "Task Calibration",
            Self::E2eObservation => "E2E Observation",
            Self::DeadEnd => "Dead End",
            Self::WorkUnitOutcome => "Work Unit Outcome",
            Self::WorkflowRecipe => "Workflow Recipe",
            Self::ContextCost => "Context Cost",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for MemoryType {
    fn from(raw: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|t| t.as_str() == raw)
            .cloned()
            .unwrap_or_else(|| Self::Other(raw.to_string()))
    }
}

impl From<String> for MemoryType {
    fn from(raw: String) -> Self {
        match Self::from(raw.as_str()) {
            Self::Other(_) => Self::Other(raw),
            known => known,
        }
    }
}

impl From<MemoryType> for String {
    fn from(t: MemoryType) -> Self {
        match t {
            MemoryType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for MemoryType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How widely a memory applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryScope {
    #[default]
    Global,
    Module,
    WorkUnit,
    Session,
}

/// Who or what recorded a memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    #[default]
    AgentExplicit,
    ObserverInferred,
    QaAuto,
    McpAuto,
    CommitAuto,
    UserTaught,
}

/// A single retrievable fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    /// Unique ID for this memory
    pub id: String,

    /// What kind of fact this is
    #[serde(rename = "type")]
    pub memory_type: MemoryType,

    /// Free text. For `task_calibration` this is a JSON payload by
    /// convention, but it is never guaranteed to parse.
    pub content: String,

    /// Confidence in [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_files: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_modules: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Short attribution rendered under the memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_text: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub last_accessed_at: DateTime<Utc>,

    #[serde(default)]
    pub access_count: u64,

    #[serde(default)]
    pub scope: MemoryScope,

    #[serde(default)]
    pub source: MemorySource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provenance_session_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Superseded memories stay stored but are hidden from searches
    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub pinned: bool,

    #[serde(default)]
    pub user_verified: bool,
}

fn default_confidence() -> f64 {
    1.0
}

impl Memory {
    /// Create a memory with defaults for every bookkeeping field.
    ///
    /// The ID is left empty; stores assign one on insert.
    pub fn new(memory_type: MemoryType, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            memory_type,
            content: content.into(),
            confidence: default_confidence(),
            related_files: Vec::new(),
            related_modules: Vec::new(),
            tags: Vec::new(),
            citation_text: None,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            scope: MemoryScope::default(),
            source: MemorySource::default(),
            session_id: None,
            provenance_session_ids: Vec::new(),
            project_id: None,
            deprecated: false,
            pinned: false,
            user_verified: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citation_text = Some(citation.into());
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Result ordering for [`MemoryStore::search`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Store insertion order
    #[default]
    Insertion,
    /// Most recently created first
    Recency,
    /// Highest confidence first
    Confidence,
    /// Most frequently accessed first
    AccessCount,
}

/// Structured filter for [`MemoryStore::search`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySearchFilter {
    /// Restrict to these types. Empty = all types.
    #[serde(default)]
    pub types: Vec<MemoryType>,

    /// Match memories sharing at least one module. Empty = no filter.
    #[serde(default)]
    pub related_modules: Vec<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub min_confidence: Option<f64>,

    #[serde(default)]
    pub include_deprecated: bool,

    #[serde(default)]
    pub sort: SortOrder,

    /// Maximum number of results
    #[serde(default)]
    pub limit: Option<usize>,
}

impl MemorySearchFilter {
    pub fn with_types(mut self, types: impl IntoIterator<Item = MemoryType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn with_modules(mut self, modules: &[String]) -> Self {
        self.related_modules = modules.to_vec();
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a single memory passes every predicate of this filter.
    pub fn matches(&self, memory: &Memory) -> bool {
        if memory.deprecated && !self.include_deprecated {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&memory.memory_type) {
            return false;
        }
        if !self.related_modules.is_empty()
            && !memory
                .related_modules
                .iter()
                .any(|m| self.related_modules.contains(m))
        {
            return false;
        }
        if let Some(project) = &self.project_id {
            if memory.project_id.as_deref() != Some(project.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if memory.confidence < min {
                return false;
            }
        }
        true
    }

    /// Order and cap an already-filtered result list.
    ///
    /// Sorting is stable, so ties keep their input order.
    pub fn order(&self, mut results: Vec<Memory>) -> Vec<Memory> {
        match self.sort {
            SortOrder::Insertion => {}
            SortOrder::Recency => results.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Confidence => results.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            SortOrder::AccessCount => results.sort_by(|a, b| b.access_count.cmp(&a.access_count)),
        }
        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
        results
    }
}

/// The memory store capability.
///
/// Only [`search`](MemoryStore::search) is used by the calibration engine;
/// the companion operations serve the rest of the agent.
///
/// Implementations: JSONL file, in-memory (for testing), none (no-op).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The store name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Search memories by structured filter.
    async fn search(&self, filter: MemorySearchFilter) -> Result<Vec<Memory>, MemoryError>;

    /// Store a new memory, returning its ID.
    async fn store(&self, memory: Memory) -> Result<String, MemoryError>;

    /// Bump the access counter and last-accessed timestamp.
    async fn update_access_count(&self, id: &str) -> Result<(), MemoryError>;

    /// Hide a memory from future searches without deleting it.
    async fn deprecate_memory(&self, id: &str) -> Result<(), MemoryError>;

    /// Mark a memory as confirmed by the user.
    async fn verify_memory(&self, id: &str) -> Result<(), MemoryError>;

    async fn pin_memory(&self, id: &str, pinned: bool) -> Result<(), MemoryError>;

    /// Delete a memory by ID. Returns whether anything was removed.
    async fn delete_memory(&self, id: &str) -> Result<bool, MemoryError>;

    /// Case-insensitive substring search over content.
    async fn search_by_pattern(&self, pattern: &str) -> Result<Vec<Memory>, MemoryError>;

    /// Record a fact the user taught the agent directly.
    async fn insert_user_taught(
        &self,
        content: &str,
        project_id: &str,
        tags: Vec<String>,
    ) -> Result<String, MemoryError>;

    /// Find workflow recipes relevant to a task description.
    async fn search_workflow_recipe(
        &self,
        task_description: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, MemoryError>;
}
