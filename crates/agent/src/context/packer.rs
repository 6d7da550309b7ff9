//! Phase-aware memory packing — decides which memories reach the prompt.
//!
//! Given memories already ranked by relevance, the packer:
//!
//! 1. Groups them by type, keeping input order inside each group
//! 2. Gives each allocated type `floor(total × fraction)` tokens and packs
//!    the types in allocation order
//! 3. Hands whatever is left to unallocated types, in order of first
//!    appearance
//! 4. Within a type, accepts memories greedily in order, stopping at the
//!    first one that would overflow the type budget and skipping any that
//!    is a near-duplicate of something already accepted (across all types)
//!
//! # Determinism
//!
//! Packing is a pure function of its inputs and the phase table: identical
//! inputs always produce byte-identical output.

use indexmap::IndexMap;
use recallkit_core::memory::{Memory, MemoryType};
use recallkit_core::phase::{ContextPackingConfig, UniversalPhase};
use serde::Serialize;
use tracing::debug;

use crate::context::diversity::{JaccardSimilarity, SimilarityCheck};
use crate::context::token;

/// Heading that opens every non-empty packed block.
pub const CONTEXT_HEADER: &str = "## Relevant Context from Memory";

/// Memories below this confidence are rendered with their confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// At most this many related files are listed next to a memory's label.
const MAX_LISTED_FILES: usize = 2;

// ── Types ─────────────────────────────────────────────────────────────────

/// Packed text plus a breakdown of how the budget was spent.
#[derive(Debug, Clone)]
pub struct PackedContext {
    /// The formatted block, or an empty string when nothing fit.
    pub text: String,
    pub report: PackingReport,
}

/// Detailed metadata about a packing pass.
#[derive(Debug, Clone, Serialize)]
pub struct PackingReport {
    pub phase: UniversalPhase,
    /// Configured token budget.
    pub total_budget: usize,
    /// Tokens consumed by accepted sections (the header is not counted).
    pub total_tokens: usize,
    /// Per-type statistics, in packing order.
    pub per_type: Vec<TypeStats>,
    /// Memories left out, grouped by type and reason.
    pub drops: Vec<DropInfo>,
}

impl PackingReport {
    /// Budget utilization percentage (0.0–100.0).
    pub fn utilization_pct(&self) -> f32 {
        if self.total_budget == 0 {
            return 0.0;
        }
        (self.total_tokens as f32 / self.total_budget as f32) * 100.0
    }

    pub fn items_included(&self) -> usize {
        self.per_type.iter().map(|s| s.items_included).sum()
    }
}

/// Statistics for a single memory type.
#[derive(Debug, Clone, Serialize)]
pub struct TypeStats {
    pub memory_type: MemoryType,
    /// Whether the type has its own allocation (vs. the remainder bucket).
    pub allocated: bool,
    /// Budget this type was packed against.
    pub budget: usize,
    /// Tokens consumed by this type.
    pub tokens: usize,
    pub items_included: usize,
    pub items_total: usize,
}

/// Why memories were left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The memory (or one ranked above it in its type) overflowed the type budget.
    OverBudget,
    /// Too similar to a memory that was already accepted.
    NearDuplicate,
    /// The type was never reached because the overall budget ran out.
    BudgetExhausted,
}

/// Information about memories dropped from one type.
#[derive(Debug, Clone, Serialize)]
pub struct DropInfo {
    pub memory_type: MemoryType,
    pub items_dropped: usize,
    pub reason: DropReason,
}

// ── Packer ────────────────────────────────────────────────────────────────

/// The context packer. Stateless, so one instance can be reused.
pub struct ContextPacker {
    similarity: Box<dyn SimilarityCheck>,
}

/// Accumulated output across all types of one packing pass.
#[derive(Default)]
struct PackState<'a> {
    sections: Vec<String>,
    accepted: Vec<&'a str>,
    used: usize,
    per_type: Vec<TypeStats>,
    drops: Vec<DropInfo>,
}

impl ContextPacker {
    /// Create a packer with the default Jaccard near-duplicate check.
    pub fn new() -> Self {
        Self::with_similarity(Box::new(JaccardSimilarity::default()))
    }

    /// Create a packer with a custom near-duplicate check.
    pub fn with_similarity(similarity: Box<dyn SimilarityCheck>) -> Self {
        Self { similarity }
    }

    /// Pack ranked memories for `phase`, returning the formatted block.
    ///
    /// `config` defaults to the phase's bundled config.
    pub fn pack(
        &self,
        memories: &[Memory],
        phase: UniversalPhase,
        config: Option<&ContextPackingConfig>,
    ) -> String {
        self.pack_with_report(memories, phase, config).text
    }

    /// Like [`pack`](Self::pack), but also reports how the budget was spent.
    pub fn pack_with_report(
        &self,
        memories: &[Memory],
        phase: UniversalPhase,
        config: Option<&ContextPackingConfig>,
    ) -> PackedContext {
        let config = config.unwrap_or_else(|| phase.default_packing());
        let total = config.total_budget;
        let groups = group_by_type(memories);
        let mut state = PackState::default();

        // ── Allocated types, in allocation order ───────────────────────────
        let mut allocation_stopped = false;
        for memory_type in config.allocation.keys() {
            let Some(group) = groups.get(memory_type) else {
                continue;
            };
            if allocation_stopped {
                state.record_drop(memory_type, group.len(), DropReason::BudgetExhausted);
                continue;
            }

            let type_budget = config.type_budget(memory_type).unwrap_or(0);
            let effective = type_budget.min(total.saturating_sub(state.used));
            if effective == 0 {
                allocation_stopped = true;
                state.record_drop(memory_type, group.len(), DropReason::BudgetExhausted);
                continue;
            }

            self.pack_group(memory_type, group, effective, true, &mut state);
            if state.used >= total {
                allocation_stopped = true;
            }
        }

        // ── Remainder bucket: unallocated types, first-appearance order ───
        for (memory_type, group) in &groups {
            if config.allocation.contains_key(memory_type) {
                continue;
            }
            let remaining = total.saturating_sub(state.used);
            if remaining == 0 {
                state.record_drop(memory_type, group.len(), DropReason::BudgetExhausted);
                continue;
            }
            self.pack_group(memory_type, group, remaining, false, &mut state);
        }

        let text = if state.sections.is_empty() {
            String::new()
        } else {
            format!("{}\n\n{}", CONTEXT_HEADER, state.sections.join("\n\n"))
        };

        debug!(
            phase = %phase,
            candidates = memories.len(),
            included = state.sections.len(),
            tokens = state.used,
            budget = total,
            "Packed memory context"
        );

        PackedContext {
            text,
            report: PackingReport {
                phase,
                total_budget: total,
                total_tokens: state.used,
                per_type: state.per_type,
                drops: state.drops,
            },
        }
    }

    /// Greedy, order-preserving packing of one type's memories.
    fn pack_group<'a>(
        &self,
        memory_type: &MemoryType,
        group: &[&'a Memory],
        budget: usize,
        allocated: bool,
        state: &mut PackState<'a>,
    ) {
        let mut used = 0;
        let mut included = 0;
        let mut duplicates = 0;
        let mut over_budget = 0;

        for (idx, &memory) in group.iter().enumerate() {
            let section = format_memory(memory);
            let cost = token::estimate_tokens(&section);
            if used + cost > budget {
                // No backtracking: a smaller memory further down stays out too.
                over_budget = group.len() - idx;
                break;
            }
            if state
                .accepted
                .iter()
                .any(|prev| self.similarity.is_too_similar(prev, &memory.content))
            {
                duplicates += 1;
                continue;
            }
            state.accepted.push(memory.content.as_str());
            state.sections.push(section);
            used += cost;
            included += 1;
        }

        state.used += used;
        state.per_type.push(TypeStats {
            memory_type: memory_type.clone(),
            allocated,
            budget,
            tokens: used,
            items_included: included,
            items_total: group.len(),
        });
        state.record_drop(memory_type, duplicates, DropReason::NearDuplicate);
        state.record_drop(memory_type, over_budget, DropReason::OverBudget);
    }
}

impl Default for ContextPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl PackState<'_> {
    fn record_drop(&mut self, memory_type: &MemoryType, count: usize, reason: DropReason) {
        if count > 0 {
            self.drops.push(DropInfo {
                memory_type: memory_type.clone(),
                items_dropped: count,
                reason,
            });
        }
    }
}

/// Pack with the default near-duplicate check.
pub fn pack(
    memories: &[Memory],
    phase: UniversalPhase,
    config: Option<&ContextPackingConfig>,
) -> String {
    ContextPacker::new().pack(memories, phase, config)
}

/// Group memories by type. Groups are keyed in order of first appearance
/// and keep the input order inside each group.
fn group_by_type(memories: &[Memory]) -> IndexMap<MemoryType, Vec<&Memory>> {
    let mut groups: IndexMap<MemoryType, Vec<&Memory>> = IndexMap::new();
    for memory in memories {
        groups
            .entry(memory.memory_type.clone())
            .or_default()
            .push(memory);
    }
    groups
}

/// Render one memory as a prompt section.
///
/// ```text
/// **<Label>** (<file1>, <file2>) [confidence: NN%]
/// <content>
/// [^ Memory: <citation>]
/// ```
///
/// The file list, confidence and citation only appear when they apply.
pub fn format_memory(memory: &Memory) -> String {
    let mut header = format!("**{}**", memory.memory_type.label());

    let files: Vec<&str> = memory
        .related_files
        .iter()
        .take(MAX_LISTED_FILES)
        .map(String::as_str)
        .collect();
    if !files.is_empty() {
        header.push_str(&format!(" ({})", files.join(", ")));
    }

    if memory.confidence < LOW_CONFIDENCE_THRESHOLD {
        let pct = (memory.confidence * 100.0).round() as i64;
        header.push_str(&format!(" [confidence: {pct}%]"));
    }

    let citation = memory
        .citation_text
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|c| format!("[^ Memory: {c}]"));

    [Some(header), Some(memory.content.clone()), citation]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::diversity::jaccard;

    // ── Helpers ────────────────────────────────────────────────────────

    fn memory(memory_type: MemoryType, content: &str) -> Memory {
        Memory::new(memory_type, content)
    }

    /// Content whose words share nothing with any other seed.
    fn unique_content(seed: usize, words: usize) -> String {
        (0..words)
            .map(|j| format!("s{seed}w{j}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn sections(text: &str) -> Vec<&str> {
        text.strip_prefix(CONTEXT_HEADER)
            .map(|body| body.trim_start_matches('\n').split("\n\n").collect())
            .unwrap_or_default()
    }

    // ── Formatting ─────────────────────────────────────────────────────

    #[test]
    fn format_includes_files_confidence_and_citation() {
        let m = memory(MemoryType::Gotcha, "Run migrations first")
            .with_files(["db/schema.rs", "db/migrate.rs", "db/seed.rs"])
            .with_confidence(0.5)
            .with_citation("session 42");
        assert_eq!(
            format_memory(&m),
            "**Gotcha** (db/schema.rs, db/migrate.rs) [confidence: 50%]\nRun migrations first\n[^ Memory: session 42]"
        );
    }

    #[test]
    fn format_omits_empty_parts() {
        let m = memory(MemoryType::ErrorPattern, "ECONNRESET on CI");
        assert_eq!(format_memory(&m), "**Error Pattern**\nECONNRESET on CI");
    }

    #[test]
    fn confidence_shown_only_below_threshold() {
        let at = memory(MemoryType::Decision, "x").with_confidence(0.7);
        assert!(!format_memory(&at).contains("confidence"));

        let below = memory(MemoryType::Decision, "x").with_confidence(0.666);
        assert!(format_memory(&below).contains("[confidence: 67%]"));
    }

    #[test]
    fn empty_citation_is_omitted() {
        let m = memory(MemoryType::Pattern, "Builder pattern for configs").with_citation("");
        assert!(!format_memory(&m).contains("[^ Memory"));
    }

    #[test]
    fn unknown_type_uses_raw_label() {
        let m = memory(MemoryType::Other("team_ritual".into()), "Standup at 10");
        assert!(format_memory(&m).starts_with("**team_ritual**\n"));
    }

    // ── Packing ────────────────────────────────────────────────────────

    #[test]
    fn empty_input_packs_to_empty_string() {
        for phase in UniversalPhase::ALL {
            assert_eq!(pack(&[], phase, None), "");
        }
        let cfg = ContextPackingConfig::new(0);
        assert_eq!(pack(&[], UniversalPhase::Define, Some(&cfg)), "");
    }

    #[test]
    fn single_memory_renders_header_and_section() {
        let memories = vec![memory(MemoryType::Gotcha, "Tests need DATABASE_URL set")];
        let text = pack(&memories, UniversalPhase::Implement, None);
        assert_eq!(
            text,
            "## Relevant Context from Memory\n\n**Gotcha**\nTests need DATABASE_URL set"
        );
    }

    #[test]
    fn allocated_types_follow_allocation_order() {
        let memories = vec![
            memory(MemoryType::Pattern, "Prefer builder structs for options"),
            memory(MemoryType::Gotcha, "Windows paths break the glob walker"),
        ];
        let text = pack(&memories, UniversalPhase::Implement, None);
        let out = sections(&text);
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("**Gotcha**"));
        assert!(out[1].starts_with("**Pattern**"));
    }

    #[test]
    fn unallocated_types_follow_first_appearance() {
        let memories = vec![
            memory(MemoryType::Decision, "Chose sqlite over postgres for local mode"),
            memory(MemoryType::Preference, "User prefers terse commit messages"),
            memory(MemoryType::Gotcha, "Cargo workspaces share one target dir"),
            memory(MemoryType::Decision, "Feature flags live in config not env"),
        ];
        let text = pack(&memories, UniversalPhase::Implement, None);
        let labels: Vec<&str> = sections(&text)
            .iter()
            .map(|s| s.lines().next().unwrap_or_default())
            .collect();
        assert_eq!(
            labels,
            vec!["**Gotcha**", "**Decision**", "**Decision**", "**Preference**"]
        );
    }

    #[test]
    fn greedy_stops_at_first_overflow_without_backtracking() {
        // "**Gotcha**\n" is 11 chars; 109 + 11 = 120 chars = 30 tokens each.
        let cfg = ContextPackingConfig::new(100).allocate(MemoryType::Gotcha, 0.5);
        let memories = vec![
            memory(MemoryType::Gotcha, &"a".repeat(109)),
            memory(MemoryType::Gotcha, &"b".repeat(109)),
            memory(MemoryType::Gotcha, "ccc"),
        ];
        let packed = ContextPacker::new().pack_with_report(
            &memories,
            UniversalPhase::Implement,
            Some(&cfg),
        );

        assert!(packed.text.contains(&"a".repeat(109)));
        assert!(!packed.text.contains(&"b".repeat(109)));
        assert!(!packed.text.contains("ccc"));

        let gotcha = &packed.report.per_type[0];
        assert_eq!(gotcha.budget, 50);
        assert_eq!(gotcha.tokens, 30);
        assert_eq!(gotcha.items_included, 1);
        assert!(packed.report.drops.iter().any(|d| {
            d.memory_type == MemoryType::Gotcha
                && d.reason == DropReason::OverBudget
                && d.items_dropped == 2
        }));
    }

    #[test]
    fn duplicates_are_skipped_and_scanning_continues() {
        let memories = vec![
            memory(MemoryType::Gotcha, "Always run database migrations before seeding fixtures"),
            memory(MemoryType::Gotcha, "always run database migrations before seeding fixtures!"),
            memory(MemoryType::Gotcha, "Integration tests require docker compose up"),
        ];
        let packed = ContextPacker::new().pack_with_report(
            &memories,
            UniversalPhase::Implement,
            None,
        );
        assert_eq!(sections(&packed.text).len(), 2);
        assert!(packed.text.contains("docker compose"));
        assert!(packed.report.drops.iter().any(|d| {
            d.reason == DropReason::NearDuplicate && d.items_dropped == 1
        }));
    }

    #[test]
    fn duplicate_check_spans_types() {
        let content = "Retry the flaky network test with exponential backoff enabled";
        let memories = vec![
            memory(MemoryType::Pattern, content),
            memory(MemoryType::Gotcha, content),
        ];
        let text = pack(&memories, UniversalPhase::Implement, None);
        let out = sections(&text);
        // Gotcha is packed first, so the pattern copy is the one dropped.
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("**Gotcha**"));
    }

    #[test]
    fn zero_budget_packs_nothing() {
        let cfg = ContextPackingConfig::new(0).allocate(MemoryType::Gotcha, 0.5);
        let memories = vec![
            memory(MemoryType::Gotcha, "something"),
            memory(MemoryType::Decision, "something else"),
        ];
        assert_eq!(pack(&memories, UniversalPhase::Implement, Some(&cfg)), "");
    }

    #[test]
    fn empty_allocation_uses_remainder_for_everything() {
        let cfg = ContextPackingConfig::new(1000);
        let memories = vec![
            memory(MemoryType::Decision, "Use axum for the HTTP layer"),
            memory(MemoryType::Gotcha, "The CI image lacks protoc"),
        ];
        let packed = ContextPacker::new().pack_with_report(
            &memories,
            UniversalPhase::Explore,
            Some(&cfg),
        );
        let out = sections(&packed.text);
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("**Decision**"));
        assert!(packed.report.per_type.iter().all(|s| !s.allocated));
    }

    #[test]
    fn zero_type_budget_stops_allocated_types_but_not_remainder() {
        // floor(100 × 0.001) = 0 ends the allocated pass before `pattern`.
        let cfg = ContextPackingConfig::new(100)
            .allocate(MemoryType::Gotcha, 0.001)
            .allocate(MemoryType::Pattern, 0.5);
        let memories = vec![
            memory(MemoryType::Gotcha, "gotcha text here"),
            memory(MemoryType::Pattern, "pattern text here"),
            memory(MemoryType::Decision, "decision text here"),
        ];
        let packed = ContextPacker::new().pack_with_report(
            &memories,
            UniversalPhase::Implement,
            Some(&cfg),
        );
        assert!(!packed.text.contains("gotcha text"));
        assert!(!packed.text.contains("pattern text"));
        assert!(packed.text.contains("decision text"));
        assert_eq!(
            packed
                .report
                .drops
                .iter()
                .filter(|d| d.reason == DropReason::BudgetExhausted)
                .count(),
            2
        );
    }

    #[test]
    fn remainder_stops_once_budget_is_spent() {
        // 11 + 29 = 40 chars = 10 tokens: the whole budget.
        let cfg = ContextPackingConfig::new(10).allocate(MemoryType::Gotcha, 1.0);
        let memories = vec![
            memory(MemoryType::Gotcha, &"g".repeat(29)),
            memory(MemoryType::Decision, "d"),
        ];
        let packed = ContextPacker::new().pack_with_report(
            &memories,
            UniversalPhase::Implement,
            Some(&cfg),
        );
        assert_eq!(packed.report.total_tokens, 10);
        assert!(!packed.text.contains("**Decision**"));
        assert!(packed.report.drops.iter().any(|d| {
            d.memory_type == MemoryType::Decision && d.reason == DropReason::BudgetExhausted
        }));
    }

    #[test]
    fn budgets_hold_for_large_inputs() {
        let types = [
            MemoryType::Gotcha,
            MemoryType::ErrorPattern,
            MemoryType::CausalDependency,
            MemoryType::Pattern,
            MemoryType::DeadEnd,
            MemoryType::Decision,
            MemoryType::ModuleInsight,
        ];
        let memories: Vec<Memory> = (0..140)
            .map(|i| memory(types[i % types.len()].clone(), &unique_content(i, 40)))
            .collect();

        let cfg = UniversalPhase::Implement.default_packing();
        let packed = ContextPacker::new().pack_with_report(
            &memories,
            UniversalPhase::Implement,
            None,
        );

        assert!(packed.report.total_tokens <= cfg.total_budget);
        for stats in &packed.report.per_type {
            assert!(stats.tokens <= stats.budget, "{:?} over budget", stats.memory_type);
            if let Some(type_budget) = cfg.type_budget(&stats.memory_type) {
                assert!(stats.tokens <= type_budget);
            }
        }

        let section_tokens: usize = sections(&packed.text)
            .iter()
            .map(|s| token::estimate_tokens(s))
            .sum();
        assert_eq!(section_tokens, packed.report.total_tokens);
        assert!(packed.report.utilization_pct() <= 100.0);
    }

    #[test]
    fn accepted_sections_are_pairwise_diverse() {
        let base = "configure the retry policy for outbound webhook delivery workers";
        let memories = vec![
            memory(MemoryType::Gotcha, base),
            memory(MemoryType::Gotcha, &format!("{base} now")),
            memory(MemoryType::Gotcha, "webhook workers need the retry policy"),
            memory(MemoryType::ErrorPattern, &format!("{base}.")),
            memory(MemoryType::ErrorPattern, "timeouts surface as 504 from the gateway"),
        ];
        let packed = ContextPacker::new().pack_with_report(
            &memories,
            UniversalPhase::Implement,
            None,
        );

        let included: Vec<&Memory> = memories
            .iter()
            .filter(|m| packed.text.contains(&format!("\n{}", m.content)))
            .collect();
        for (i, a) in included.iter().enumerate() {
            for b in &included[i + 1..] {
                assert!(jaccard(&a.content, &b.content) <= 0.85);
            }
        }
        assert_eq!(packed.report.items_included(), 3);
    }

    #[test]
    fn packing_is_idempotent() {
        let memories: Vec<Memory> = (0..30)
            .map(|i| {
                let t = if i % 2 == 0 { MemoryType::Gotcha } else { MemoryType::Requirement };
                memory(t, &unique_content(i, 25)).with_confidence(0.4 + (i as f64) / 100.0)
            })
            .collect();
        let first = pack(&memories, UniversalPhase::Validate, None);
        let second = pack(&memories, UniversalPhase::Validate, None);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn missing_config_means_phase_default() {
        let memories: Vec<Memory> = (0..10)
            .map(|i| memory(MemoryType::ModuleInsight, &unique_content(i, 30)))
            .collect();
        let default_cfg = UniversalPhase::Explore.default_packing();
        assert_eq!(
            pack(&memories, UniversalPhase::Explore, None),
            pack(&memories, UniversalPhase::Explore, Some(default_cfg))
        );
    }

    #[test]
    fn custom_similarity_check_is_honored() {
        struct EverythingSimilar;
        impl SimilarityCheck for EverythingSimilar {
            fn is_too_similar(&self, _a: &str, _b: &str) -> bool {
                true
            }
        }

        let memories = vec![
            memory(MemoryType::Gotcha, "first"),
            memory(MemoryType::Gotcha, "second"),
            memory(MemoryType::Pattern, "third"),
        ];
        let packer = ContextPacker::with_similarity(Box::new(EverythingSimilar));
        let text = packer.pack(&memories, UniversalPhase::Implement, None);
        assert_eq!(sections(&text), vec!["**Gotcha**\nfirst"]);
    }
}
