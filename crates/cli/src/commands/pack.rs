//! `recallkit pack` — Render a phase-budgeted memory context block.

use recallkit_agent::ContextPacker;
use recallkit_core::memory::{Memory, MemorySearchFilter, SortOrder};
use recallkit_core::phase::UniversalPhase;
use std::path::PathBuf;

use super::{load_config, open_configured_store};

pub async fn run(
    phase: &str,
    input: Option<PathBuf>,
    project: Option<String>,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let phase: UniversalPhase = phase.parse()?;

    let memories: Vec<Memory> = match input {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Reading memories from file");
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
            serde_json::from_str(&content)
                .map_err(|e| format!("Failed to parse {}: {e}", path.display()))?
        }
        None => {
            let store = open_configured_store(&config);
            tracing::debug!(store = store.name(), "Reading memories from store");
            let project = project.or_else(|| config.project_id.clone());
            store.search(store_filter(project)).await?
        }
    };

    let packing = config.packing_for(phase);
    let packed = ContextPacker::new().pack_with_report(&memories, phase, Some(&packing));

    if packed.text.is_empty() {
        eprintln!("No memories fit the {phase} budget ({} candidates).", memories.len());
    } else {
        println!("{}", packed.text);
    }

    if report {
        let r = &packed.report;
        println!();
        println!("📦 Packing report ({phase})");
        println!("====================");
        println!(
            "  Tokens:     {}/{} ({:.1}%)",
            r.total_tokens,
            r.total_budget,
            r.utilization_pct()
        );
        println!("  Included:   {}/{}", r.items_included(), memories.len());
        for stats in &r.per_type {
            let bucket = if stats.allocated { "" } else { " (remainder)" };
            println!(
                "  {:<20} {:>5}/{:<5} tokens  {}/{} items{bucket}",
                stats.memory_type.as_str(),
                stats.tokens,
                stats.budget,
                stats.items_included,
                stats.items_total,
            );
        }
        for drop in &r.drops {
            println!(
                "  dropped {} × {} ({:?})",
                drop.items_dropped,
                drop.memory_type.as_str(),
                drop.reason
            );
        }
    }

    Ok(())
}

/// Store reads come back highest-confidence first, since the packer keeps
/// the earliest memories of each type when a budget runs out.
fn store_filter(project_id: Option<String>) -> MemorySearchFilter {
    let mut filter = MemorySearchFilter::default().with_sort(SortOrder::Confidence);
    filter.project_id = project_id;
    filter
}
