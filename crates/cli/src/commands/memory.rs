//! `recallkit memory` — Memory store inspection commands.

use indexmap::IndexMap;
use recallkit_core::memory::{MemorySearchFilter, MemoryType, SortOrder};

use super::{load_config, open_configured_store};

pub async fn stats() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_configured_store(&config);

    let all = store
        .search(MemorySearchFilter {
            include_deprecated: true,
            ..MemorySearchFilter::default()
        })
        .await?;

    println!("🧠 Memory Statistics");
    println!("====================");
    println!("  Backend:    {}", store.name());
    if let Some(path) = &config.memory.path {
        println!("  Path:       {}", path.display());
    }
    println!("  Total:      {}", all.len());
    println!(
        "  Deprecated: {}",
        all.iter().filter(|m| m.deprecated).count()
    );
    println!("  Pinned:     {}", all.iter().filter(|m| m.pinned).count());

    let mut by_type: IndexMap<&str, usize> = IndexMap::new();
    for memory in &all {
        *by_type.entry(memory.memory_type.as_str()).or_default() += 1;
    }
    by_type.sort_by(|_, a, _, b| b.cmp(a));
    if !by_type.is_empty() {
        println!();
        for (memory_type, count) in &by_type {
            println!("  {memory_type:<20} {count}");
        }
    }

    Ok(())
}

pub async fn list(
    memory_type: Option<String>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_configured_store(&config);

    let mut filter = MemorySearchFilter::default()
        .with_sort(SortOrder::Recency)
        .with_limit(Some(limit));
    if let Some(t) = memory_type {
        filter = filter.with_types([MemoryType::from(t)]);
    }

    let results = store.search(filter).await?;
    if results.is_empty() {
        println!("   No memories found.");
        return Ok(());
    }

    for (i, memory) in results.iter().enumerate() {
        let preview: String = memory.content.chars().take(80).collect();
        println!(
            "  {i:>2}. [{}] [conf: {:.2}] {preview}",
            memory.memory_type.as_str(),
            memory.confidence
        );
        if !memory.related_modules.is_empty() {
            println!("      modules: {}", memory.related_modules.join(", "));
        }
    }

    Ok(())
}
