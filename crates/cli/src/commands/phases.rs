//! `recallkit phases` — Show the packing table.

use recallkit_core::phase::UniversalPhase;

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    for phase in UniversalPhase::ALL {
        let packing = config.packing_for(phase);
        let source = if packing == *phase.default_packing() {
            "default"
        } else {
            "configured"
        };
        println!("{phase}: {} tokens ({source})", packing.total_budget);
        for (memory_type, fraction) in &packing.allocation {
            println!(
                "  {:<20} {:>4.0}%  {:>5} tokens",
                memory_type.as_str(),
                fraction * 100.0,
                packing.type_budget(memory_type).unwrap_or(0)
            );
        }
        println!();
    }

    Ok(())
}
