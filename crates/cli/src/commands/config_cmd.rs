//! `recallkit config` — Configuration management commands.

use recallkit_agent::HydeConfig;
use recallkit_config::AppConfig;

use super::load_config;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if config.project_id.is_none() {
                warnings.push("No project_id set (calibrate will need --project)");
            }

            if config.memory.backend == "none" {
                warnings.push("Memory backend is 'none'; packing from the store will be empty");
            }

            if config.hyde.enabled && config.hyde.min_results == 0 {
                warnings.push("hyde.min_results = 0 means queries are never augmented");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Memory:      {}", config.memory.backend);
            println!("   Overrides:   {} phase(s)", config.packing.len());
            println!(
                "   Calibration: ×{:.1} max, {} step ceiling",
                config.calibration.max_multiplier, config.calibration.max_steps_ceiling
            );
            if config.hyde.enabled {
                let hyde = HydeConfig::from(&config.hyde);
                println!(
                    "   HyDE:        enabled (<{} results, {} dims, {} output tokens)",
                    hyde.min_results, hyde.dimensions, hyde.max_output_tokens
                );
            } else {
                println!("   HyDE:        disabled");
            }
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}
