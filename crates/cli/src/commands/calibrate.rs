//! `recallkit calibrate` — Show the calibration factor and step budget.

use recallkit_agent::{CalibrationEngine, StopConditionBuilder};

use super::{load_config, open_configured_store};

pub async fn run(
    modules: Vec<String>,
    project: Option<String>,
    base_steps: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let project = project
        .or_else(|| config.project_id.clone())
        .ok_or("No project given (use --project, RECALLKIT_PROJECT or project_id in config)")?;
    let base_steps = base_steps.unwrap_or(config.calibration.default_base_steps);

    let store = open_configured_store(&config);
    let factor = CalibrationEngine::from(&config.calibration)
        .factor(store.as_ref(), &modules, &project)
        .await;
    let condition = StopConditionBuilder::from(&config.calibration).build(base_steps, factor);

    println!("📐 Calibration");
    println!("==============");
    println!("  Project:     {project}");
    println!("  Modules:     {}", modules.join(", "));
    match factor {
        Some(f) => println!("  Factor:      {f:.3}"),
        None => println!("  Factor:      (no calibration history)"),
    }
    println!("  Multiplier:  {:.3}", condition.multiplier());
    println!("  Base steps:  {}", condition.base_steps());
    println!("  Max steps:   {}", condition.max_steps());

    Ok(())
}
