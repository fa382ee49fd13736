//! List strategies command.

use anyhow::Result;
use trading_strategies::StrategyRegistry;

pub async fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        println!("  {} ({})", info.name, info.key);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  Defaults: {}", info.default_config);
        let columns: Vec<&str> = info.indicators.iter().map(|c| c.name.as_str()).collect();
        println!("  Indicators: {}", columns.join(", "));
        println!();
    }

    println!("Use --strategy <key> to select a strategy and --params '<json>' to tune it.");

    Ok(())
}
