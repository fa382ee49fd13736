//! List indicators command.

use anyhow::Result;
use trading_indicators::IndicatorKind;

pub async fn run() -> Result<()> {
    println!("Available Indicators");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for kind in IndicatorKind::ALL {
        println!("  {:<12} {}", kind.as_str(), kind.description());
    }

    println!();
    println!("Configure with [[indicators]] entries: name = \"<indicator>\" plus its parameters.");

    Ok(())
}
