//! List timeframes command.

use anyhow::Result;
use barstream_core::types::Timeframe;

pub fn run() -> Result<()> {
    println!("Supported Timeframes");
    println!("═══════════════════════════════════════════════════════════");
    println!("  {:<8} {:>14}", "label", "duration (s)");
    for timeframe in Timeframe::all() {
        println!("  {:<8} {:>14}", timeframe.label(), timeframe.as_secs());
    }
    println!();
    println!("A timeframe can be aggregated into any longer one it divides evenly.");
    Ok(())
}
