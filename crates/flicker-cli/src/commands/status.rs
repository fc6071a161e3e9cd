use flicker_core::OscillationEngine;

use super::CommandError;

/// Settle the quality EMA before reporting so a cold engine does not print
/// the seed value.
const WARMUP_COMBINES: usize = 8;

pub fn run(json: bool) -> Result<(), CommandError> {
    let engine = OscillationEngine::new();
    engine.self_test(WARMUP_COMBINES)?;
    let status = engine.entropy_status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("flicker v{} — entropy status", flicker_core::VERSION);
    println!();
    println!(
        "  {:<18} {:<12} {:>9} {:>10}",
        "Source", "Kind", "Available", "Success"
    );
    println!("  {}", "-".repeat(52));
    for s in &status.sources {
        println!(
            "  {:<18} {:<12} {:>9} {:>9.1}%",
            s.name,
            s.kind.to_string(),
            if s.available { "yes" } else { "no" },
            s.success_rate * 100.0
        );
    }
    println!();
    println!("  combines: {}", status.combines);
    println!("  quality score: {:.3}", status.quality_score);
    Ok(())
}
