use flicker_core::OscillationEngine;

use super::CommandError;

pub fn run(samples: usize, output_path: Option<&str>) -> Result<(), CommandError> {
    let engine = OscillationEngine::new();
    println!("flicker v{} — pipeline self-test", flicker_core::VERSION);
    println!("drawing {samples} samples through sources → combiner → noise → oscillator...\n");

    let report = engine.self_test(samples)?;

    println!(
        "  {:>4} {:>20} {:>10} {:>10} {:>10}",
        "#", "raw", "normalized", "pink", "oscillator"
    );
    println!("  {}", "-".repeat(60));
    for s in &report.samples {
        println!(
            "  {:>4} {:>20} {:>10.6} {:>10.4} {:>10.4}",
            s.sample, s.raw, s.normalized, s.pink_noise, s.oscillator
        );
    }

    let q = &report.quality;
    println!();
    println!("  quality score:      {:.3}", q.quality_score);
    println!("  shannon entropy:    {:.3} bits/byte", q.shannon_entropy);
    println!("  compression ratio:  {:.3}", q.compression_ratio);
    println!();
    println!("  per-source success:");
    for s in &q.sources.sources {
        println!("    {:<18} {:>5.1}%", s.name, s.success_rate * 100.0);
    }

    if let Some(path) = output_path {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("\nfull report written to {path}");
    }
    Ok(())
}
