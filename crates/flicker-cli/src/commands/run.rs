use flicker_core::{
    ChaoticParams, ContextConfig, OscillationEngine, PersistedContext,
};

use super::CommandError;

pub struct RunOptions {
    pub ticks: usize,
    pub damping: f64,
    pub frequency: f64,
    pub target: f64,
    pub intensity: f64,
    pub chaotic: bool,
    pub resume_path: Option<String>,
    pub save_path: Option<String>,
    pub metrics: bool,
    pub json: bool,
}

/// Width of the ASCII trace column.
const TRACE_WIDTH: usize = 61;

pub fn run(opts: RunOptions) -> Result<(), CommandError> {
    let engine = OscillationEngine::new();

    let id = if let Some(path) = &opts.resume_path {
        let raw = std::fs::read_to_string(path)?;
        let persisted: PersistedContext = serde_json::from_str(&raw)?;
        let id = engine.import_context(persisted)?;
        if !opts.json {
            println!("resumed context {id} from {path}\n");
        }
        id
    } else {
        let mut config = ContextConfig::default();
        config.oscillator.damping_coefficient = opts.damping;
        config.oscillator.natural_frequency = opts.frequency;
        config.oscillator.target_value = opts.target;
        config.noise.intensity = opts.intensity;
        if opts.chaotic {
            config.oscillator.chaotic = Some(ChaoticParams {
                lyapunov_exponent: 3.7,
                attractor_strength: 0.5,
            });
        }
        engine.create_context(None, config)?
    };

    for _ in 0..opts.ticks {
        let out = engine.tick(&id)?;
        if opts.json {
            println!("{}", serde_json::to_string(&out)?);
        } else {
            println!("{:>5}  {:>8.4}  {}", out.tick, out.value, trace_bar(out.value));
        }
    }

    if opts.metrics {
        let report = engine.metrics(&id)?;
        if opts.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!();
            println!("  samples:            {}", report.sample_count);
            println!("  confidence:         {}", report.confidence_tier);
            println!("  mean / std:         {:.4} / {:.4}", report.mean, report.std);
            println!("  dominant frequency: {:.4} cycles/tick", report.dominant_frequency);
            println!("  pink-noise quality: {:.3}", report.pink_noise_quality);
            println!("  stability index:    {:.3}", report.stability_index);
            println!("  volatility:         {:.4}", report.volatility);
            println!("  trend:              {:+.5}", report.trend);
            println!("  entropy quality:    {:.3}", report.entropy_contribution);
            if let Some(warning) = &report.warning {
                println!("  warning:            {warning}");
            }
        }
    }

    if let Some(path) = &opts.save_path {
        let persisted = engine.export_context(&id)?;
        std::fs::write(path, serde_json::to_string_pretty(&persisted)?)?;
        if !opts.json {
            println!("\ncontext saved to {path}");
        }
    }
    Ok(())
}

/// One-line ASCII rendering of a value in [-1, 1].
fn trace_bar(value: f64) -> String {
    let mut bar = vec![' '; TRACE_WIDTH];
    bar[TRACE_WIDTH / 2] = '|';
    let pos = ((value.clamp(-1.0, 1.0) + 1.0) / 2.0 * (TRACE_WIDTH - 1) as f64) as usize;
    bar[pos] = '*';
    bar.into_iter().collect()
}
