//! Descriptive and spectral statistics over an oscillation-buffer snapshot.
//!
//! Everything here is derived on demand from a read-only snapshot; nothing is
//! stored. The confidence tier communicates how much history backs the
//! numbers rather than refusing to compute them.

use flate2::Compression;
use flate2::write::ZlibEncoder;
use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Operating threshold above which a signal is considered stable.
pub const STABILITY_THRESHOLD: f64 = 0.7;

/// Target spectral slope for ideal 1/f noise.
const PINK_TARGET_SLOPE: f64 = -1.0;

/// How much history backs a metrics report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// Fewer than 3 samples.
    Insufficient,
    /// 3–4 samples.
    Basic,
    /// 5–9 samples.
    Intermediate,
    /// 10 or more samples.
    Full,
}

impl ConfidenceTier {
    /// Classify a sample count.
    pub fn from_count(count: usize) -> Self {
        match count {
            0..=2 => Self::Insufficient,
            3..=4 => Self::Basic,
            5..=9 => Self::Intermediate,
            _ => Self::Full,
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insufficient => write!(f, "insufficient"),
            Self::Basic => write!(f, "basic"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Metrics over one buffer snapshot. Always derived, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub mean: f64,
    pub std: f64,
    pub variance: f64,
    /// Zero-crossing frequency estimate, in cycles per sample.
    pub dominant_frequency: f64,
    /// 1.0 when the estimated spectral slope matches the −1.0 pink target.
    pub pink_noise_quality: f64,
    /// Latest combiner quality score, exposed for observability.
    pub entropy_contribution: f64,
    /// Inverse normalized variance, clipped to [0,1]. Above 0.7 is "stable".
    pub stability_index: f64,
    /// Standard deviation of first differences.
    pub volatility: f64,
    /// Least-squares slope over the sample index.
    pub trend: f64,
    pub sample_count: usize,
    pub confidence_tier: ConfidenceTier,
    /// Present when the tier means results should be read cautiously.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Compute a full report over a snapshot. `entropy_contribution` is the
/// combiner's latest quality score, passed through untouched.
pub fn compute_metrics(snapshot: &[f64], entropy_contribution: f64) -> MetricsReport {
    let n = snapshot.len();
    let tier = ConfidenceTier::from_count(n);

    if n == 0 {
        return MetricsReport {
            mean: 0.0,
            std: 0.0,
            variance: 0.0,
            dominant_frequency: 0.0,
            pink_noise_quality: 0.0,
            entropy_contribution,
            stability_index: 1.0,
            volatility: 0.0,
            trend: 0.0,
            sample_count: 0,
            confidence_tier: tier,
            warning: Some("no samples".to_string()),
        };
    }

    let mean = snapshot.iter().sum::<f64>() / n as f64;
    let variance = snapshot.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    let std = variance.sqrt();
    let stability_index = (1.0 / (1.0 + variance * 10.0)).clamp(0.0, 1.0);

    let warning = match tier {
        ConfidenceTier::Basic | ConfidenceTier::Intermediate => Some(format!(
            "limited data ({n} samples), results may be less accurate"
        )),
        ConfidenceTier::Insufficient => Some("insufficient data".to_string()),
        ConfidenceTier::Full => None,
    };

    MetricsReport {
        mean,
        std,
        variance,
        dominant_frequency: zero_crossing_frequency(snapshot, mean),
        pink_noise_quality: pink_noise_quality(snapshot, mean),
        entropy_contribution,
        stability_index,
        volatility: volatility(snapshot),
        trend: trend_slope(snapshot),
        sample_count: n,
        confidence_tier: tier,
        warning,
    }
}

/// Dominant-frequency estimate from the zero-crossing rate of the
/// mean-centered signal, in cycles per sample. A pure sinusoid of frequency f
/// crosses its mean 2f times per sample, so crossings / (2·(n−1)) converges
/// to f.
fn zero_crossing_frequency(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut crossings = 0usize;
    for pair in values.windows(2) {
        let a = pair[0] - mean;
        let b = pair[1] - mean;
        if (a <= 0.0 && b > 0.0) || (a >= 0.0 && b < 0.0) {
            crossings += 1;
        }
    }
    crossings as f64 / (2.0 * (values.len() - 1) as f64)
}

/// Compare the snapshot's periodogram slope against the −1.0 pink target.
/// Returns `max(0, 1 − |slope − target|)`; 0.0 below 8 samples.
fn pink_noise_quality(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 8 {
        return 0.0;
    }
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let mut spectrum: Vec<Complex<f64>> = values
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .collect();
    fft.process(&mut spectrum);

    // Positive frequencies only, log-log regression of power on frequency.
    let mut log_f = Vec::with_capacity(n / 2);
    let mut log_p = Vec::with_capacity(n / 2);
    for (k, bin) in spectrum.iter().enumerate().take(n / 2).skip(1) {
        let power = bin.norm_sqr();
        let freq = k as f64 / n as f64;
        let lf = (freq + 1e-10).log10();
        let lp = (power + 1e-10).log10();
        if lf.is_finite() && lp.is_finite() {
            log_f.push(lf);
            log_p.push(lp);
        }
    }
    if log_f.len() < 3 {
        return 0.0;
    }
    let slope = least_squares_slope(&log_f, &log_p);
    (1.0 - (slope - PINK_TARGET_SLOPE).abs()).max(0.0)
}

/// Standard deviation of consecutive differences.
fn volatility(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let diffs: Vec<f64> = values.windows(2).map(|p| p[1] - p[0]).collect();
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    (diffs.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / diffs.len() as f64).sqrt()
}

/// Least-squares slope of values over their index.
fn trend_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    least_squares_slope(&xs, values)
}

fn least_squares_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }
    if den == 0.0 { 0.0 } else { num / den }
}

// ---------------------------------------------------------------------------
// Byte-stream diagnostics (self-test quality section)
// ---------------------------------------------------------------------------

/// Shannon entropy of a byte stream in bits/byte (max 8.0).
pub fn quick_shannon(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let n = data.len() as f64;
    let mut h = 0.0;
    for &c in &counts {
        if c > 0 {
            let p = c as f64 / n;
            h -= p * p.log2();
        }
    }
    h
}

/// zlib level-9 compression ratio. Near 1.0 means structureless data.
pub fn compression_ratio(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::best());
    if enc.write_all(data).is_err() {
        return 0.0;
    }
    match enc.finish() {
        Ok(c) => c.len() as f64 / data.len() as f64,
        Err(_) => 0.0,
    }
}
