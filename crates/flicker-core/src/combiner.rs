//! Multi-source entropy combiner with quality scoring.
//!
//! One `combine()` call draws a fresh raw sample from every registered source,
//! XOR-folds the survivors into a single `u64`, and SHA-256 conditions that
//! integer to destroy source-specific bias before mapping it onto `[0,1)`.
//! Raw samples are never cached or reused across calls.
//!
//! Degradation policy: any subset of sources may fail — down to a single
//! survivor — without surfacing an error. The failure shows up only in the
//! quality score, an EMA of the per-call success fraction. If *zero* sources
//! succeed, the clock is read directly as a last resort; only when even that
//! fails does the call return [`EngineError::AllSourcesFailed`]. Output that
//! rests on the clock alone is capped at a low quality ceiling so callers can
//! see the degraded trust.

use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::error::EngineError;
use crate::source::{EntropySource, SourceKind, SourceStats};
use crate::sources::{self, ClockSource};

/// EMA smoothing factor for the quality score.
const QUALITY_EMA_ALPHA: f64 = 0.2;

/// Quality ceiling when only the clock contributed.
const CLOCK_ONLY_QUALITY_CAP: f64 = 0.3;

/// Per-source latency budget. A draw slower than this counts as a failure —
/// a hung source must not stall the tick.
const DEFAULT_SAMPLE_BUDGET: Duration = Duration::from_millis(50);

/// One normalized random value with its provenance. Created per request,
/// immutable, consumed immediately by the noise generator.
#[derive(Debug, Clone)]
pub struct CombinedEntropy {
    /// XOR fold of all successful raw samples, pre-conditioning.
    pub raw: u64,
    /// First 8 bytes of the SHA-256 digest, little-endian.
    pub digest64: u64,
    /// `digest64` mapped onto `[0,1)`.
    pub normalized: f64,
    /// Sources that contributed to this value.
    pub contributing: Vec<SourceKind>,
    /// Smoothed success fraction in `[0,1]`.
    pub quality_score: f64,
}

struct SourceSlot {
    source: Box<dyn EntropySource>,
    stats: SourceStats,
    enabled: bool,
}

/// Per-source status row exposed by [`EntropyCombiner::status`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceStatus {
    /// Source name.
    pub name: String,
    /// Which provider this is.
    pub kind: SourceKind,
    /// Whether the source reports itself operational.
    pub available: bool,
    /// Whether the source is enabled (test harnesses can disable sources).
    pub enabled: bool,
    /// Total draw attempts.
    pub attempts: u64,
    /// Successful draws.
    pub successes: u64,
    /// Running success rate.
    pub success_rate: f64,
}

/// Aggregate combiner status.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EntropyStatus {
    /// Current smoothed quality score.
    pub quality_score: f64,
    /// Total `combine()` calls served.
    pub combines: u64,
    /// Configured source list with per-source success rates.
    pub sources: Vec<SourceStatus>,
}

/// Mixes raw samples from all sources into one normalized value and maintains
/// the rolling quality report. Success-rate counters are owned here, injected
/// at construction — no module-level singletons.
pub struct EntropyCombiner {
    slots: Vec<SourceSlot>,
    sample_budget: Duration,
    quality_ema: f64,
    combines: u64,
    fallback: bool,
}

impl EntropyCombiner {
    /// Combiner over the default five-source set.
    pub fn new() -> Self {
        Self::with_sources(sources::default_sources())
    }

    /// Combiner over an explicit source set (tests inject mocks here).
    pub fn with_sources(sources: Vec<Box<dyn EntropySource>>) -> Self {
        Self {
            slots: sources
                .into_iter()
                .map(|source| SourceSlot {
                    source,
                    stats: SourceStats::default(),
                    enabled: true,
                })
                .collect(),
            sample_budget: DEFAULT_SAMPLE_BUDGET,
            quality_ema: 0.0,
            combines: 0,
            fallback: true,
        }
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.slots.len()
    }

    /// Enable or disable a source by kind. Returns false if no such source is
    /// registered. Disabled sources count as failures in the quality stats,
    /// which is the point: the failure-injection harness uses this.
    pub fn set_source_enabled(&mut self, kind: SourceKind, enabled: bool) -> bool {
        let mut found = false;
        for slot in &mut self.slots {
            if slot.source.info().kind == kind {
                slot.enabled = enabled;
                found = true;
            }
        }
        found
    }

    #[cfg(test)]
    fn disable_fallback(&mut self) {
        self.fallback = false;
    }

    /// Mix one fresh sample from every source into a normalized value.
    pub fn combine(&mut self) -> Result<CombinedEntropy, EngineError> {
        let mut raws: Vec<u64> = Vec::with_capacity(self.slots.len());
        let mut contributing: Vec<SourceKind> = Vec::with_capacity(self.slots.len());

        for slot in &mut self.slots {
            if !slot.enabled {
                slot.stats.record(false);
                continue;
            }
            let t0 = Instant::now();
            let drawn = slot.source.sample();
            let within_budget = t0.elapsed() <= self.sample_budget;
            match drawn {
                Some(raw) if within_budget => {
                    slot.stats.record(true);
                    raws.push(raw);
                    contributing.push(slot.source.info().kind);
                }
                Some(_) => {
                    log::warn!(
                        "entropy source {} exceeded latency budget, treating as failure",
                        slot.source.name()
                    );
                    slot.stats.record(false);
                }
                None => {
                    slot.stats.record(false);
                }
            }
        }

        if raws.is_empty() {
            if !self.fallback {
                return Err(EngineError::AllSourcesFailed {
                    attempted: self.slots.len(),
                });
            }
            // Last resort before declaring total failure.
            match ClockSource::read_raw() {
                Some(raw) => {
                    log::warn!("all entropy sources failed, falling back to clock");
                    raws.push(raw);
                    contributing.push(SourceKind::MonotonicClock);
                }
                None => {
                    return Err(EngineError::AllSourcesFailed {
                        attempted: self.slots.len(),
                    });
                }
            }
        }

        let folded = raws.iter().fold(0u64, |acc, r| acc ^ r);
        let digest: [u8; 32] = Sha256::digest(folded.to_le_bytes()).into();
        let digest64 = u64::from_le_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]);
        // Top 53 bits over 2^53 gives an exact double in [0,1).
        let normalized = (digest64 >> 11) as f64 / (1u64 << 53) as f64;

        let success_fraction = contributing.len() as f64 / self.slots.len().max(1) as f64;
        self.quality_ema = if self.combines == 0 {
            success_fraction
        } else {
            QUALITY_EMA_ALPHA * success_fraction + (1.0 - QUALITY_EMA_ALPHA) * self.quality_ema
        };
        self.combines += 1;

        let clock_only =
            contributing.len() == 1 && contributing[0] == SourceKind::MonotonicClock;
        let quality_score = if clock_only {
            self.quality_ema.min(CLOCK_ONLY_QUALITY_CAP)
        } else {
            self.quality_ema
        };

        Ok(CombinedEntropy {
            raw: folded,
            digest64,
            normalized,
            contributing,
            quality_score,
        })
    }

    /// Latest smoothed quality score (0.0 before the first combine).
    pub fn quality_score(&self) -> f64 {
        self.quality_ema
    }

    /// Structured status: per-source success rates plus the current quality.
    pub fn status(&self) -> EntropyStatus {
        EntropyStatus {
            quality_score: self.quality_ema,
            combines: self.combines,
            sources: self
                .slots
                .iter()
                .map(|slot| {
                    let info = slot.source.info();
                    SourceStatus {
                        name: info.name.to_string(),
                        kind: info.kind,
                        available: slot.source.is_available(),
                        enabled: slot.enabled,
                        attempts: slot.stats.attempts,
                        successes: slot.stats.successes,
                        success_rate: slot.stats.success_rate(),
                    }
                })
                .collect(),
        }
    }
}

impl Default for EntropyCombiner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceInfo;
    use statrs::distribution::{ChiSquared, ContinuousCDF};

    struct NeverSource;

    static NEVER_INFO: SourceInfo = SourceInfo {
        name: "never",
        description: "always fails",
        kind: SourceKind::Csprng,
    };

    impl EntropySource for NeverSource {
        fn info(&self) -> &SourceInfo {
            &NEVER_INFO
        }
        fn is_available(&self) -> bool {
            false
        }
        fn sample(&self) -> Option<u64> {
            None
        }
    }

    #[test]
    fn normalized_in_unit_interval() {
        let mut combiner = EntropyCombiner::new();
        for _ in 0..10_000 {
            let c = combiner.combine().unwrap();
            assert!(c.normalized >= 0.0 && c.normalized < 1.0);
            assert!(c.normalized.is_finite());
        }
    }

    #[test]
    fn normalized_is_uniform_chi_squared() {
        let mut combiner = EntropyCombiner::new();
        const BINS: usize = 256;
        const TRIALS: usize = 20_480;
        let mut counts = [0u64; BINS];
        for _ in 0..TRIALS {
            let c = combiner.combine().unwrap();
            let bin = ((c.normalized * BINS as f64) as usize).min(BINS - 1);
            counts[bin] += 1;
        }
        let expected = TRIALS as f64 / BINS as f64;
        let chi2: f64 = counts
            .iter()
            .map(|&c| {
                let d = c as f64 - expected;
                d * d / expected
            })
            .sum();
        let dist = ChiSquared::new((BINS - 1) as f64).unwrap();
        let p = dist.sf(chi2);
        assert!(p > 1e-4, "uniformity rejected: chi2={chi2:.1}, p={p:.6}");
    }

    #[test]
    fn quality_is_one_when_all_sources_succeed() {
        let mut combiner = EntropyCombiner::new();
        let c = combiner.combine().unwrap();
        assert_eq!(c.contributing.len(), 5);
        assert!((c.quality_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn quality_decreases_as_sources_fail() {
        let mut combiner = EntropyCombiner::new();
        let settle = |combiner: &mut EntropyCombiner| {
            let mut last = 0.0;
            for _ in 0..50 {
                last = combiner.combine().unwrap().quality_score;
            }
            last
        };
        let q_all = settle(&mut combiner);

        let mut scores = vec![q_all];
        for kind in [
            SourceKind::Csprng,
            SourceKind::OsRandom,
            SourceKind::MemoryLayout,
            SourceKind::ProcessIdentity,
        ] {
            assert!(combiner.set_source_enabled(kind, false));
            scores.push(settle(&mut combiner));
        }
        for pair in scores.windows(2) {
            assert!(
                pair[1] < pair[0],
                "quality must drop as sources fail: {scores:?}"
            );
        }
    }

    #[test]
    fn clock_only_quality_is_capped() {
        let mut combiner = EntropyCombiner::new();
        for kind in [
            SourceKind::Csprng,
            SourceKind::OsRandom,
            SourceKind::MemoryLayout,
            SourceKind::ProcessIdentity,
        ] {
            combiner.set_source_enabled(kind, false);
        }
        let mut last = 1.0;
        for _ in 0..20 {
            last = combiner.combine().unwrap().quality_score;
        }
        assert!(last <= CLOCK_ONLY_QUALITY_CAP + 1e-12);
    }

    #[test]
    fn fallback_keeps_output_flowing_when_everything_is_disabled() {
        let mut combiner = EntropyCombiner::new();
        for kind in [
            SourceKind::Csprng,
            SourceKind::OsRandom,
            SourceKind::MonotonicClock,
            SourceKind::MemoryLayout,
            SourceKind::ProcessIdentity,
        ] {
            combiner.set_source_enabled(kind, false);
        }
        let c = combiner.combine().unwrap();
        assert_eq!(c.contributing, vec![SourceKind::MonotonicClock]);
        assert!(c.quality_score <= CLOCK_ONLY_QUALITY_CAP + 1e-12);
    }

    #[test]
    fn all_sources_failed_without_fallback() {
        let mut combiner = EntropyCombiner::with_sources(vec![Box::new(NeverSource)]);
        combiner.disable_fallback();
        let err = combiner.combine().unwrap_err();
        assert_eq!(err, EngineError::AllSourcesFailed { attempted: 1 });
    }

    #[test]
    fn status_tracks_success_rates() {
        let mut combiner = EntropyCombiner::new();
        combiner.set_source_enabled(SourceKind::MemoryLayout, false);
        for _ in 0..10 {
            combiner.combine().unwrap();
        }
        let status = combiner.status();
        assert_eq!(status.combines, 10);
        assert_eq!(status.sources.len(), 5);
        for s in &status.sources {
            if s.kind == SourceKind::MemoryLayout {
                assert_eq!(s.successes, 0);
                assert!(!s.enabled);
            } else {
                assert_eq!(s.successes, 10);
                assert!((s.success_rate - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn combines_do_not_repeat() {
        let mut combiner = EntropyCombiner::new();
        let a: Vec<f64> = (0..32).map(|_| combiner.combine().unwrap().normalized).collect();
        let b: Vec<f64> = (0..32).map(|_| combiner.combine().unwrap().normalized).collect();
        assert_ne!(a, b);
    }
}
