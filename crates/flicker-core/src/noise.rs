//! 1/f ("pink") noise synthesis over the combined entropy stream.
//!
//! Voss–McCartney scheme: `octaves` white-noise slots, each refreshed at half
//! the rate of the previous one. The tick counter's trailing-zero count picks
//! the slot to refresh, so slot 0 changes every other tick, slot 1 every
//! fourth, and so on — summing slots with halving update rates is what tilts
//! the spectrum toward 1/f. The emitted value is the slot mean rather than the
//! raw sum, so output magnitude is independent of the octave count; the
//! spectral shape is unaffected by the constant scale.

use serde::{Deserialize, Serialize};

use crate::combiner::CombinedEntropy;
use crate::error::EngineError;

/// Generator configuration. `spectral_slope` is the reported target of the
/// scheme (nominally −1.0); it is not enforced beyond the generation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinkNoiseConfig {
    /// Number of white-noise slots.
    pub octaves: usize,
    /// Output amplitude scale.
    pub intensity: f64,
    /// Target spectral slope, for reporting.
    pub spectral_slope: f64,
}

impl Default for PinkNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 5,
            intensity: 1.0,
            spectral_slope: -1.0,
        }
    }
}

impl PinkNoiseConfig {
    /// Reject non-finite or degenerate parameters at configuration time.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.octaves == 0 {
            return Err(EngineError::InvalidConfiguration {
                field: "octaves",
                reason: "must be >= 1".to_string(),
            });
        }
        if !self.intensity.is_finite() || self.intensity <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                field: "intensity",
                reason: format!("must be finite and > 0, got {}", self.intensity),
            });
        }
        if !self.spectral_slope.is_finite() {
            return Err(EngineError::InvalidConfiguration {
                field: "spectral_slope",
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }
}

/// Stateful pink-noise generator. Consumes one combined entropy value per
/// tick and emits the mean of all slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinkNoiseGenerator {
    config: PinkNoiseConfig,
    slots: Vec<f64>,
    counter: u64,
}

impl PinkNoiseGenerator {
    pub fn new(config: PinkNoiseConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let slots = vec![0.0; config.octaves];
        Ok(Self {
            config,
            slots,
            counter: 0,
        })
    }

    pub fn config(&self) -> &PinkNoiseConfig {
        &self.config
    }

    /// Advance one tick: refresh the slot selected by the counter with a
    /// zero-centered, intensity-scaled value derived from `combined`, and
    /// emit the slot average.
    pub fn next(&mut self, combined: &CombinedEntropy) -> f64 {
        self.counter = self.counter.wrapping_add(1);
        let idx = (self.counter.trailing_zeros() as usize).min(self.config.octaves - 1);
        self.slots[idx] = (combined.normalized * 2.0 - 1.0) * self.config.intensity;
        self.slots.iter().sum::<f64>() / self.config.octaves as f64
    }

    /// Reset slots and counter to the zero state.
    pub fn reset(&mut self) {
        self.slots.fill(0.0);
        self.counter = 0;
    }
}
