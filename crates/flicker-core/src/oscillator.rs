//! Second-order damped-oscillator dynamics with an optional chaotic regime.
//!
//! Discrete integration of
//!
//! ```text
//! a = -2·ζ·ω·v − ω²·(x − target) + forcing
//! v += a·dt
//! x += v·dt
//! ```
//!
//! Velocity is updated before position (semi-implicit Euler), which keeps the
//! undriven system's energy from growing at the step sizes this engine uses.
//! The chaotic regime adds `attractor_strength · sin(λ · x)` to the forcing
//! term; because forcing is stochastic, position is clamped to the configured
//! output range after every step so the nonlinear term cannot run away.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Classification of the damping coefficient relative to 1.0. Informational
/// only: the update rule does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DampingRegime {
    Under,
    Critical,
    Over,
}

impl DampingRegime {
    /// Derive the regime from a damping coefficient.
    pub fn classify(damping_coefficient: f64) -> Self {
        if (damping_coefficient - 1.0).abs() < 1e-9 {
            Self::Critical
        } else if damping_coefficient < 1.0 {
            Self::Under
        } else {
            Self::Over
        }
    }
}

impl std::fmt::Display for DampingRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Under => write!(f, "under"),
            Self::Critical => write!(f, "critical"),
            Self::Over => write!(f, "over"),
        }
    }
}

/// Parameters of the chaotic forcing term.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChaoticParams {
    /// Spatial frequency of the nonlinear term.
    pub lyapunov_exponent: f64,
    /// Amplitude of the nonlinear term.
    pub attractor_strength: f64,
}

/// Validated oscillator configuration. Construction is the only place bad
/// parameters are rejected; `step` never fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorConfig {
    pub natural_frequency: f64,
    pub damping_coefficient: f64,
    pub target_value: f64,
    /// Time increment per step.
    pub dt: f64,
    /// Lower clamp bound for position.
    pub output_min: f64,
    /// Upper clamp bound for position.
    pub output_max: f64,
    /// Chaotic regime parameters; `None` disables the nonlinear term.
    pub chaotic: Option<ChaoticParams>,
    pub initial_position: f64,
    pub initial_velocity: f64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            natural_frequency: 1.0,
            damping_coefficient: 0.7,
            target_value: 0.0,
            dt: 0.1,
            output_min: -1.0,
            output_max: 1.0,
            chaotic: None,
            initial_position: 0.0,
            initial_velocity: 0.0,
        }
    }
}

impl OscillatorConfig {
    /// Reject non-finite parameters, non-positive `dt`, and inverted clamp
    /// bounds.
    pub fn validate(&self) -> Result<(), EngineError> {
        let finite_fields: [(&'static str, f64); 7] = [
            ("natural_frequency", self.natural_frequency),
            ("damping_coefficient", self.damping_coefficient),
            ("target_value", self.target_value),
            ("output_min", self.output_min),
            ("output_max", self.output_max),
            ("initial_position", self.initial_position),
            ("initial_velocity", self.initial_velocity),
        ];
        for (field, value) in finite_fields {
            if !value.is_finite() {
                return Err(EngineError::InvalidConfiguration {
                    field,
                    reason: format!("must be finite, got {value}"),
                });
            }
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                field: "dt",
                reason: format!("must be finite and > 0, got {}", self.dt),
            });
        }
        if self.natural_frequency <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                field: "natural_frequency",
                reason: format!("must be > 0, got {}", self.natural_frequency),
            });
        }
        if self.damping_coefficient < 0.0 {
            return Err(EngineError::InvalidConfiguration {
                field: "damping_coefficient",
                reason: format!("must be >= 0, got {}", self.damping_coefficient),
            });
        }
        if self.output_min >= self.output_max {
            return Err(EngineError::InvalidConfiguration {
                field: "output_min",
                reason: format!(
                    "clamp range is empty: [{}, {}]",
                    self.output_min, self.output_max
                ),
            });
        }
        if let Some(ch) = &self.chaotic {
            if !ch.lyapunov_exponent.is_finite() {
                return Err(EngineError::InvalidConfiguration {
                    field: "lyapunov_exponent",
                    reason: "must be finite".to_string(),
                });
            }
            if !ch.attractor_strength.is_finite() {
                return Err(EngineError::InvalidConfiguration {
                    field: "attractor_strength",
                    reason: "must be finite".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// The mutable dynamical state: position and velocity. Persisted verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorState {
    pub position: f64,
    pub velocity: f64,
}

/// One oscillator, owned by exactly one relational context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DampedOscillator {
    config: OscillatorConfig,
    state: OscillatorState,
}

impl DampedOscillator {
    /// Build from a validated configuration.
    pub fn new(config: OscillatorConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let state = OscillatorState {
            position: config.initial_position.clamp(config.output_min, config.output_max),
            velocity: config.initial_velocity,
        };
        Ok(Self { config, state })
    }

    /// Rebuild from persisted config + state, re-validating the config.
    pub fn restore(config: OscillatorConfig, state: OscillatorState) -> Result<Self, EngineError> {
        config.validate()?;
        if !state.position.is_finite() || !state.velocity.is_finite() {
            return Err(EngineError::InvalidConfiguration {
                field: "state",
                reason: "persisted position/velocity must be finite".to_string(),
            });
        }
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &OscillatorConfig {
        &self.config
    }

    pub fn state(&self) -> OscillatorState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.state.position
    }

    pub fn velocity(&self) -> f64 {
        self.state.velocity
    }

    /// Current damping regime, derived from the coefficient.
    pub fn regime(&self) -> DampingRegime {
        DampingRegime::classify(self.config.damping_coefficient)
    }

    /// Advance one time increment under the given forcing and return the new
    /// position. Position is clamped to the configured range afterwards; a
    /// clamp also zeroes velocity so the edge cannot store energy.
    pub fn step(&mut self, forcing: f64) -> f64 {
        let c = &self.config;
        let mut f = forcing;
        if let Some(ch) = &c.chaotic {
            f += ch.attractor_strength * (ch.lyapunov_exponent * self.state.position).sin();
        }

        let acceleration = -2.0 * c.damping_coefficient * c.natural_frequency * self.state.velocity
            - c.natural_frequency * c.natural_frequency * (self.state.position - c.target_value)
            + f;
        self.state.velocity += acceleration * c.dt;
        self.state.position += self.state.velocity * c.dt;

        if self.state.position < c.output_min {
            self.state.position = c.output_min;
            self.state.velocity = 0.0;
        } else if self.state.position > c.output_max {
            self.state.position = c.output_max;
            self.state.velocity = 0.0;
        }
        self.state.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn underdamped() -> OscillatorConfig {
        OscillatorConfig {
            natural_frequency: 2.0,
            damping_coefficient: 0.3,
            target_value: 0.0,
            dt: 0.01,
            initial_position: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn rejects_nonpositive_dt() {
        for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let config = OscillatorConfig {
                dt,
                ..Default::default()
            };
            assert!(DampedOscillator::new(config).is_err(), "dt={dt} accepted");
        }
    }

    #[test]
    fn rejects_nonfinite_parameters() {
        let config = OscillatorConfig {
            natural_frequency: f64::NAN,
            ..Default::default()
        };
        assert!(DampedOscillator::new(config).is_err());
        let config = OscillatorConfig {
            chaotic: Some(ChaoticParams {
                lyapunov_exponent: f64::INFINITY,
                attractor_strength: 1.0,
            }),
            ..Default::default()
        };
        assert!(DampedOscillator::new(config).is_err());
    }

    #[test]
    fn rejects_empty_clamp_range() {
        let config = OscillatorConfig {
            output_min: 1.0,
            output_max: -1.0,
            ..Default::default()
        };
        assert!(DampedOscillator::new(config).is_err());
    }

    #[test]
    fn regime_classification() {
        assert_eq!(DampingRegime::classify(0.5), DampingRegime::Under);
        assert_eq!(DampingRegime::classify(1.0), DampingRegime::Critical);
        assert_eq!(DampingRegime::classify(1.5), DampingRegime::Over);
    }

    #[test]
    fn underdamped_amplitude_decays() {
        let mut osc = DampedOscillator::new(underdamped()).unwrap();
        // Track peak |position| per oscillation period; peaks must shrink.
        let period_steps = (2.0 * std::f64::consts::PI / 2.0 / 0.01) as usize;
        let mut peaks = Vec::new();
        for _ in 0..6 {
            let mut peak: f64 = 0.0;
            for _ in 0..period_steps {
                peak = peak.max(osc.step(0.0).abs());
            }
            peaks.push(peak);
        }
        for pair in peaks.windows(2) {
            assert!(pair[1] < pair[0], "peaks not decaying: {peaks:?}");
        }
    }

    #[test]
    fn matches_closed_form_envelope() {
        // x(t) = e^{-ζωt}(x0 cos ω_d t + ((v0+ζωx0)/ω_d) sin ω_d t)
        let config = underdamped();
        let (zeta, omega, x0) = (0.3, 2.0, 0.5);
        let omega_d = omega * (1.0f64 - zeta * zeta).sqrt();
        let mut osc = DampedOscillator::new(config).unwrap();
        for n in 1..=2_000 {
            let x = osc.step(0.0);
            let t = n as f64 * 0.01;
            let envelope = (-zeta * omega * t).exp();
            let expected =
                envelope * (x0 * (omega_d * t).cos() + (zeta * omega * x0 / omega_d) * (omega_d * t).sin());
            assert!(
                (x - expected).abs() < 0.02,
                "step {n}: simulated {x}, closed form {expected}"
            );
        }
    }

    #[test]
    fn heavily_damped_settles_within_fifty_steps() {
        // ζ=0.7, ω=2.0, target 0, x0=0.3, v0=0, no forcing, dt=0.1, 50 steps.
        let config = OscillatorConfig {
            natural_frequency: 2.0,
            damping_coefficient: 0.7,
            target_value: 0.0,
            dt: 0.1,
            initial_position: 0.3,
            initial_velocity: 0.0,
            ..Default::default()
        };
        let mut osc = DampedOscillator::new(config).unwrap();
        let mut x = 0.0;
        for _ in 0..50 {
            x = osc.step(0.0);
        }
        assert!(x.abs() < 0.05, "final position {x}");
    }

    #[test]
    fn chaotic_mode_stays_bounded() {
        let config = OscillatorConfig {
            natural_frequency: 1.5,
            damping_coefficient: 0.2,
            dt: 0.05,
            chaotic: Some(ChaoticParams {
                lyapunov_exponent: 3.7,
                attractor_strength: 5.0,
            }),
            ..Default::default()
        };
        let mut osc = DampedOscillator::new(config).unwrap();
        // Adversarial alternating large forcing.
        for n in 0..100_000u32 {
            let forcing = if n % 2 == 0 { 50.0 } else { -47.0 };
            let x = osc.step(forcing);
            assert!(x.is_finite());
            assert!((-1.0..=1.0).contains(&x), "diverged at step {n}: {x}");
        }
    }

    #[test]
    fn chaotic_term_alters_trajectory() {
        let base = OscillatorConfig {
            damping_coefficient: 0.1,
            dt: 0.05,
            initial_position: 0.2,
            ..Default::default()
        };
        let mut plain = DampedOscillator::new(base.clone()).unwrap();
        let mut chaotic = DampedOscillator::new(OscillatorConfig {
            chaotic: Some(ChaoticParams {
                lyapunov_exponent: 6.0,
                attractor_strength: 4.0,
            }),
            ..base
        })
        .unwrap();
        let mut max_gap: f64 = 0.0;
        for _ in 0..500 {
            let gap = (plain.step(0.0) - chaotic.step(0.0)).abs();
            max_gap = max_gap.max(gap);
        }
        assert!(max_gap > 0.1, "nonlinear term had no visible effect");
    }

    #[test]
    fn state_round_trips_through_serde() {
        let mut osc = DampedOscillator::new(underdamped()).unwrap();
        for _ in 0..17 {
            osc.step(0.01);
        }
        let json = serde_json::to_string(&osc).unwrap();
        let restored: DampedOscillator = serde_json::from_str(&json).unwrap();
        assert_eq!(osc.state(), restored.state());
    }
}
