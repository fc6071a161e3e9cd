//! Secure entropy-driven oscillation engine.
//!
//! Combines five independent local entropy sources into a conditioned
//! stream, shapes it into 1/f pink noise, and feeds it through damped
//! second-order oscillator dynamics, one oscillator per relational
//! context. Emitted values land in a bounded history buffer from which
//! spectral and stability metrics are computed.
//!
//! The usual entry point is [`OscillationEngine`]:
//!
//! ```no_run
//! use flicker_core::{ContextConfig, OscillationEngine};
//!
//! let engine = OscillationEngine::new();
//! let id = engine.create_context(None, ContextConfig::default()).unwrap();
//! let out = engine.tick(&id).unwrap();
//! println!("{} -> {:.4}", out.context_id, out.value);
//! ```

pub mod buffer;
pub mod combiner;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod noise;
pub mod oscillator;
pub mod source;
pub mod sources;

pub use buffer::{BufferStatistics, DEFAULT_BUFFER_CAPACITY, OscillationBuffer};
pub use combiner::{CombinedEntropy, EntropyCombiner, EntropyStatus, SourceStatus};
pub use engine::{
    ContextConfig, OscillationEngine, PersistedContext, SelfTestReport, TickOutput,
};
pub use error::EngineError;
pub use metrics::{ConfidenceTier, MetricsReport, compute_metrics};
pub use noise::{PinkNoiseConfig, PinkNoiseGenerator};
pub use oscillator::{
    ChaoticParams, DampedOscillator, DampingRegime, OscillatorConfig, OscillatorState,
};
pub use source::{EntropySource, SourceInfo, SourceKind};

/// Library version, from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
