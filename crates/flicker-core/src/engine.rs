//! Per-context oscillation engine: the entropy → noise → oscillator → buffer
//! pipeline behind a context registry.
//!
//! One oscillator/buffer pair is owned by exactly one relational context.
//! Each context sits behind its own mutex, so a tick — combine, noise, step,
//! push — is atomic per context while ticks for different contexts proceed
//! concurrently. The combiner is process-global and locked only for the
//! duration of one combine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buffer::{DEFAULT_BUFFER_CAPACITY, OscillationBuffer};
use crate::combiner::{EntropyCombiner, EntropyStatus};
use crate::error::EngineError;
use crate::metrics::{self, MetricsReport};
use crate::noise::{PinkNoiseConfig, PinkNoiseGenerator};
use crate::oscillator::{DampedOscillator, OscillatorConfig, OscillatorState};

/// Samples the metrics path tops a context up to before computing variance.
const METRICS_SAMPLE_FLOOR: usize = 3;

/// Configuration for one relational context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub oscillator: OscillatorConfig,
    pub noise: PinkNoiseConfig,
    pub buffer_capacity: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            oscillator: OscillatorConfig::default(),
            noise: PinkNoiseConfig::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Result of advancing one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickOutput {
    pub context_id: String,
    /// The new oscillator position.
    pub value: f64,
    /// Quality score of the entropy behind this tick.
    pub quality_score: f64,
    /// Tick counter for this context.
    pub tick: u64,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
}

/// Everything needed to resume a context: plain structured records only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedContext {
    pub context_id: String,
    /// ISO-8601 UTC timestamp of the export.
    pub saved_at: String,
    pub oscillator_config: OscillatorConfig,
    pub oscillator_state: OscillatorState,
    pub noise: PinkNoiseGenerator,
    pub buffer_capacity: usize,
    /// Buffer contents, verbatim, in insertion order.
    pub buffer_values: Vec<f64>,
    pub ticks: u64,
}

/// One row of the diagnostic self-test output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTestSample {
    pub sample: usize,
    /// XOR-folded raw value before conditioning.
    pub raw: u64,
    pub normalized: f64,
    pub pink_noise: f64,
    pub oscillator: f64,
}

/// Quality summary over the self-test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTestQuality {
    pub quality_score: f64,
    /// Shannon entropy of the conditioned output bytes, bits/byte.
    pub shannon_entropy: f64,
    /// zlib compression ratio of the conditioned output bytes.
    pub compression_ratio: f64,
    pub sources: EntropyStatus,
}

/// Full self-test report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub samples: Vec<SelfTestSample>,
    pub quality: SelfTestQuality,
    pub timestamp: String,
}

struct ContextState {
    oscillator: DampedOscillator,
    noise: PinkNoiseGenerator,
    buffer: OscillationBuffer,
    ticks: u64,
}

impl ContextState {
    /// One atomic tick. Caller holds the context lock.
    fn advance(&mut self, combiner: &Mutex<EntropyCombiner>) -> Result<(f64, f64), EngineError> {
        let combined = combiner.lock().unwrap().combine()?;
        let forcing = self.noise.next(&combined);
        let value = self.oscillator.step(forcing);
        self.buffer.push(value);
        self.ticks += 1;
        Ok((value, combined.quality_score))
    }
}

/// The engine: a combiner plus a registry of relational contexts.
pub struct OscillationEngine {
    combiner: Mutex<EntropyCombiner>,
    contexts: RwLock<HashMap<String, Arc<Mutex<ContextState>>>>,
}

impl OscillationEngine {
    /// Engine over the default five-source combiner.
    pub fn new() -> Self {
        Self::with_combiner(EntropyCombiner::new())
    }

    /// Engine over an explicit combiner (tests inject degraded source sets).
    pub fn with_combiner(combiner: EntropyCombiner) -> Self {
        Self {
            combiner: Mutex::new(combiner),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Register a context. With `id = None` a UUID is generated. Returns the
    /// id actually used.
    pub fn create_context(
        &self,
        id: Option<&str>,
        config: ContextConfig,
    ) -> Result<String, EngineError> {
        let oscillator = DampedOscillator::new(config.oscillator)?;
        let noise = PinkNoiseGenerator::new(config.noise)?;
        let buffer = OscillationBuffer::new(config.buffer_capacity)?;

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut contexts = self.contexts.write().unwrap();
        if contexts.contains_key(&id) {
            return Err(EngineError::ContextExists(id));
        }
        log::info!("created context {id}");
        contexts.insert(
            id.clone(),
            Arc::new(Mutex::new(ContextState {
                oscillator,
                noise,
                buffer,
                ticks: 0,
            })),
        );
        Ok(id)
    }

    /// Remove a context. Returns whether it existed.
    pub fn remove_context(&self, id: &str) -> bool {
        self.contexts.write().unwrap().remove(id).is_some()
    }

    /// Registered context ids, unordered.
    pub fn context_ids(&self) -> Vec<String> {
        self.contexts.read().unwrap().keys().cloned().collect()
    }

    fn context(&self, id: &str) -> Result<Arc<Mutex<ContextState>>, EngineError> {
        self.contexts
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownContext(id.to_string()))
    }

    /// Advance one tick for a context and return the new oscillation value.
    pub fn tick(&self, id: &str) -> Result<TickOutput, EngineError> {
        let ctx = self.context(id)?;
        let mut state = ctx.lock().unwrap();
        let (value, quality_score) = state.advance(&self.combiner)?;
        Ok(TickOutput {
            context_id: id.to_string(),
            value,
            quality_score,
            tick: state.ticks,
            timestamp: iso8601_utc(SystemTime::now()),
        })
    }

    /// Compute metrics over a context's history.
    ///
    /// Below the sample floor, real ticks are issued through the normal
    /// pipeline (and land in the buffer like any other history) to stabilize
    /// the variance estimate — metrics are never computed from values the
    /// buffer has not seen.
    pub fn metrics(&self, id: &str) -> Result<MetricsReport, EngineError> {
        let ctx = self.context(id)?;
        let mut state = ctx.lock().unwrap();
        while state.buffer.len() < METRICS_SAMPLE_FLOOR {
            state.advance(&self.combiner)?;
        }
        let snapshot = state.buffer.snapshot();
        drop(state);
        let quality = self.combiner.lock().unwrap().quality_score();
        Ok(metrics::compute_metrics(&snapshot, quality))
    }

    /// Per-source success rates and the current quality score.
    pub fn entropy_status(&self) -> EntropyStatus {
        self.combiner.lock().unwrap().status()
    }

    /// Enable or disable an entropy source (failure-injection harness).
    pub fn set_source_enabled(&self, kind: crate::source::SourceKind, enabled: bool) -> bool {
        self.combiner.lock().unwrap().set_source_enabled(kind, enabled)
    }

    /// Exercise sources → combiner → noise → oscillator on throwaway state.
    /// No registered context is touched.
    pub fn self_test(&self, sample_count: usize) -> Result<SelfTestReport, EngineError> {
        let mut noise = PinkNoiseGenerator::new(PinkNoiseConfig::default())?;
        let mut oscillator = DampedOscillator::new(OscillatorConfig::default())?;

        let mut samples = Vec::with_capacity(sample_count);
        let mut conditioned = Vec::with_capacity(sample_count * 8);
        let mut last_quality = 0.0;
        for i in 0..sample_count {
            let combined = self.combiner.lock().unwrap().combine()?;
            conditioned.extend_from_slice(&combined.digest64.to_le_bytes());
            last_quality = combined.quality_score;
            let pink = noise.next(&combined);
            let position = oscillator.step(pink);
            samples.push(SelfTestSample {
                sample: i + 1,
                raw: combined.raw,
                normalized: combined.normalized,
                pink_noise: pink,
                oscillator: position,
            });
        }

        Ok(SelfTestReport {
            samples,
            quality: SelfTestQuality {
                quality_score: last_quality,
                shannon_entropy: metrics::quick_shannon(&conditioned),
                compression_ratio: metrics::compression_ratio(&conditioned),
                sources: self.combiner.lock().unwrap().status(),
            },
            timestamp: iso8601_utc(SystemTime::now()),
        })
    }

    /// Export a context as a plain structured record.
    pub fn export_context(&self, id: &str) -> Result<PersistedContext, EngineError> {
        let ctx = self.context(id)?;
        let state = ctx.lock().unwrap();
        Ok(PersistedContext {
            context_id: id.to_string(),
            saved_at: iso8601_utc(SystemTime::now()),
            oscillator_config: state.oscillator.config().clone(),
            oscillator_state: state.oscillator.state(),
            noise: state.noise.clone(),
            buffer_capacity: state.buffer.capacity(),
            buffer_values: state.buffer.snapshot(),
            ticks: state.ticks,
        })
    }

    /// Restore a context from a persisted record, replacing any context
    /// already registered under the same id. Configuration is re-validated;
    /// buffer contents are restored verbatim in insertion order.
    pub fn import_context(&self, persisted: PersistedContext) -> Result<String, EngineError> {
        let oscillator =
            DampedOscillator::restore(persisted.oscillator_config, persisted.oscillator_state)?;
        persisted.noise.config().validate()?;
        let buffer =
            OscillationBuffer::from_values(persisted.buffer_capacity, persisted.buffer_values)?;

        let id = persisted.context_id;
        let mut contexts = self.contexts.write().unwrap();
        if contexts.contains_key(&id) {
            log::info!("import replaces existing context {id}");
        }
        contexts.insert(
            id.clone(),
            Arc::new(Mutex::new(ContextState {
                oscillator,
                noise: persisted.noise,
                buffer,
                ticks: persisted.ticks,
            })),
        );
        Ok(id)
    }
}

impl Default for OscillationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ISO-8601 boundary timestamps
// ---------------------------------------------------------------------------

/// Render a `SystemTime` as an ISO-8601 UTC string with millisecond
/// precision, e.g. `2026-08-30T14:03:22.481Z`.
pub fn iso8601_utc(t: SystemTime) -> String {
    let d = t.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = d.as_secs();
    let millis = d.subsec_millis();
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    format!("{year:04}-{month:02}-{day:02}T{h:02}:{m:02}:{s:02}.{millis:03}Z")
}

/// Days-since-epoch to civil date (Howard Hinnant's algorithm).
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn create_tick_and_history() {
        let engine = OscillationEngine::new();
        let id = engine.create_context(Some("ctx"), ContextConfig::default()).unwrap();
        assert_eq!(id, "ctx");
        for n in 1..=5 {
            let out = engine.tick("ctx").unwrap();
            assert_eq!(out.tick, n);
            assert!(out.value.is_finite());
            assert!((-1.0..=1.0).contains(&out.value));
            assert!(out.quality_score > 0.0);
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let engine = OscillationEngine::new();
        let a = engine.create_context(None, ContextConfig::default()).unwrap();
        let b = engine.create_context(None, ContextConfig::default()).unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.context_ids().len(), 2);
    }

    #[test]
    fn duplicate_context_rejected() {
        let engine = OscillationEngine::new();
        engine.create_context(Some("dup"), ContextConfig::default()).unwrap();
        let err = engine
            .create_context(Some("dup"), ContextConfig::default())
            .unwrap_err();
        assert_eq!(err, EngineError::ContextExists("dup".to_string()));
    }

    #[test]
    fn unknown_context_errors() {
        let engine = OscillationEngine::new();
        assert!(matches!(
            engine.tick("nope"),
            Err(EngineError::UnknownContext(_))
        ));
        assert!(matches!(
            engine.metrics("nope"),
            Err(EngineError::UnknownContext(_))
        ));
    }

    #[test]
    fn bad_configuration_rejected_at_creation() {
        let engine = OscillationEngine::new();
        let mut config = ContextConfig::default();
        config.buffer_capacity = 0;
        assert!(matches!(
            engine.create_context(Some("bad"), config),
            Err(EngineError::BufferCapacityViolation { .. })
        ));
        let mut config = ContextConfig::default();
        config.oscillator.dt = -1.0;
        assert!(matches!(
            engine.create_context(Some("bad"), config),
            Err(EngineError::InvalidConfiguration { field: "dt", .. })
        ));
    }

    #[test]
    fn metrics_supplement_lands_in_buffer() {
        let engine = OscillationEngine::new();
        engine.create_context(Some("m"), ContextConfig::default()).unwrap();
        let report = engine.metrics("m").unwrap();
        // The supplementary ticks are real history, visible afterwards.
        assert!(report.sample_count >= 3);
        let exported = engine.export_context("m").unwrap();
        assert_eq!(exported.buffer_values.len(), report.sample_count);
    }

    #[test]
    fn self_test_leaves_contexts_untouched() {
        let engine = OscillationEngine::new();
        engine.create_context(Some("quiet"), ContextConfig::default()).unwrap();
        engine.tick("quiet").unwrap();
        engine.tick("quiet").unwrap();

        let report = engine.self_test(16).unwrap();
        assert_eq!(report.samples.len(), 16);
        for s in &report.samples {
            assert!(s.normalized >= 0.0 && s.normalized < 1.0);
            assert!(s.pink_noise.is_finite());
            assert!(s.oscillator.is_finite());
        }
        assert!(report.quality.shannon_entropy > 6.0);

        let exported = engine.export_context("quiet").unwrap();
        assert_eq!(exported.buffer_values.len(), 2);
        assert_eq!(exported.ticks, 2);
    }

    #[test]
    fn export_import_preserves_state() {
        let engine = OscillationEngine::new();
        engine.create_context(Some("src"), ContextConfig::default()).unwrap();
        for _ in 0..7 {
            engine.tick("src").unwrap();
        }
        let mut exported = engine.export_context("src").unwrap();
        exported.context_id = "copy".to_string();
        engine.import_context(exported.clone()).unwrap();

        let reexported = engine.export_context("copy").unwrap();
        assert_eq!(reexported.buffer_values, exported.buffer_values);
        assert_eq!(reexported.oscillator_state, exported.oscillator_state);
        assert_eq!(reexported.ticks, 7);
    }

    #[test]
    fn persisted_continuation_is_bit_identical() {
        // Same forcing sequence, with and without a suspend/resume in the
        // middle, must produce the same output sequence bit for bit.
        let forcing: Vec<f64> = (0..40).map(|i| ((i as f64) * 0.37).sin() * 0.2).collect();
        let config = OscillatorConfig {
            damping_coefficient: 0.4,
            natural_frequency: 1.8,
            ..Default::default()
        };

        let mut reference = DampedOscillator::new(config.clone()).unwrap();
        let mut ref_buffer = OscillationBuffer::new(32).unwrap();
        for &f in &forcing {
            ref_buffer.push(reference.step(f));
        }

        let mut live = DampedOscillator::new(config).unwrap();
        let mut live_buffer = OscillationBuffer::new(32).unwrap();
        for &f in &forcing[..20] {
            live_buffer.push(live.step(f));
        }

        // Suspend: plain structured records on disk.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        let record = serde_json::json!({
            "oscillator": live,
            "capacity": live_buffer.capacity(),
            "values": live_buffer.snapshot(),
        });
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(serde_json::to_string_pretty(&record).unwrap().as_bytes())
            .unwrap();

        // Resume.
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let mut resumed: DampedOscillator =
            serde_json::from_value(parsed["oscillator"].clone()).unwrap();
        let mut resumed_buffer = OscillationBuffer::from_values(
            parsed["capacity"].as_u64().unwrap() as usize,
            serde_json::from_value(parsed["values"].clone()).unwrap(),
        )
        .unwrap();
        for &f in &forcing[20..] {
            resumed_buffer.push(resumed.step(f));
        }

        assert_eq!(resumed_buffer.snapshot(), ref_buffer.snapshot());
        assert_eq!(resumed.state(), reference.state());
    }

    #[test]
    fn concurrent_ticks_across_contexts() {
        let engine = Arc::new(OscillationEngine::new());
        for i in 0..4 {
            engine
                .create_context(Some(&format!("c{i}")), ContextConfig::default())
                .unwrap();
        }
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let id = format!("c{i}");
                    for _ in 0..50 {
                        engine.tick(&id).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for i in 0..4 {
            let exported = engine.export_context(&format!("c{i}")).unwrap();
            assert_eq!(exported.ticks, 50);
        }
    }

    #[test]
    fn iso8601_formats_known_instant() {
        let t = UNIX_EPOCH + Duration::from_millis(1_000_000_000_123);
        // 2001-09-09T01:46:40.123Z
        assert_eq!(iso8601_utc(t), "2001-09-09T01:46:40.123Z");
        assert_eq!(iso8601_utc(UNIX_EPOCH), "1970-01-01T00:00:00.000Z");
    }
}
