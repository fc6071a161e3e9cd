//! Abstract entropy source trait and per-source runtime statistics.
//!
//! Every entropy source implements the [`EntropySource`] trait: metadata via
//! [`SourceInfo`], availability checking, and a single raw `u64` sample per
//! draw. Sources never return errors to callers — a failed draw is `None`,
//! recorded in [`SourceStats`] and reflected in the combiner's quality score.

use serde::{Deserialize, Serialize};

/// The fixed set of entropy providers the combiner draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Cryptographically secure userspace RNG.
    Csprng,
    /// OS-provided randomness interface.
    OsRandom,
    /// High-resolution monotonic clock jitter. Also the last-resort fallback.
    MonotonicClock,
    /// Hash of an ephemeral allocation's address.
    MemoryLayout,
    /// Process id combined with process CPU time.
    ProcessIdentity,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csprng => write!(f, "csprng"),
            Self::OsRandom => write!(f, "os_random"),
            Self::MonotonicClock => write!(f, "monotonic_clock"),
            Self::MemoryLayout => write!(f, "memory_layout"),
            Self::ProcessIdentity => write!(f, "process_identity"),
        }
    }
}

/// Metadata about an entropy source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Unique identifier (e.g. `"monotonic_clock"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    /// Which provider this is.
    pub kind: SourceKind,
}

/// Trait that every entropy source must implement.
pub trait EntropySource: Send + Sync {
    /// Source metadata.
    fn info(&self) -> &SourceInfo;

    /// Check if this source can operate on the current machine.
    fn is_available(&self) -> bool;

    /// Draw one raw sample. `None` means this attempt failed; the combiner
    /// records the failure and carries on with the surviving sources.
    fn sample(&self) -> Option<u64>;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Running success-rate counters for one registered source.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SourceStats {
    /// Total draw attempts.
    pub attempts: u64,
    /// Attempts that produced a usable sample within the latency budget.
    pub successes: u64,
}

impl SourceStats {
    /// Record the outcome of one draw attempt.
    pub fn record(&mut self, ok: bool) {
        self.attempts += 1;
        if ok {
            self.successes += 1;
        }
    }

    /// Fraction of attempts that succeeded. 1.0 before any attempt.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            1.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}
