//! ClockSource — high-resolution clock readings and timing jitter.
//!
//! Mixes the wall-clock nanosecond count with the measured latency of a short
//! busy loop. The loop latency varies with scheduling and cache state, so the
//! low bits differ between back-to-back draws even when the wall clock tick
//! granularity is coarse.
//!
//! This source doubles as the combiner's last-resort fallback: it needs no
//! hardware, no syscall permissions, and cannot realistically fail, which is
//! exactly why output derived from it alone is quality-capped.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::source::{EntropySource, SourceInfo, SourceKind};

/// Busy-loop iterations timed per draw.
const JITTER_ROUNDS: u32 = 64;

/// Entropy source mixing wall-clock nanoseconds with loop timing jitter.
pub struct ClockSource;

static CLOCK_INFO: SourceInfo = SourceInfo {
    name: "monotonic_clock",
    description: "Wall-clock nanoseconds mixed with busy-loop timing jitter",
    kind: SourceKind::MonotonicClock,
};

impl ClockSource {
    pub fn new() -> Self {
        Self
    }

    /// Raw clock draw usable without an instance, for the fallback path.
    pub fn read_raw() -> Option<u64> {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()?
            .as_nanos() as u64;

        let t0 = Instant::now();
        let mut acc = 0u64;
        for i in 0..JITTER_ROUNDS {
            acc = acc.wrapping_mul(31).wrapping_add(u64::from(i));
            std::hint::black_box(acc);
        }
        let jitter = t0.elapsed().as_nanos() as u64;

        Some(wall ^ jitter.rotate_left(32) ^ acc.rotate_left(17))
    }
}

impl Default for ClockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for ClockSource {
    fn info(&self) -> &SourceInfo {
        &CLOCK_INFO
    }

    fn is_available(&self) -> bool {
        SystemTime::now().duration_since(UNIX_EPOCH).is_ok()
    }

    fn sample(&self) -> Option<u64> {
        Self::read_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_info() {
        let src = ClockSource::new();
        assert_eq!(src.name(), "monotonic_clock");
        assert_eq!(src.info().kind, SourceKind::MonotonicClock);
        assert!(src.is_available());
    }

    #[test]
    fn clock_draws_differ() {
        let src = ClockSource::new();
        let samples: Vec<_> = (0..16).filter_map(|_| src.sample()).collect();
        assert_eq!(samples.len(), 16);
        let mut unique = samples.clone();
        unique.sort_unstable();
        unique.dedup();
        // Nanosecond wall clock advances between draws.
        assert!(unique.len() > 1);
    }
}
