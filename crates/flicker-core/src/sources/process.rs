//! ProcessSource — process-identity-derived values.
//!
//! Combines the pid with the process CPU-time clock. The pid is fixed for the
//! process lifetime but the CPU-time nanoseconds advance unevenly with
//! scheduling, so consecutive draws still differ in their low bits.

use crate::source::{EntropySource, SourceInfo, SourceKind};

/// Entropy source mixing pid with process CPU time.
pub struct ProcessSource;

static PROCESS_INFO: SourceInfo = SourceInfo {
    name: "process_identity",
    description: "Process id mixed with process CPU-time nanoseconds",
    kind: SourceKind::ProcessIdentity,
};

impl ProcessSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the per-process CPU-time clock in nanoseconds.
#[cfg(unix)]
fn process_cpu_time_ns() -> Option<u64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: clock_gettime only writes into the timespec we hand it.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return None;
    }
    Some((ts.tv_sec as u64).wrapping_mul(1_000_000_000).wrapping_add(ts.tv_nsec as u64))
}

#[cfg(not(unix))]
fn process_cpu_time_ns() -> Option<u64> {
    use std::time::{SystemTime, UNIX_EPOCH};
    Some(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()?
            .as_nanos() as u64,
    )
}

impl EntropySource for ProcessSource {
    fn info(&self) -> &SourceInfo {
        &PROCESS_INFO
    }

    fn is_available(&self) -> bool {
        process_cpu_time_ns().is_some()
    }

    fn sample(&self) -> Option<u64> {
        let pid = u64::from(std::process::id());
        let cpu_ns = process_cpu_time_ns()?;
        Some(pid.rotate_left(24) ^ cpu_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_info() {
        let src = ProcessSource::new();
        assert_eq!(src.name(), "process_identity");
        assert_eq!(src.info().kind, SourceKind::ProcessIdentity);
    }

    #[test]
    fn process_samples() {
        let src = ProcessSource::new();
        if src.is_available() {
            assert!(src.sample().is_some());
        }
    }
}
