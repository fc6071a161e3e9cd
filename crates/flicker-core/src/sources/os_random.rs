//! OsRandomSource — the operating system's randomness interface.

use crate::source::{EntropySource, SourceInfo, SourceKind};

/// Entropy source reading 8 bytes from the OS CSPRNG via `getrandom`.
pub struct OsRandomSource;

static OS_RANDOM_INFO: SourceInfo = SourceInfo {
    name: "os_random",
    description: "OS randomness interface (getrandom)",
    kind: SourceKind::OsRandom,
};

impl OsRandomSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OsRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for OsRandomSource {
    fn info(&self) -> &SourceInfo {
        &OS_RANDOM_INFO
    }

    fn is_available(&self) -> bool {
        let mut probe = [0u8; 1];
        getrandom::fill(&mut probe).is_ok()
    }

    fn sample(&self) -> Option<u64> {
        let mut buf = [0u8; 8];
        getrandom::fill(&mut buf).ok()?;
        Some(u64::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_random_info() {
        let src = OsRandomSource::new();
        assert_eq!(src.name(), "os_random");
        assert_eq!(src.info().kind, SourceKind::OsRandom);
    }

    #[test]
    fn os_random_samples() {
        let src = OsRandomSource::new();
        if src.is_available() {
            assert!(src.sample().is_some());
        }
    }
}
