//! The five entropy providers.
//!
//! Each source yields one raw `u64` per draw. None of them is trusted on its
//! own — the combiner XOR-folds and hashes whatever subset succeeded.

pub mod clock;
pub mod csprng;
pub mod memory;
pub mod os_random;
pub mod process;

pub use clock::ClockSource;
pub use csprng::CsprngSource;
pub use memory::MemorySource;
pub use os_random::OsRandomSource;
pub use process::ProcessSource;

use crate::source::EntropySource;

/// The default provider set, in combiner registration order.
pub fn default_sources() -> Vec<Box<dyn EntropySource>> {
    vec![
        Box::new(CsprngSource::new()),
        Box::new(OsRandomSource::new()),
        Box::new(ClockSource::new()),
        Box::new(MemorySource::new()),
        Box::new(ProcessSource::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_five_distinct_kinds() {
        let sources = default_sources();
        assert_eq!(sources.len(), 5);
        let mut kinds: Vec<_> = sources.iter().map(|s| s.info().kind).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), 5);
    }
}
