//! MemorySource — memory-layout-derived values.
//!
//! Hashes the addresses of two ephemeral heap allocations plus a stack slot.
//! ASLR and allocator state make the addresses vary across processes and, for
//! the heap, across draws as the allocator recycles differently-sized blocks.
//! Low per-draw entropy, which is fine: it only ever enters the pool XORed
//! with the stronger sources.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::source::{EntropySource, SourceInfo, SourceKind};

/// Entropy source hashing ephemeral allocation addresses.
pub struct MemorySource;

static MEMORY_INFO: SourceInfo = SourceInfo {
    name: "memory_layout",
    description: "Hash of ephemeral heap and stack addresses (ASLR + allocator state)",
    kind: SourceKind::MemoryLayout,
};

impl MemorySource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for MemorySource {
    fn info(&self) -> &SourceInfo {
        &MEMORY_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn sample(&self) -> Option<u64> {
        let small = Box::new(0u8);
        let large = vec![0u8; 64];
        let stack_slot = 0u64;

        let mut h = DefaultHasher::new();
        (&raw const *small as usize).hash(&mut h);
        (large.as_ptr() as usize).hash(&mut h);
        (&raw const stack_slot as usize).hash(&mut h);
        Some(h.finish())
    }
}
