//! Bounded, ordered history of emitted oscillation values.
//!
//! FIFO eviction at capacity. Owned by exactly one relational context and
//! persisted verbatim, in insertion order, across session suspend/resume.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Default retained length, matching the metrics confidence tiers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 128;

/// Bounded history buffer with FIFO eviction.
#[derive(Debug, Clone)]
pub struct OscillationBuffer {
    capacity: usize,
    values: VecDeque<f64>,
}

/// Descriptive statistics over the current buffer contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferStatistics {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

impl OscillationBuffer {
    /// Create an empty buffer. Capacity 0 is a configuration error.
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        if capacity == 0 {
            return Err(EngineError::BufferCapacityViolation { capacity });
        }
        Ok(Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        })
    }

    /// Rebuild from persisted values, keeping insertion order. If there are
    /// more values than capacity, the oldest are dropped, same as if they had
    /// been pushed live.
    pub fn from_values(capacity: usize, values: Vec<f64>) -> Result<Self, EngineError> {
        let mut buffer = Self::new(capacity)?;
        for v in values {
            buffer.push(v);
        }
        Ok(buffer)
    }

    /// Append a value, evicting the oldest entry when at capacity.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read-only copy of the contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// The most recent `count` values, oldest first.
    pub fn recent(&self, count: usize) -> Vec<f64> {
        let skip = self.values.len().saturating_sub(count);
        self.values.iter().skip(skip).copied().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Descriptive statistics over the current contents.
    pub fn statistics(&self) -> BufferStatistics {
        if self.values.is_empty() {
            return BufferStatistics {
                count: 0,
                mean: 0.0,
                std: 0.0,
                variance: 0.0,
                min: 0.0,
                max: 0.0,
                range: 0.0,
            };
        }
        let n = self.values.len() as f64;
        let mean = self.values.iter().sum::<f64>() / n;
        let variance = self.values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        BufferStatistics {
            count: self.values.len(),
            mean,
            std: variance.sqrt(),
            variance,
            min,
            max,
            range: max - min,
        }
    }
}
