//! Engine error taxonomy.
//!
//! Per-source failures are *not* errors: a degraded source is absorbed into
//! the combiner's quality statistics and never surfaces to the caller. Only
//! total entropy failure and configuration mistakes abort an operation.

/// Errors that abort an engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Every entropy source failed, including the clock fallback. No
    /// randomness could be produced for this tick.
    AllSourcesFailed {
        /// Number of sources attempted before giving up.
        attempted: usize,
    },
    /// An oscillator or noise parameter was non-finite or out of range.
    /// Rejected at construction, never at runtime.
    InvalidConfiguration {
        /// Name of the offending parameter.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// Buffer capacity must be at least 1.
    BufferCapacityViolation {
        /// The rejected capacity.
        capacity: usize,
    },
    /// No context registered under this id.
    UnknownContext(String),
    /// A context with this id already exists.
    ContextExists(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllSourcesFailed { attempted } => {
                write!(f, "all {attempted} entropy sources failed, including the clock fallback")
            }
            Self::InvalidConfiguration { field, reason } => {
                write!(f, "invalid configuration: {field}: {reason}")
            }
            Self::BufferCapacityViolation { capacity } => {
                write!(f, "buffer capacity must be >= 1, got {capacity}")
            }
            Self::UnknownContext(id) => write!(f, "unknown context: {id}"),
            Self::ContextExists(id) => write!(f, "context already exists: {id}"),
        }
    }
}

impl std::error::Error for EngineError {}
