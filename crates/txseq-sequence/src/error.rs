use txseq_types::{NodeId, TypeError};

/// Errors produced by the sequence subsystem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    /// Capacity must be between 1 and `u32::MAX` slots.
    #[error("invalid capacity {0}: must be between 1 and {max}", max = u32::MAX)]
    InvalidCapacity(usize),

    /// An id or request names a slot outside the space.
    #[error("position {position} out of range for capacity {capacity}")]
    PositionOutOfRange { position: u32, capacity: usize },

    /// Snapshot bytes are corrupt or truncated.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Snapshot header carries a format version this build cannot read.
    #[error("unsupported snapshot version {found} (supported: {supported})")]
    UnsupportedVersion { found: u8, supported: u8 },

    /// A snapshot or id belongs to a different sequence space.
    #[error("owner mismatch: manager tracks {expected}, got {actual}")]
    OwnerMismatch { expected: NodeId, actual: NodeId },

    /// A snapshot describes a space of a different size.
    #[error("capacity mismatch: manager has {expected} slots, snapshot has {actual}")]
    CapacityMismatch { expected: usize, actual: usize },

    /// A slot's counter has reached `u64::MAX` and cannot mint again.
    #[error("sequence exhausted at position {position}")]
    SequenceExhausted { position: u32 },

    #[error(transparent)]
    Type(#[from] TypeError),

    /// Configuration could not be parsed or is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the sequence crate.
pub type Result<T> = std::result::Result<T, SequenceError>;
