use thiserror::Error;

/// Errors produced when constructing foundation types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("node id must not be empty")]
    EmptyNodeId,

    #[error("node id too long: {len} bytes (max {max})")]
    NodeIdTooLong { len: usize, max: usize },

    #[error("transaction sequence must be at least 1 (position {position})")]
    ZeroSequence { position: u32 },
}
