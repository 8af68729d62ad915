use thiserror::Error;
use txseq_sequence::SequenceError;
use txseq_types::NodeId;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("replay error: {0}")]
    Replay(String),

    #[error("unknown peer: {0}")]
    UnknownPeer(NodeId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
