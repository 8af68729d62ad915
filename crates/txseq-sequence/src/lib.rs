//! Transaction sequencing for txseq.
//!
//! A sequence space is a fixed array of slots, each holding an independent
//! monotonic counter. The [`SequenceManager`] mints ids into free slots,
//! records outcomes, flags gaps when confirmations skip sequences, and diffs
//! its confirmed state against a peer's [`SequenceStatus`] snapshot to list
//! the transactions it never received.

pub mod config;
pub mod error;
pub mod manager;
pub mod status;

pub use config::SequenceConfig;
pub use error::{Result, SequenceError};
pub use manager::SequenceManager;
pub use status::{SequenceStatus, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
