//! Reconciliation for txseq.
//!
//! Replicas of a sequence space catch up by exchanging [`SequenceStatus`]
//! snapshots with peers, replaying the transactions the diff lists, and
//! persisting the confirmed state they reach. The network, the replay
//! mechanism and the persistence medium are collaborator traits; this crate
//! ships file-backed and in-memory implementations of them.
//!
//! [`SequenceStatus`]: txseq_sequence::SequenceStatus

pub mod config;
pub mod error;
pub mod memory;
pub mod reconciler;
pub mod store;
pub mod transport;

pub use config::{Durability, ReconcileConfig};
pub use error::{SyncError, SyncResult};
pub use memory::{LoopbackTransport, MemoryReplayService};
pub use reconciler::{ReconcileReport, Reconciler};
pub use store::{FileStatusStore, MemoryStatusStore};
pub use transport::{ReplayOutcome, ReplayService, StatusStore, StatusTransport};
