use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use txseq_sequence::SequenceStatus;
use txseq_types::{NodeId, TransactionId};

use crate::error::SyncResult;

/// Result of asking the replay service to re-apply one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplayOutcome {
    /// The transaction was fetched and applied locally.
    Applied,
    /// The transaction is known to have failed at its origin.
    Failed,
    /// No peer could supply the transaction (yet).
    NotFound,
}

/// Exchanges status snapshots with peers.
#[async_trait]
pub trait StatusTransport: Send + Sync {
    /// Send `local` to `peer` and return the peer's own snapshot.
    async fn exchange_status(
        &self,
        peer: &NodeId,
        local: &SequenceStatus,
    ) -> SyncResult<SequenceStatus>;
}

/// Re-applies transactions this node never received.
#[async_trait]
pub trait ReplayService: Send + Sync {
    async fn replay(&self, id: &TransactionId) -> SyncResult<ReplayOutcome>;
}

/// Durable home of the local confirmed state.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn persist(&self, status: &SequenceStatus) -> SyncResult<()>;
    /// `None` when nothing has been persisted yet.
    async fn load(&self) -> SyncResult<Option<SequenceStatus>>;
}
