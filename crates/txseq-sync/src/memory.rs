//! In-process collaborators for tests, demos and single-process clusters.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::trace;
use txseq_sequence::{SequenceManager, SequenceStatus};
use txseq_types::{NodeId, TransactionId};

use crate::error::{SyncError, SyncResult};
use crate::transport::{ReplayOutcome, ReplayService, StatusTransport};

/// Transport whose peers are managers living in the same process.
///
/// An exchange answers with the peer manager's current status. Snapshots
/// sent to a peer are recorded so tests can inspect them. A partitioned
/// peer stays registered but every exchange with it fails.
#[derive(Default)]
pub struct LoopbackTransport {
    peers: RwLock<HashMap<NodeId, Arc<SequenceManager>>>,
    partitioned: RwLock<HashSet<NodeId>>,
    received: Mutex<Vec<(NodeId, SequenceStatus)>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `manager` reachable as `peer`, replacing any previous entry.
    pub fn register(&self, peer: NodeId, manager: Arc<SequenceManager>) {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer, manager);
    }

    pub fn unregister(&self, peer: &NodeId) -> bool {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(peer)
            .is_some()
    }

    /// Cut `peer` off until [`heal`](Self::heal) is called.
    pub fn partition(&self, peer: NodeId) {
        self.partitioned
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer);
    }

    pub fn heal(&self, peer: &NodeId) -> bool {
        self.partitioned
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(peer)
    }

    /// Snapshots delivered to peers, oldest first.
    pub fn received(&self) -> Vec<(NodeId, SequenceStatus)> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LoopbackTransport")
            .field("peers", &peers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl StatusTransport for LoopbackTransport {
    async fn exchange_status(
        &self,
        peer: &NodeId,
        local: &SequenceStatus,
    ) -> SyncResult<SequenceStatus> {
        let manager = self
            .peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(peer)
            .cloned()
            .ok_or_else(|| SyncError::UnknownPeer(peer.clone()))?;
        if self
            .partitioned
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(peer)
        {
            return Err(SyncError::Transport(format!("{peer} is unreachable")));
        }

        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((peer.clone(), local.clone()));
        trace!(%peer, "loopback status exchange");
        Ok(manager.current_status())
    }
}

/// Replay service driven by a scripted outcome table.
///
/// Ids without a scripted outcome get the default outcome
/// ([`ReplayOutcome::Applied`] unless changed). Every request is recorded.
#[derive(Debug)]
pub struct MemoryReplayService {
    default_outcome: ReplayOutcome,
    outcomes: Mutex<HashMap<TransactionId, ReplayOutcome>>,
    broken: Mutex<HashSet<TransactionId>>,
    requests: Mutex<Vec<TransactionId>>,
}

impl Default for MemoryReplayService {
    fn default() -> Self {
        Self::with_default(ReplayOutcome::Applied)
    }
}

impl MemoryReplayService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(default_outcome: ReplayOutcome) -> Self {
        Self {
            default_outcome,
            outcomes: Mutex::new(HashMap::new()),
            broken: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome for one id.
    pub fn set_outcome(&self, id: TransactionId, outcome: ReplayOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, outcome);
    }

    /// Make replaying `id` return an error instead of an outcome.
    pub fn break_on(&self, id: TransactionId) {
        self.broken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
    }

    /// Every id replay was requested for, in request order.
    pub fn requests(&self) -> Vec<TransactionId> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ReplayService for MemoryReplayService {
    async fn replay(&self, id: &TransactionId) -> SyncResult<ReplayOutcome> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id.clone());

        if self
            .broken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
        {
            return Err(SyncError::Replay(format!("replay of {id} failed")));
        }

        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .unwrap_or(self.default_outcome);
        Ok(outcome)
    }
}
