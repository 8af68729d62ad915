//! Periodic catch-up against peers.
//!
//! A round with one peer:
//!
//! 1. drop unresolved ids this node has since confirmed some other way, then
//!    send the local status and receive the peer's;
//! 2. [`check_self_status`](SequenceManager::check_self_status) lists the ids
//!    the peer confirmed that this node has not;
//! 3. replay them in `(position, sequence)` order. `Applied` confirms the id,
//!    `Failed` records the failure. `NotFound` or a replay error leaves the
//!    id unresolved and skips the rest of its slot for this round, so the
//!    confirmed cursor never jumps past a transaction this node lacks;
//! 4. persist the confirmed status if anything changed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use txseq_sequence::SequenceManager;
use txseq_tracked::{DirtyFlag, TrackedSet};
use txseq_types::{NodeId, TransactionId};

use crate::config::ReconcileConfig;
use crate::error::SyncResult;
use crate::store::FileStatusStore;
use crate::transport::{ReplayOutcome, ReplayService, StatusStore, StatusTransport};

/// Summary of one reconciliation round with one peer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Ids the peer had confirmed that this node had not.
    pub missing: usize,
    /// Replayed and confirmed.
    pub applied: usize,
    /// Replayed and recorded as failed.
    pub failed: usize,
    /// Replay could not produce the transaction.
    pub unresolved: Vec<TransactionId>,
    /// Not attempted: behind an unresolved id at the same slot.
    pub blocked: usize,
    /// Not attempted: the round's replay budget ran out.
    pub deferred: usize,
    /// The confirmed status was written to the store.
    pub persisted: bool,
}

impl ReconcileReport {
    /// Whether the round left this node fully caught up with the peer.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.blocked == 0 && self.deferred == 0
    }
}

/// Drives reconciliation of one [`SequenceManager`] against its peers.
pub struct Reconciler {
    manager: Arc<SequenceManager>,
    transport: Arc<dyn StatusTransport>,
    replay: Arc<dyn ReplayService>,
    store: Arc<dyn StatusStore>,
    config: ReconcileConfig,
    /// Marked by every change that needs persisting.
    dirty: DirtyFlag,
    /// Ids replay could not produce yet; retried every round.
    unresolved: Mutex<TrackedSet<TransactionId>>,
}

impl Reconciler {
    pub fn new(
        manager: Arc<SequenceManager>,
        transport: Arc<dyn StatusTransport>,
        replay: Arc<dyn ReplayService>,
        store: Arc<dyn StatusStore>,
        config: ReconcileConfig,
    ) -> Self {
        let dirty = DirtyFlag::new();
        let unresolved = Mutex::new(TrackedSet::new(dirty.clone()));
        Self {
            manager,
            transport,
            replay,
            store,
            config,
            dirty,
            unresolved,
        }
    }

    /// Reconciler persisting to the file named by `config.status_path`.
    pub fn with_file_store(
        manager: Arc<SequenceManager>,
        transport: Arc<dyn StatusTransport>,
        replay: Arc<dyn ReplayService>,
        config: ReconcileConfig,
    ) -> Self {
        let store = Arc::new(FileStatusStore::from_config(&config));
        Self::new(manager, transport, replay, store, config)
    }

    pub fn manager(&self) -> &Arc<SequenceManager> {
        &self.manager
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Ids that could not be replayed so far, in `(position, sequence)` order.
    pub fn unresolved(&self) -> Vec<TransactionId> {
        self.unresolved_set().iter().cloned().collect()
    }

    /// Whether local state changed since it was last persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    /// Seed the manager from the persisted status, if there is one.
    ///
    /// Returns whether a status was found.
    pub async fn recover(&self) -> SyncResult<bool> {
        let Some(status) = self.store.load().await? else {
            info!("no persisted status; starting empty");
            return Ok(false);
        };
        self.manager.fill(&status)?;
        info!(
            owner = %status.owner(),
            confirmed = status.total_confirmed(),
            "recovered persisted status"
        );
        Ok(true)
    }

    /// Run one reconciliation round with `peer`.
    pub async fn reconcile_with(&self, peer: &NodeId) -> SyncResult<ReconcileReport> {
        self.prune_unresolved();
        let local = self.manager.current_status();
        let remote = self.transport.exchange_status(peer, &local).await?;
        let missing = self.manager.check_self_status(&remote)?;

        let mut report = ReconcileReport {
            missing: missing.len(),
            ..ReconcileReport::default()
        };
        let mut blocked_slots = HashSet::new();
        let mut attempts = 0usize;

        for id in missing {
            if blocked_slots.contains(&id.position()) {
                report.blocked += 1;
                continue;
            }
            if attempts == self.config.max_replays_per_round {
                report.deferred += 1;
                continue;
            }
            attempts += 1;

            match self.replay.replay(&id).await {
                Ok(ReplayOutcome::Applied) => {
                    self.manager.notify_success(&id)?;
                    self.resolve(&id);
                    report.applied += 1;
                }
                Ok(ReplayOutcome::Failed) => {
                    self.manager.notify_failure(&id)?;
                    self.resolve(&id);
                    report.failed += 1;
                }
                Ok(ReplayOutcome::NotFound) => {
                    warn!(%id, %peer, "transaction not available for replay");
                    self.unresolved_set().insert(id.clone());
                    blocked_slots.insert(id.position());
                    report.unresolved.push(id);
                }
                Err(e) => {
                    warn!(%id, %peer, error = %e, "replay failed");
                    self.unresolved_set().insert(id.clone());
                    blocked_slots.insert(id.position());
                    report.unresolved.push(id);
                }
            }
        }

        if self.dirty.take() {
            if let Err(e) = self.store.persist(&self.manager.current_status()).await {
                self.dirty.mark();
                return Err(e);
            }
            report.persisted = true;
        }

        info!(
            %peer,
            missing = report.missing,
            applied = report.applied,
            failed = report.failed,
            unresolved = report.unresolved.len(),
            blocked = report.blocked,
            deferred = report.deferred,
            "reconcile round finished"
        );
        Ok(report)
    }

    /// Reconcile with every peer each `interval` until `shutdown` turns
    /// `true` (or its sender is dropped).
    ///
    /// A failing peer is logged and skipped; it does not stop the loop.
    pub async fn run(&self, peers: &[NodeId], mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(peers = peers.len(), interval = ?self.config.interval, "reconciler started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    for peer in peers {
                        if let Err(e) = self.reconcile_with(peer).await {
                            warn!(%peer, error = %e, "reconcile round failed");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("reconciler stopped");
    }

    fn resolve(&self, id: &TransactionId) {
        self.dirty.mark();
        if self.unresolved_set().remove(id) {
            debug!(%id, "previously unresolved transaction replayed");
        }
    }

    /// Forget unresolved ids the manager has confirmed without a replay.
    fn prune_unresolved(&self) {
        let gaps: HashSet<TransactionId> = self.manager.outstanding_gaps().into_iter().collect();
        let mut unresolved = self.unresolved_set();
        let settled: Vec<TransactionId> = unresolved
            .iter()
            .filter(|id| {
                !gaps.contains(*id)
                    && matches!(
                        self.manager.confirmed_at(id.position()),
                        Ok(confirmed) if id.sequence() <= confirmed
                    )
            })
            .cloned()
            .collect();
        for id in settled {
            unresolved.remove(&id);
            debug!(%id, "unresolved transaction confirmed without replay");
        }
    }

    fn unresolved_set(&self) -> MutexGuard<'_, TrackedSet<TransactionId>> {
        self.unresolved.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("manager", &self.manager)
            .field("config", &self.config)
            .field("dirty", &self.dirty.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use txseq_sequence::{SequenceConfig, SequenceError, SequenceStatus};

    use super::*;
    use crate::config::Durability;
    use crate::error::SyncError;
    use crate::memory::{LoopbackTransport, MemoryReplayService};
    use crate::store::MemoryStatusStore;

    fn node(name: &str) -> NodeId {
        NodeId::new(name).unwrap()
    }

    fn id(position: u32, sequence: u64) -> TransactionId {
        TransactionId::unowned(position, sequence).unwrap()
    }

    /// A coordinator that has confirmed `per_slot[p]` transactions at slot `p`.
    fn coordinator(per_slot: &[u64]) -> Arc<SequenceManager> {
        let m = Arc::new(SequenceManager::new(node("one"), per_slot.len()).unwrap());
        for (p, &count) in per_slot.iter().enumerate() {
            for _ in 0..count {
                let tx = m.next_at(p as u32).unwrap();
                m.notify_success(&tx).unwrap();
            }
        }
        m
    }

    struct Fixture {
        reconciler: Reconciler,
        replica: Arc<SequenceManager>,
        replay: Arc<MemoryReplayService>,
        store: Arc<MemoryStatusStore>,
    }

    fn fixture(source: &Arc<SequenceManager>, config: ReconcileConfig) -> Fixture {
        let replica = SequenceManager::new(node("two"), source.capacity()).unwrap();
        fixture_with(source, replica, config)
    }

    fn fixture_with(
        source: &Arc<SequenceManager>,
        replica: SequenceManager,
        config: ReconcileConfig,
    ) -> Fixture {
        let replica = Arc::new(replica.tracking(node("one")));
        let transport = Arc::new(LoopbackTransport::new());
        transport.register(node("one"), Arc::clone(source));
        let replay = Arc::new(MemoryReplayService::new());
        let store = Arc::new(MemoryStatusStore::new());
        let reconciler = Reconciler::new(
            Arc::clone(&replica),
            transport,
            replay.clone(),
            store.clone(),
            config,
        );
        Fixture {
            reconciler,
            replica,
            replay,
            store,
        }
    }

    #[tokio::test]
    async fn replays_exactly_the_missing_ids() {
        let source = coordinator(&[2, 0, 1]);
        let f = fixture(&source, ReconcileConfig::default());
        f.replica.notify_success(&id(0, 1)).unwrap();

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.missing, 2);
        assert_eq!(report.applied, 2);
        assert!(report.is_complete());
        assert!(report.persisted);
        assert_eq!(f.replay.requests(), vec![id(0, 2), id(2, 1)]);
        assert_eq!(f.replica.current_status(), source.current_status());

        let stored = f.store.load().await.unwrap().unwrap();
        assert_eq!(stored, source.current_status());
        assert!(!f.reconciler.is_dirty());
    }

    #[tokio::test]
    async fn caught_up_round_does_not_persist() {
        let source = coordinator(&[1, 1]);
        let f = fixture(&source, ReconcileConfig::default());
        f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(f.store.writes(), 1);

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert_eq!(f.store.writes(), 1);
    }

    #[tokio::test]
    async fn failed_replay_is_recorded() {
        let source = coordinator(&[2]);
        let f = fixture(&source, ReconcileConfig::default());
        f.replay.set_outcome(id(0, 1), ReplayOutcome::Failed);

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!((report.applied, report.failed), (1, 1));
        assert_eq!(f.replica.confirmed_at(0).unwrap(), 2);
    }

    #[tokio::test]
    async fn unresolved_id_blocks_rest_of_slot() {
        let source = coordinator(&[3, 1]);
        let f = fixture(&source, ReconcileConfig::default());
        f.replay.set_outcome(id(0, 2), ReplayOutcome::NotFound);

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(report.unresolved, vec![id(0, 2)]);
        assert_eq!(report.blocked, 1);
        assert!(!report.is_complete());
        assert_eq!(f.replica.current_status().slots(), &[1, 1]);
        assert_eq!(f.reconciler.unresolved(), vec![id(0, 2)]);
        assert_eq!(f.replay.requests(), vec![id(0, 1), id(0, 2), id(1, 1)]);

        // Next round the transaction is available and the slot catches up.
        f.replay.set_outcome(id(0, 2), ReplayOutcome::Applied);
        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.applied, 2);
        assert!(f.reconciler.unresolved().is_empty());
        assert_eq!(f.replica.current_status(), source.current_status());
    }

    #[tokio::test]
    async fn replay_error_is_unresolved() {
        let source = coordinator(&[2]);
        let f = fixture(&source, ReconcileConfig::default());
        f.replay.break_on(id(0, 1));

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.unresolved, vec![id(0, 1)]);
        assert_eq!(report.blocked, 1);
        assert_eq!(f.replica.confirmed_at(0).unwrap(), 0);
        // Only the unresolved set changed, which still counts as dirty.
        assert!(report.persisted);
    }

    #[tokio::test]
    async fn replay_budget_defers_remainder() {
        let source = coordinator(&[3, 3]);
        let config = ReconcileConfig {
            max_replays_per_round: 4,
            ..ReconcileConfig::default()
        };
        let f = fixture(&source, config);

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!((report.applied, report.deferred), (4, 2));
        assert_eq!(f.replica.current_status().slots(), &[3, 1]);

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!((report.applied, report.deferred), (2, 0));
        assert_eq!(f.replica.current_status(), source.current_status());
    }

    #[tokio::test]
    async fn outstanding_gap_is_replayed() {
        let source = coordinator(&[3]);
        let f = fixture(&source, ReconcileConfig::default());
        f.replica.notify_success(&id(0, 1)).unwrap();
        assert_eq!(f.replica.notify_success(&id(0, 3)).unwrap(), vec![id(0, 2)]);

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(f.replay.requests(), vec![id(0, 2)]);
        assert!(f.replica.outstanding_gaps().is_empty());
    }

    #[tokio::test]
    async fn far_behind_replica_catches_up_over_rounds() {
        let source = coordinator(&[10, 3]);
        let config = SequenceConfig {
            capacity: 2,
            max_gap: 4,
        };
        let replica = SequenceManager::with_config(node("two"), &config).unwrap();
        let f = fixture_with(&source, replica, ReconcileConfig::default());

        let mut rounds = Vec::new();
        for _ in 0..4 {
            let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
            assert!(report.is_complete());
            rounds.push((report.applied, f.replica.current_status().slots().to_vec()));
        }
        assert_eq!(
            rounds,
            vec![
                (7, vec![4, 3]),
                (4, vec![8, 3]),
                (2, vec![10, 3]),
                (0, vec![10, 3]),
            ]
        );
        assert_eq!(f.replica.current_status(), source.current_status());
    }

    #[tokio::test]
    async fn unresolved_id_confirmed_elsewhere_is_dropped() {
        let source = coordinator(&[2]);
        let f = fixture(&source, ReconcileConfig::default());
        f.replay.set_outcome(id(0, 1), ReplayOutcome::NotFound);

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.unresolved, vec![id(0, 1)]);
        assert_eq!(f.reconciler.unresolved(), vec![id(0, 1)]);

        // The transactions arrive through normal delivery instead of replay.
        f.replica.notify_success(&id(0, 1)).unwrap();
        f.replica.notify_success(&id(0, 2)).unwrap();

        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.missing, 0);
        assert!(report.persisted);
        assert!(f.reconciler.unresolved().is_empty());
        assert_eq!(f.replay.requests(), vec![id(0, 1)]);
    }

    #[tokio::test]
    async fn unresolved_outstanding_gap_is_kept() {
        let source = coordinator(&[3]);
        let f = fixture(&source, ReconcileConfig::default());
        f.replay.set_outcome(id(0, 2), ReplayOutcome::NotFound);
        f.replica.notify_success(&id(0, 1)).unwrap();
        f.replica.notify_success(&id(0, 3)).unwrap();

        f.reconciler.reconcile_with(&node("one")).await.unwrap();
        let report = f.reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.unresolved, vec![id(0, 2)]);
        assert_eq!(f.reconciler.unresolved(), vec![id(0, 2)]);
    }

    /// Store whose writes fail while `failing` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStatusStore,
        failing: AtomicBool,
    }

    #[async_trait]
    impl StatusStore for FlakyStore {
        async fn persist(&self, status: &SequenceStatus) -> SyncResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SyncError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.persist(status).await
        }

        async fn load(&self) -> SyncResult<Option<SequenceStatus>> {
            self.inner.load().await
        }
    }

    #[tokio::test]
    async fn failed_persist_is_retried_next_round() {
        let source = coordinator(&[2]);
        let replica = Arc::new(
            SequenceManager::new(node("two"), 1)
                .unwrap()
                .tracking(node("one")),
        );
        let transport = Arc::new(LoopbackTransport::new());
        transport.register(node("one"), Arc::clone(&source));
        let store = Arc::new(FlakyStore::default());
        store.failing.store(true, Ordering::SeqCst);
        let reconciler = Reconciler::new(
            Arc::clone(&replica),
            transport,
            Arc::new(MemoryReplayService::new()),
            store.clone(),
            ReconcileConfig::default(),
        );

        let err = reconciler.reconcile_with(&node("one")).await.unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
        assert!(reconciler.is_dirty());
        assert_eq!(replica.confirmed_at(0).unwrap(), 2);
        assert!(store.load().await.unwrap().is_none());

        store.failing.store(false, Ordering::SeqCst);
        let report = reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.missing, 0);
        assert!(report.persisted);
        assert!(!reconciler.is_dirty());
        assert_eq!(store.load().await.unwrap(), Some(source.current_status()));
    }

    #[tokio::test]
    async fn file_store_from_config_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let source = coordinator(&[1, 2]);
        let config = ReconcileConfig {
            status_path: dir.path().join("two.status"),
            durability: Durability::EveryWrite,
            ..ReconcileConfig::default()
        };
        let replica = Arc::new(
            SequenceManager::new(node("two"), 2)
                .unwrap()
                .tracking(node("one")),
        );
        let transport = Arc::new(LoopbackTransport::new());
        transport.register(node("one"), Arc::clone(&source));
        let reconciler = Reconciler::with_file_store(
            replica,
            transport,
            Arc::new(MemoryReplayService::new()),
            config.clone(),
        );
        assert!(reconciler.reconcile_with(&node("one")).await.unwrap().persisted);

        let restarted = Arc::new(SequenceManager::new(node("two"), 2).unwrap());
        let reconciler = Reconciler::with_file_store(
            Arc::clone(&restarted),
            Arc::new(LoopbackTransport::new()),
            Arc::new(MemoryReplayService::new()),
            config,
        );
        assert!(reconciler.recover().await.unwrap());
        assert_eq!(restarted.current_status(), source.current_status());
    }

    #[tokio::test]
    async fn partitioned_peer_fails_the_round() {
        let source = coordinator(&[1]);
        let transport = Arc::new(LoopbackTransport::new());
        transport.register(node("one"), Arc::clone(&source));
        transport.partition(node("one"));
        let replica = Arc::new(SequenceManager::new(node("two"), 1).unwrap());
        let reconciler = Reconciler::new(
            Arc::clone(&replica),
            transport.clone(),
            Arc::new(MemoryReplayService::new()),
            Arc::new(MemoryStatusStore::new()),
            ReconcileConfig::default(),
        );

        let err = reconciler.reconcile_with(&node("one")).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        assert_eq!(replica.confirmed_at(0).unwrap(), 0);

        transport.heal(&node("one"));
        let report = reconciler.reconcile_with(&node("one")).await.unwrap();
        assert_eq!(report.applied, 1);
    }

    #[tokio::test]
    async fn foreign_peer_is_rejected() {
        let stranger = Arc::new(SequenceManager::new(node("three"), 2).unwrap());
        let source = coordinator(&[0, 0]);
        let f = fixture(&source, ReconcileConfig::default());

        let transport = Arc::new(LoopbackTransport::new());
        transport.register(node("three"), stranger);
        let reconciler = Reconciler::new(
            Arc::clone(&f.replica),
            transport,
            f.replay.clone(),
            f.store.clone(),
            ReconcileConfig::default(),
        );
        let err = reconciler.reconcile_with(&node("three")).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Sequence(SequenceError::OwnerMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn recover_restores_persisted_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        let store = Arc::new(FileStatusStore::new(&path, Durability::EveryWrite));
        let snapshot = SequenceStatus::new(node("one"), vec![4, 0, 2]).unwrap();
        store.persist(&snapshot).await.unwrap();

        let replica = Arc::new(SequenceManager::new(node("two"), 3).unwrap());
        let reconciler = Reconciler::new(
            Arc::clone(&replica),
            Arc::new(LoopbackTransport::new()),
            Arc::new(MemoryReplayService::new()),
            store,
            ReconcileConfig::default(),
        );
        assert!(reconciler.recover().await.unwrap());
        assert_eq!(replica.current_status(), snapshot);
        assert_eq!(replica.space(), Some(node("one")));
    }

    #[tokio::test]
    async fn recover_without_status_is_empty() {
        let source = coordinator(&[1]);
        let f = fixture(&source, ReconcileConfig::default());
        assert!(!f.reconciler.recover().await.unwrap());
        assert_eq!(f.replica.confirmed_at(0).unwrap(), 0);
    }

    #[tokio::test]
    async fn run_reconciles_until_shutdown() {
        let source = coordinator(&[2, 2]);
        let config = ReconcileConfig {
            interval: Duration::from_millis(10),
            ..ReconcileConfig::default()
        };
        let f = Arc::new(fixture(&source, config));
        let (tx, rx) = watch::channel(false);

        let runner = {
            let f = Arc::clone(&f);
            tokio::spawn(async move {
                f.reconciler
                    .run(&[node("ghost"), node("one")], rx)
                    .await;
            })
        };

        let caught_up = async {
            while f.replica.current_status() != source.current_status() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), caught_up)
            .await
            .expect("replica did not catch up");

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("reconciler did not stop")
            .unwrap();
    }
}
