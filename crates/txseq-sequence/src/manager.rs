use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};
use txseq_types::{NodeId, TransactionId};

use crate::config::SequenceConfig;
use crate::error::{Result, SequenceError};
use crate::status::SequenceStatus;

/// Mutable slot bookkeeping, guarded by the manager's mutex.
struct SlotTable {
    /// Highest sequence ever minted (or observed) per slot.
    assigned: Vec<u64>,
    /// Highest sequence whose outcome has been recorded per slot.
    confirmed: Vec<u64>,
    /// Slot currently holds an unresolved assignment.
    busy: Vec<bool>,
    busy_count: usize,
    /// Where the next round-robin scan starts.
    cursor: usize,
    /// Sequence space this manager describes, once bound.
    space: Option<NodeId>,
    /// Ids reported missing that have not been resolved yet, keyed by
    /// `(position, sequence)` with the owner tag they were reported under.
    gaps: BTreeMap<(u32, u64), Option<NodeId>>,
}

/// Assigns transaction ids and detects gaps in one sequence space.
///
/// The space is a fixed array of `capacity` slots. Each slot is an
/// independent counter that cycles through *free → assigned → resolved →
/// free*: `next`/`next_at` mint the next sequence at a slot and mark it busy,
/// and `notify_success`/`notify_failure` record the outcome, advance the
/// slot's confirmed cursor and free it again.
///
/// The same type serves both sides of replication. A coordinator mints ids
/// and confirms them in order. A replica never mints; it feeds the outcomes
/// it observes into its own manager, which then reports skipped sequences as
/// missing, and diffs its confirmed cursors against a peer's
/// [`SequenceStatus`] with [`check_self_status`](Self::check_self_status).
///
/// All operations take one internal lock, reads included, so snapshots are
/// always consistent. No operation blocks on anything else or performs I/O.
pub struct SequenceManager {
    /// Identity of the node running this manager.
    node: NodeId,
    capacity: usize,
    max_gap: u64,
    state: Mutex<SlotTable>,
}

impl SequenceManager {
    /// Create a manager with `capacity` free slots and default limits.
    pub fn new(node: NodeId, capacity: usize) -> Result<Self> {
        Self::with_config(
            node,
            &SequenceConfig {
                capacity,
                ..SequenceConfig::default()
            },
        )
    }

    /// Create a manager from a configuration.
    pub fn with_config(node: NodeId, config: &SequenceConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        Ok(Self {
            node,
            capacity,
            max_gap: config.max_gap,
            state: Mutex::new(SlotTable {
                assigned: vec![0; capacity],
                confirmed: vec![0; capacity],
                busy: vec![false; capacity],
                busy_count: 0,
                cursor: 0,
                space: None,
                gaps: BTreeMap::new(),
            }),
        })
    }

    /// Bind this manager to the sequence space it describes.
    ///
    /// A bound manager refuses snapshots and ids from any other space with
    /// [`SequenceError::OwnerMismatch`]. Unbound managers bind themselves on
    /// their first successful [`fill`](Self::fill).
    pub fn tracking(mut self, space: NodeId) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .space = Some(space);
        self
    }

    /// Identity of the node running this manager.
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// The bound sequence space, if any.
    pub fn space(&self) -> Option<NodeId> {
        self.lock().space.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots holding an unresolved assignment.
    pub fn in_flight(&self) -> usize {
        self.lock().busy_count
    }

    /// Confirmed sequence at a slot.
    pub fn confirmed_at(&self, position: u32) -> Result<u64> {
        let p = self.slot(position)?;
        Ok(self.lock().confirmed[p])
    }

    /// Highest sequence minted or observed at a slot.
    pub fn assigned_at(&self, position: u32) -> Result<u64> {
        let p = self.slot(position)?;
        Ok(self.lock().assigned[p])
    }

    /// Ids previously reported missing that are still unresolved.
    pub fn outstanding_gaps(&self) -> Vec<TransactionId> {
        self.lock()
            .gaps
            .iter()
            .filter_map(|(&(position, sequence), owner)| {
                TransactionId::new(owner.clone(), position, sequence).ok()
            })
            .collect()
    }

    /// Mint an id at the next free slot, scanning round-robin from the slot
    /// after the last one handed out.
    ///
    /// Returns `None` when every slot is busy. That is backpressure, not an
    /// error: retry once an outcome has freed a slot.
    pub fn next(&self) -> Option<TransactionId> {
        let mut state = self.lock();
        if state.busy_count == self.capacity {
            trace!(capacity = self.capacity, "all slots busy");
            return None;
        }

        let start = state.cursor;
        let position = (0..self.capacity)
            .map(|offset| (start + offset) % self.capacity)
            .find(|&p| !state.busy[p] && state.assigned[p] < u64::MAX)?;

        state.cursor = (position + 1) % self.capacity;
        match self.assign(&mut state, position) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(position, error = %e, "failed to mint transaction id");
                None
            }
        }
    }

    /// Mint an id at an explicit slot, even if the slot is busy.
    ///
    /// A pending id at that slot is superseded: its sequence stays below the
    /// new one, so a late outcome for it is recognized as stale.
    pub fn next_at(&self, position: u32) -> Result<TransactionId> {
        let p = self.slot(position)?;
        let mut state = self.lock();
        if state.busy[p] {
            debug!(
                position,
                superseded = state.assigned[p],
                "superseding pending assignment"
            );
        }
        self.assign(&mut state, p)
    }

    /// Record that `id` completed successfully.
    ///
    /// Returns the ids skipped between the slot's previous confirmed
    /// sequence and `id`, which are now flagged as outstanding gaps. A
    /// coordinator confirming its own ids in order always gets an empty list.
    /// Confirming an already-confirmed sequence is a no-op (and fills the gap
    /// if that id had been reported missing).
    pub fn notify_success(&self, id: &TransactionId) -> Result<Vec<TransactionId>> {
        let p = self.slot(id.position())?;
        let mut state = self.lock();
        Self::check_id_owner(&state, id)?;

        let sequence = id.sequence();
        let confirmed = state.confirmed[p];
        if sequence <= confirmed {
            if state.gaps.remove(&id.key()).is_some() {
                debug!(%id, "gap filled");
            } else {
                trace!(%id, confirmed, "duplicate confirmation ignored");
            }
            return Ok(Vec::new());
        }

        let missing = self
            .gap_range(id.position(), confirmed, sequence)
            .map(|s| TransactionId::new(id.owner().cloned(), id.position(), s))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if !missing.is_empty() {
            warn!(
                position = id.position(),
                from = confirmed + 1,
                to = sequence - 1,
                "sequence gap detected"
            );
            for m in &missing {
                state.gaps.insert(m.key(), m.owner().cloned());
            }
        }

        Self::resolve(&mut state, p, sequence);
        Ok(missing)
    }

    /// Record that `id` did not complete.
    ///
    /// Returns `true` if the failure was relevant: `id` was the slot's
    /// pending or most recent assignment, or an outstanding gap. Returns
    /// `false` for a stale notification (already confirmed, or superseded by
    /// a newer assignment at the same slot).
    pub fn notify_failure(&self, id: &TransactionId) -> Result<bool> {
        let p = self.slot(id.position())?;
        let mut state = self.lock();
        Self::check_id_owner(&state, id)?;

        let sequence = id.sequence();
        let confirmed = state.confirmed[p];
        if sequence <= confirmed {
            if state.gaps.remove(&id.key()).is_some() {
                debug!(%id, "gap resolved as failed");
                return Ok(true);
            }
            debug!(%id, confirmed, "stale failure ignored");
            return Ok(false);
        }

        if sequence < state.assigned[p] {
            debug!(%id, assigned = state.assigned[p], "failure for superseded id ignored");
            return Ok(false);
        }

        for s in self.gap_range(id.position(), confirmed, sequence) {
            state.gaps.insert((id.position(), s), id.owner().cloned());
        }

        Self::resolve(&mut state, p, sequence);
        Ok(true)
    }

    /// Check whether `id` is exactly the next expected id at its slot.
    ///
    /// `None` means it can be applied straight away. `Some(expected)` means
    /// it is stale or ahead of a gap; `expected` is the id this manager is
    /// waiting for at that slot. Never mutates state.
    pub fn validate_transaction_id(&self, id: &TransactionId) -> Result<Option<TransactionId>> {
        let p = self.slot(id.position())?;
        let state = self.lock();
        let Some(expected) = state.confirmed[p].checked_add(1) else {
            return Ok(Some(id.clone()));
        };
        if id.sequence() == expected {
            return Ok(None);
        }
        Ok(Some(TransactionId::new(
            id.owner().cloned(),
            id.position(),
            expected,
        )?))
    }

    /// Snapshot of the confirmed cursor of every slot.
    ///
    /// Tagged with the bound sequence space, or this node when unbound.
    pub fn current_status(&self) -> SequenceStatus {
        let state = self.lock();
        let owner = state.space.clone().unwrap_or_else(|| self.node.clone());
        SequenceStatus::from_parts(owner, state.confirmed.clone())
    }

    /// List the transactions `remote` has confirmed that this manager has not.
    ///
    /// For every slot, that is each sequence above the local confirmed cursor
    /// up to the remote one, plus any outstanding gap the remote covers. The
    /// result is ordered by `(position, sequence)` and tagged with
    /// `remote.owner()` so each id can be requested from that node. Does not
    /// mutate: replay the ids, then confirm them.
    pub fn check_self_status(&self, remote: &SequenceStatus) -> Result<Vec<TransactionId>> {
        let state = self.lock();
        self.check_snapshot(&state, remote)?;

        let owner = remote.owner();
        let mut missing = Vec::new();
        for (p, (&local, &theirs)) in state.confirmed.iter().zip(remote.slots()).enumerate() {
            let position = p as u32;

            let outstanding = state
                .gaps
                .range((position, 0)..=(position, theirs))
                .map(|(&(_, sequence), _)| sequence);
            let behind = local.saturating_add(1)..theirs.saturating_add(1);
            let mut listed = 0u64;
            for sequence in outstanding.chain(behind).take(self.max_gap as usize) {
                missing.push(TransactionId::owned(owner.clone(), position, sequence)?);
                listed += 1;
            }

            let wanted = state.gaps.range((position, 0)..=(position, theirs)).count() as u64
                + theirs.saturating_sub(local);
            if wanted > listed {
                warn!(
                    position,
                    wanted,
                    listed,
                    "status diff truncated; the rest is listed once these are confirmed"
                );
            }
        }

        if !missing.is_empty() {
            debug!(remote = %owner, missing = missing.len(), "status diff computed");
        }
        Ok(missing)
    }

    /// Rehydrate confirmed state from a snapshot.
    ///
    /// Used to seed a manager from persisted state, or to advance it after
    /// replaying what [`check_self_status`](Self::check_self_status) listed.
    /// Cursors never move backwards: slots where the snapshot is behind keep
    /// their local value. Outstanding gaps the snapshot covers are dropped.
    /// The snapshot is checked in full before anything is changed.
    pub fn fill(&self, status: &SequenceStatus) -> Result<()> {
        let mut state = self.lock();
        self.check_snapshot(&state, status)?;

        let mut behind = 0usize;
        for (p, &incoming) in status.slots().iter().enumerate() {
            if incoming < state.confirmed[p] {
                behind += 1;
                continue;
            }
            Self::resolve(&mut state, p, incoming);
        }

        let slots = status.slots();
        state
            .gaps
            .retain(|&(position, sequence), _| sequence > slots[position as usize]);

        if state.space.is_none() {
            debug!(space = %status.owner(), "bound to sequence space");
            state.space = Some(status.owner().clone());
        }
        if behind > 0 {
            warn!(
                behind,
                owner = %status.owner(),
                "snapshot behind local state on some slots; kept local values"
            );
        }
        debug!(
            owner = %status.owner(),
            confirmed = status.total_confirmed(),
            "filled from snapshot"
        );
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SlotTable> {
        // Every transition completes before the guard drops, so a poisoned
        // table is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, position: u32) -> Result<usize> {
        let p = position as usize;
        if p >= self.capacity {
            return Err(SequenceError::PositionOutOfRange {
                position,
                capacity: self.capacity,
            });
        }
        Ok(p)
    }

    fn assign(&self, state: &mut SlotTable, p: usize) -> Result<TransactionId> {
        let position = p as u32;
        let sequence = state.assigned[p]
            .checked_add(1)
            .ok_or(SequenceError::SequenceExhausted { position })?;
        let owner = state.space.clone().unwrap_or_else(|| self.node.clone());
        let id = TransactionId::owned(owner, position, sequence)?;

        state.assigned[p] = sequence;
        if !state.busy[p] {
            state.busy[p] = true;
            state.busy_count += 1;
        }
        trace!(%id, "assigned");
        Ok(id)
    }

    /// Advance a slot's confirmed cursor to `sequence`, freeing it when no
    /// newer assignment is pending there.
    fn resolve(state: &mut SlotTable, p: usize, sequence: u64) {
        state.confirmed[p] = sequence;
        if state.assigned[p] < sequence {
            state.assigned[p] = sequence;
        }
        if state.busy[p] && state.assigned[p] <= sequence {
            state.busy[p] = false;
            state.busy_count -= 1;
        }
    }

    /// Sequences strictly between `confirmed` and `sequence`, capped at the
    /// lowest `max_gap` of them.
    fn gap_range(&self, position: u32, confirmed: u64, sequence: u64) -> Range<u64> {
        let span = sequence - confirmed - 1;
        if span > self.max_gap {
            warn!(
                position,
                span,
                limit = self.max_gap,
                "gap exceeds limit; only the lowest sequences are tracked"
            );
        }
        confirmed + 1..confirmed + 1 + span.min(self.max_gap)
    }

    fn check_id_owner(state: &SlotTable, id: &TransactionId) -> Result<()> {
        if let (Some(space), Some(owner)) = (&state.space, id.owner()) {
            if space != owner {
                return Err(SequenceError::OwnerMismatch {
                    expected: space.clone(),
                    actual: owner.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_snapshot(&self, state: &SlotTable, status: &SequenceStatus) -> Result<()> {
        if let Some(space) = &state.space {
            if space != status.owner() {
                return Err(SequenceError::OwnerMismatch {
                    expected: space.clone(),
                    actual: status.owner().clone(),
                });
            }
        }
        if status.capacity() != self.capacity {
            return Err(SequenceError::CapacityMismatch {
                expected: self.capacity,
                actual: status.capacity(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SequenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SequenceManager")
            .field("node", &self.node)
            .field("space", &state.space)
            .field("capacity", &self.capacity)
            .field("in_flight", &state.busy_count)
            .field("gaps", &state.gaps.len())
            .finish()
    }
}
