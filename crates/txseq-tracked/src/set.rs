//! Ordered set that reports its mutations.
//!
//! [`TrackedSet`] wraps a `BTreeSet`. Mutations through [`insert`],
//! [`remove`] and [`clear`] that actually change the contents mark the
//! owner's [`DirtyFlag`] and are delivered synchronously, in registration
//! order, to every listener. No-op mutations (inserting a present value,
//! removing an absent one) emit nothing. [`insert_silent`] loads values
//! without either side effect, for rehydrating state that is already
//! persisted.
//!
//! [`insert`]: TrackedSet::insert
//! [`remove`]: TrackedSet::remove
//! [`clear`]: TrackedSet::clear
//! [`insert_silent`]: TrackedSet::insert_silent

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::dirty::DirtyFlag;
use crate::event::{ChangeEvent, ChangeKind, ListenerId};

type Listener<T> = Box<dyn Fn(&ChangeEvent<T>) + Send + Sync>;

/// An ordered set whose effective mutations fire [`ChangeEvent`]s.
///
/// Only the values are serialized; listeners and the dirty flag belong to
/// the in-memory owner and are never persisted.
pub struct TrackedSet<T> {
    values: BTreeSet<T>,
    listeners: Vec<(ListenerId, Listener<T>)>,
    next_listener: u64,
    dirty: DirtyFlag,
}

impl<T: Ord + Clone> TrackedSet<T> {
    /// Create an empty set that marks `dirty` on every effective mutation.
    pub fn new(dirty: DirtyFlag) -> Self {
        Self {
            values: BTreeSet::new(),
            listeners: Vec::new(),
            next_listener: 0,
            dirty,
        }
    }

    /// Create a set with its own, unshared dirty flag.
    pub fn detached() -> Self {
        Self::new(DirtyFlag::new())
    }

    /// The flag this set marks.
    pub fn dirty(&self) -> &DirtyFlag {
        &self.dirty
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.values.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Borrow the underlying values.
    pub fn values(&self) -> &BTreeSet<T> {
        &self.values
    }

    // ---------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------

    /// Register a listener; it sees every event fired after this call.
    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent<T>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(registered, _)| *registered != id);
        self.listeners.len() != before
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Insert a value. Fires an [`Add`](ChangeKind::Add) event only if the
    /// value was absent; returns whether it was.
    pub fn insert(&mut self, value: T) -> bool {
        if !self.values.insert(value.clone()) {
            return false;
        }
        self.fire(ChangeEvent::added(value));
        true
    }

    /// Insert without firing events or marking the owner dirty.
    pub fn insert_silent(&mut self, value: T) -> bool {
        self.values.insert(value)
    }

    /// Remove a value. Fires a [`Remove`](ChangeKind::Remove) event only if
    /// the value was present; returns whether it was.
    pub fn remove(&mut self, value: &T) -> bool {
        match self.values.take(value) {
            Some(removed) => {
                self.fire(ChangeEvent::removed(removed));
                true
            }
            None => false,
        }
    }

    /// Remove every value, firing one [`Clear`](ChangeKind::Clear) event per
    /// removed element.
    pub fn clear(&mut self) {
        let drained = std::mem::take(&mut self.values);
        for value in drained {
            self.fire(ChangeEvent::cleared(value));
        }
    }

    /// Reconstruct the contents as they were before `events` were applied.
    ///
    /// `events` must be the events fired by this set, in the order they were
    /// fired; they are undone newest first.
    pub fn original_state(&self, events: &[ChangeEvent<T>]) -> BTreeSet<T> {
        let mut state = self.values.clone();
        for event in events.iter().rev() {
            match event.kind {
                ChangeKind::Add => {
                    state.remove(&event.key);
                }
                ChangeKind::Remove | ChangeKind::Clear => {
                    let value = event.old_value.as_ref().unwrap_or(&event.key);
                    state.insert(value.clone());
                }
            }
        }
        state
    }

    fn fire(&self, event: ChangeEvent<T>) {
        self.dirty.mark();
        trace!(kind = %event.kind, listeners = self.listeners.len(), "tracked set changed");
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }
}

impl<T: Ord + Clone> Default for TrackedSet<T> {
    fn default() -> Self {
        Self::detached()
    }
}

impl<T: Ord + Clone> FromIterator<T> for TrackedSet<T> {
    /// Collect into a detached set without firing events.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::detached();
        for value in iter {
            set.insert_silent(value);
        }
        set
    }
}

impl<T: fmt::Debug> fmt::Debug for TrackedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedSet")
            .field("values", &self.values)
            .field("listeners", &self.listeners.len())
            .field("dirty", &self.dirty.is_dirty())
            .finish()
    }
}

impl<T: Serialize> Serialize for TrackedSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for TrackedSet<T>
where
    T: Deserialize<'de> + Ord + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = BTreeSet::<T>::deserialize(deserializer)?;
        Ok(values.into_iter().collect())
    }
}
