use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "needs persisting" marker.
///
/// Cloning yields a handle to the same flag. The owner of some state keeps
/// one handle and gives another to each tracked collection inside it; any
/// effective mutation of a collection marks the owner dirty, and the owner
/// clears the flag once it has persisted.
#[derive(Clone, Debug, Default)]
pub struct DirtyFlag {
    inner: Arc<AtomicBool>,
}

impl DirtyFlag {
    /// A fresh, clean flag.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        self.inner.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.inner.store(false, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.inner.swap(false, Ordering::AcqRel)
    }
}
