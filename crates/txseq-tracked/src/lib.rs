//! Change-tracked collections for txseq.
//!
//! A tracked collection reports every effective mutation twice: it marks the
//! [`DirtyFlag`] of whatever owns it, and it hands a structured
//! [`ChangeEvent`] to each registered listener. Replaying the recorded events
//! backwards reconstructs the contents as they were before the changes.
//!
//! # Key Types
//!
//! - [`TrackedSet`] -- An ordered set that emits change events
//! - [`ChangeEvent`] / [`ChangeKind`] -- One effective mutation
//! - [`DirtyFlag`] -- Shared "needs persisting" capability
//! - [`ListenerId`] -- Handle for unregistering a listener

pub mod dirty;
pub mod event;
pub mod set;

pub use dirty::DirtyFlag;
pub use event::{ChangeEvent, ChangeKind, ListenerId};
pub use set::TrackedSet;
