//! Foundation types for txseq.
//!
//! This crate provides the identity types shared by every other txseq crate:
//! the name of a node (which doubles as the name of the sequence space that
//! node coordinates) and the identifier minted for every in-flight
//! transaction.
//!
//! # Key Types
//!
//! - [`NodeId`] -- Name of a node / sequence space
//! - [`TransactionId`] -- `(position, sequence)` pair with an optional owner tag

pub mod error;
pub mod identity;
pub mod transaction;

pub use error::TypeError;
pub use identity::NodeId;
pub use transaction::TransactionId;
