use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::NodeId;

/// Identifier of one transaction within a sequence space.
///
/// A transaction is identified by the slot (`position`) it was assigned to
/// and the per-slot `sequence` number it received there. The optional
/// `owner` records which node's sequence space minted the id, so that a
/// retransmission request can be addressed to it.
///
/// Equality, hashing and ordering use `(position, sequence)` only. Two ids
/// with the same pair denote the same transaction whatever their owner tags
/// say.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTransactionId")]
pub struct TransactionId {
    owner: Option<NodeId>,
    position: u32,
    sequence: u64,
}

#[derive(Deserialize)]
struct RawTransactionId {
    owner: Option<NodeId>,
    position: u32,
    sequence: u64,
}

impl TryFrom<RawTransactionId> for TransactionId {
    type Error = TypeError;

    fn try_from(raw: RawTransactionId) -> Result<Self, TypeError> {
        Self::new(raw.owner, raw.position, raw.sequence)
    }
}

impl TransactionId {
    /// Create an id. Sequences start at 1; zero is rejected.
    pub fn new(owner: Option<NodeId>, position: u32, sequence: u64) -> Result<Self, TypeError> {
        if sequence == 0 {
            return Err(TypeError::ZeroSequence { position });
        }
        Ok(Self {
            owner,
            position,
            sequence,
        })
    }

    /// Create an id tagged with the node that minted it.
    pub fn owned(owner: NodeId, position: u32, sequence: u64) -> Result<Self, TypeError> {
        Self::new(Some(owner), position, sequence)
    }

    /// Create an id without an owner tag.
    pub fn unowned(position: u32, sequence: u64) -> Result<Self, TypeError> {
        Self::new(None, position, sequence)
    }

    pub fn owner(&self) -> Option<&NodeId> {
        self.owner.as_ref()
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Copy of this id carrying a different owner tag.
    pub fn with_owner(&self, owner: Option<NodeId>) -> Self {
        Self {
            owner,
            position: self.position,
            sequence: self.sequence,
        }
    }

    /// The `(position, sequence)` pair that identifies the transaction.
    pub fn key(&self) -> (u32, u64) {
        (self.position, self.sequence)
    }
}

impl PartialEq for TransactionId {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TransactionId {}

impl Hash for TransactionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for TransactionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TransactionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({self})")
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}:s{}", self.position, self.sequence)?;
        if let Some(owner) = &self.owner {
            write!(f, "@{owner}")?;
        }
        Ok(())
    }
}
