use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of a node in the replicated store.
///
/// A `NodeId` names both the node itself and the sequence space it
/// coordinates: ids minted by a node's sequence manager carry its `NodeId`
/// as their owner tag, and status snapshots of that space are tagged with it.
/// Names are non-empty UTF-8 strings of at most [`NodeId::MAX_LEN`] bytes so
/// they fit the snapshot header's length prefix.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    name: String,
}

impl NodeId {
    /// Longest accepted name, in bytes.
    pub const MAX_LEN: usize = 255;

    /// Create a node id from a name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::EmptyNodeId);
        }
        if name.len() > Self::MAX_LEN {
            return Err(TypeError::NodeIdTooLong {
                len: name.len(),
                max: Self::MAX_LEN,
            });
        }
        Ok(Self { name })
    }

    /// Create an ephemeral (random) node id for tests and demos.
    pub fn ephemeral() -> Self {
        let suffix: u64 = rand::thread_rng().gen();
        Self {
            name: format!("node-{suffix:016x}"),
        }
    }

    /// The node name.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The node name as raw UTF-8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.name.as_bytes()
    }

    /// Short identifier for log lines (first 12 characters).
    pub fn short_id(&self) -> &str {
        match self.name.char_indices().nth(12) {
            Some((idx, _)) => &self.name[..idx],
            None => &self.name,
        }
    }
}

impl TryFrom<String> for NodeId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.name
    }
}

impl FromStr for NodeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.name)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
