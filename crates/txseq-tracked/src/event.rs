use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of mutation a [`ChangeEvent`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A value was inserted.
    Add,
    /// A single value was removed.
    Remove,
    /// A value was removed as part of clearing the collection.
    Clear,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Remove => f.write_str("remove"),
            Self::Clear => f.write_str("clear"),
        }
    }
}

/// One effective mutation of a tracked collection.
///
/// For sets the key is the value itself. `old_value` is what the entry held
/// before the change (`None` for an add), `new_value` what it holds after
/// (`None` for a removal).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent<T> {
    pub kind: ChangeKind,
    pub key: T,
    pub old_value: Option<T>,
    pub new_value: Option<T>,
}

impl<T: Clone> ChangeEvent<T> {
    pub fn added(value: T) -> Self {
        Self {
            kind: ChangeKind::Add,
            key: value.clone(),
            old_value: None,
            new_value: Some(value),
        }
    }

    pub fn removed(value: T) -> Self {
        Self {
            kind: ChangeKind::Remove,
            key: value.clone(),
            old_value: Some(value),
            new_value: None,
        }
    }

    pub fn cleared(value: T) -> Self {
        Self {
            kind: ChangeKind::Clear,
            key: value.clone(),
            old_value: Some(value),
            new_value: None,
        }
    }
}

/// Handle returned when registering a listener, used to unregister it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);
