//! Status persistence.
//!
//! Both stores hold the encoded snapshot bytes, so whatever is loaded has
//! passed the same checksum and length validation as a snapshot received
//! from a peer.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use txseq_sequence::SequenceStatus;

use crate::config::{Durability, ReconcileConfig};
use crate::error::SyncResult;
use crate::transport::StatusStore;

/// Keeps the status in a single file.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a crash mid-write leaves either the old or the new snapshot in place,
/// never a torn one.
#[derive(Clone, Debug)]
pub struct FileStatusStore {
    path: PathBuf,
    durability: Durability,
}

impl FileStatusStore {
    pub fn new(path: impl Into<PathBuf>, durability: Durability) -> Self {
        Self {
            path: path.into(),
            durability,
        }
    }

    /// Store at `config.status_path` with `config.durability`.
    pub fn from_config(config: &ReconcileConfig) -> Self {
        Self::new(&config.status_path, config.durability)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn durability(&self) -> Durability {
        self.durability
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn persist(&self, status: &SequenceStatus) -> SyncResult<()> {
        let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent).await?;
        }

        let bytes = status.store();
        let tmp = self.temp_path();
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        if self.durability == Durability::EveryWrite {
            file.sync_all().await?;
        }
        drop(file);

        fs::rename(&tmp, &self.path).await?;
        if self.durability == Durability::EveryWrite {
            if let Some(parent) = parent {
                fs::File::open(parent).await?.sync_all().await?;
            }
        }

        debug!(path = %self.path.display(), len = bytes.len(), "status persisted");
        Ok(())
    }

    async fn load(&self) -> SyncResult<Option<SequenceStatus>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let status = SequenceStatus::read(&bytes)?;
        debug!(path = %self.path.display(), owner = %status.owner(), "status loaded");
        Ok(Some(status))
    }
}

/// In-memory status store for tests and ephemeral nodes.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    encoded: Mutex<Option<Vec<u8>>>,
    writes: Mutex<usize>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `persist` calls so far.
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored bytes verbatim.
    pub fn set_raw(&self, bytes: Vec<u8>) {
        *self.encoded.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes);
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn persist(&self, status: &SequenceStatus) -> SyncResult<()> {
        self.set_raw(status.store());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    async fn load(&self) -> SyncResult<Option<SequenceStatus>> {
        let encoded = self
            .encoded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match encoded {
            Some(bytes) => Ok(Some(SequenceStatus::read(&bytes)?)),
            None => Ok(None),
        }
    }
}
