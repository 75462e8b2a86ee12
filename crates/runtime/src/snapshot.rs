//! Snapshot persistence.
//!
//! The engine emits a persist marker after every mutation batch; the
//! runner pulls the full snapshot from the state machine and hands it to
//! the store. A write failure is logged and the engine keeps running on
//! in-memory state.

use storypool_types::RoundSnapshot;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Where engine snapshots live.
pub trait SnapshotStore: Send + Sync + 'static {
    fn save(&self, snapshot: &RoundSnapshot) -> Result<(), SnapshotError>;

    /// Load the last saved snapshot; `None` means a fresh start.
    fn load(&self) -> Result<Option<RoundSnapshot>, SnapshotError>;
}

/// JSON file store with atomic replacement.
///
/// Writes to a sibling temp file and renames over the target, so a crash
/// mid-write leaves the previous snapshot intact.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &RoundSnapshot) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.tmp_path();
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<RoundSnapshot>, SnapshotError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
