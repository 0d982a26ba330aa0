//! On-disk index directory
//!
//! A directory holds one JSON snapshot file (`index.json`):
//! - format version
//! - generation, bumped by every successful writer flush
//! - every stored document, sorted by id
//!
//! Written atomically via temp + fsync + rename, so a reader either sees
//! the previous generation or the new one, never a torn file.

use scribe_core::{Document, ScribeError, ScribeResult};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Snapshot file name inside the index directory
pub const SNAPSHOT_FILE: &str = "index.json";

/// Current snapshot format version
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

/// Serializable contents of an index directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Commit generation; 0 means nothing was ever flushed
    pub generation: u64,
    /// Stored documents, each with an id
    pub documents: Vec<Document>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Handle to an index directory on disk
///
/// Cheap to clone; writers and searchers each keep their own copy.
#[derive(Debug, Clone)]
pub struct IndexDirectory {
    root: PathBuf,
}

impl IndexDirectory {
    /// Open `root`, creating it if it does not exist
    pub fn open(root: impl Into<PathBuf>) -> ScribeResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    /// Load the latest snapshot; an empty directory yields generation 0
    pub fn load(&self) -> ScribeResult<Snapshot> {
        let path = self.snapshot_path();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Snapshot {
                    version: SNAPSHOT_VERSION,
                    ..Snapshot::default()
                })
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ScribeError::index(format!(
                "unsupported index snapshot version {} in {}",
                snapshot.version,
                path.display()
            )));
        }
        Ok(snapshot)
    }

    /// Generation of the latest snapshot on disk
    pub fn generation(&self) -> ScribeResult<u64> {
        Ok(self.load()?.generation)
    }

    /// Atomically replace the snapshot on disk
    pub fn store(&self, snapshot: &Snapshot) -> ScribeResult<()> {
        let path = self.snapshot_path();
        let payload = serde_json::to_vec(snapshot)?;

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}
