//! Generated-file store.
//!
//! The per-request output file is kept behind a pluggable collaborator
//! (put bytes, get by id, expire after a TTL) so the pipeline stays
//! testable without touching the real scratch directory. Identifiers are
//! fresh UUIDs, collision-free across concurrent requests.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// A stored file handed back on download.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Abstract store for generated output files.
pub trait FileStore: Send + Sync {
    /// Store bytes under a fresh unique identifier and return it.
    fn put(&self, bytes: &[u8], extension: &str) -> StorageResult<String>;

    /// Fetch a previously stored file. Unknown or expired ids are
    /// [`StorageError::NotFound`].
    fn get(&self, id: &str) -> StorageResult<StoredFile>;
}

/// Disk-backed store over a scratch directory.
///
/// Files expire `ttl` after creation; expired files are purged
/// opportunistically on each access, so no background task or shared
/// mutable state is needed.
pub struct DiskStore {
    dir: PathBuf,
    ttl: Duration,
}

impl DiskStore {
    /// Create a store over the given directory, creating it if needed.
    /// A zero TTL disables expiry.
    pub fn new(dir: impl AsRef<Path>, ttl: Duration) -> StorageResult<Self> {
        let dir = PathBuf::from(dir.as_ref());
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    fn path_for(&self, id: &str) -> StorageResult<PathBuf> {
        // Ids are generated here and never contain path components; reject
        // anything else outright so a crafted download id cannot escape the
        // scratch directory.
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !id.contains("..");
        if !valid {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(self.dir.join(id))
    }

    fn is_expired(&self, path: &Path) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        let Ok(meta) = fs::metadata(path) else {
            return true;
        };
        let created = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        created
            .elapsed()
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }

    /// Remove every expired file in the scratch directory.
    fn purge_expired(&self) {
        if self.ttl.is_zero() {
            return;
        }
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && self.is_expired(&path) {
                let _ = fs::remove_file(&path);
            }
        }
    }
}

impl FileStore for DiskStore {
    fn put(&self, bytes: &[u8], extension: &str) -> StorageResult<String> {
        self.purge_expired();

        let id = format!("restructured_{}.{}", Uuid::new_v4(), extension);
        let path = self.path_for(&id)?;
        fs::write(&path, bytes)?;
        Ok(id)
    }

    fn get(&self, id: &str) -> StorageResult<StoredFile> {
        let path = self.path_for(id)?;
        if !path.is_file() || self.is_expired(&path) {
            if path.is_file() {
                let _ = fs::remove_file(&path);
            }
            return Err(StorageError::NotFound(id.to_string()));
        }
        let bytes = fs::read(&path)?;
        Ok(StoredFile {
            bytes,
            filename: id.to_string(),
        })
    }
}
