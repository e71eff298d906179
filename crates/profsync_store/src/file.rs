//! File-based store for persistent state.

use crate::error::{StoreError, StoreResult};
use crate::store::DurableStore;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

/// A file-based key-value store.
///
/// Each key maps to one file under a root directory. Data survives process
/// restarts.
///
/// # Key encoding
///
/// Keys may contain `/` as a namespace separator; each `/` segment becomes
/// a directory level. Segments may only contain alphanumerics, `-`, `_`,
/// and `.` (but not `..`), so a key can never escape the root.
///
/// # Durability
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write never leaves a torn value.
///
/// # Example
///
/// ```no_run
/// use profsync_store::{DurableStore, FileStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("/var/lib/profsync")).unwrap();
/// store.set("queue/op-1", b"payload").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    // Serializes write-then-rename sequences against each other.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn open(root: &Path) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.into()));
        }
        let mut path = self.root.clone();
        for segment in key.split('/') {
            let ok = !segment.is_empty()
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
            if !ok {
                return Err(StoreError::InvalidKey(key.into()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn collect_keys(dir: &Path, prefix_path: &str, out: &mut Vec<String>) -> StoreResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = if prefix_path.is_empty() {
                name
            } else {
                format!("{prefix_path}/{name}")
            };
            if entry.file_type()?.is_dir() {
                Self::collect_keys(&entry.path(), &key, out)?;
            } else if !key.ends_with(".tmp") {
                out.push(key);
            }
        }
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        Self::collect_keys(&self.root, "", &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}
