//! Directory-based blob store for persistent storage.

use crate::error::StorageResult;
use crate::store::{validate_key, BlobStore};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A blob store that keeps one file per key inside a directory.
///
/// # Durability
///
/// `put` writes the new contents to a hidden temporary file, calls
/// `File::sync_all()` and then renames it over the target. A crash during the
/// write therefore leaves either the old or the new blob, never a torn one.
///
/// # Thread Safety
///
/// Writes are serialized by an internal lock; the store can be shared across
/// threads.
///
/// # Example
///
/// ```no_run
/// use stockroom_storage::{BlobStore, DirectoryBlobStore};
/// use std::path::Path;
///
/// let store = DirectoryBlobStore::open(Path::new("inventory")).unwrap();
/// store.put("items.json", b"[]").unwrap();
/// ```
#[derive(Debug)]
pub struct DirectoryBlobStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DirectoryBlobStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path backing `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid.
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!(".{key}.tmp"))
    }
}

impl BlobStore for DirectoryBlobStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let temp = self.temp_path_for(key);
        let _guard = self.write_lock.lock();

        if let Err(e) = write_and_rename(&temp, &path, data) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        // Make the rename itself durable where the platform allows it.
        if let Ok(dir) = File::open(&self.root) {
            let _ = dir.sync_all();
        }

        tracing::trace!(key, bytes = data.len(), "blob written");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

}

/// Writes `data` to `temp`, syncs it and renames it over `path`.
fn write_and_rename(temp: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp, path)
}
