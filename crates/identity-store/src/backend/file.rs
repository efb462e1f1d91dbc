//! Persistent key-value store on the filesystem.
//!
//! Each key is stored as a single file holding the raw value:
//!
//! ```text
//! {base_dir}/
//! ├── emails.json
//! ├── siteInfo.json
//! ├── loggedIn.json
//! └── ...
//! ```
//!
//! Writes go to a uniquely named sibling temp file which is then renamed
//! into place, so a concurrent reader never sees a partial value and racing
//! writers never share a temp file. There is no cross-process locking; the
//! last writer wins.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};

use super::KeyValueStore;

const VALUE_EXTENSION: &str = "json";

/// Filesystem-backed [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new `FileStore` rooted at `base_dir`.
    ///
    /// The directory and any missing parents are created if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Directory holding the value files.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Build the path for `key`, rejecting keys that could escape the directory.
    fn value_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Backend(format!("invalid storage key: {key:?}")));
        }
        Ok(self.base_dir.join(format!("{key}.{VALUE_EXTENSION}")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.value_path(key)?;
        write_atomic(&path, value.as_bytes())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.value_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
