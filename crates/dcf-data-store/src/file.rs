//! File-per-entry store.
//!
//! Each [`CacheKey`] maps to one file directly under the store root, named by
//! [`CacheKey::file_name`]. Writes are staged next to the target and renamed
//! into place, so a reader never observes a partially written artifact.

use dcf_data_core::{CacheKey, CacheStore, DataError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Store keeping one file per entry under a root directory.
///
/// There is no locking: concurrent writers to the same entry are
/// last-writer-wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns [`DataError::Cache`] if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            DataError::Cache(format!("failed to create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for `key`.
    #[must_use]
    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

impl CacheStore for FileStore {
    fn exists(&self, key: &CacheKey) -> bool {
        self.path(key).is_file()
    }

    #[instrument(skip(self), fields(key = %key))]
    fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let path = self.path(key);
        fs::read(&path)
            .map_err(|e| DataError::Cache(format!("failed to read {}: {e}", path.display())))
    }

    #[instrument(skip(self, bytes), fields(key = %key, len = bytes.len()))]
    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        let mut staged = StagedFile::create(&path)?;
        staged.write_all(bytes)?;
        staged.commit()?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn describe(&self, key: &CacheKey) -> String {
        self.path(key).display().to_string()
    }
}

/// A temporary `<name>.tmp` file that becomes `<name>` on commit.
///
/// Dropping it uncommitted closes the handle and removes the temporary file.
#[derive(Debug)]
struct StagedFile {
    file: Option<File>,
    tmp_path: PathBuf,
    path: PathBuf,
}

impl StagedFile {
    fn create(path: &Path) -> Result<Self> {
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let file = File::create(&tmp_path).map_err(|e| {
            DataError::Cache(format!("failed to create {}: {e}", tmp_path.display()))
        })?;
        Ok(Self {
            file: Some(file),
            tmp_path,
            path: path.to_path_buf(),
        })
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| DataError::Cache("staged file already closed".to_string()))?;
        file.write_all(bytes)
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_all())
            .map_err(|e| {
                DataError::Cache(format!("failed to write {}: {e}", self.tmp_path.display()))
            })
    }

    fn commit(mut self) -> Result<()> {
        // Close the handle before renaming.
        drop(self.file.take());
        fs::rename(&self.tmp_path, &self.path).map_err(|e| {
            DataError::Cache(format!("atomic rename to {} failed: {e}", self.path.display()))
        })?;
        self.tmp_path.clear();
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        drop(self.file.take());
        if !self.tmp_path.as_os_str().is_empty() {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}
