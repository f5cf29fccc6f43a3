//! Trait definitions for the storage module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::StorageError;
use crate::downloads::DownloadProgress;

/// Local filesystem and archive operations used by the download pipeline.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Allocate a fresh, empty scratch directory for one download.
    async fn create_scratch_dir(&self) -> Result<PathBuf, StorageError>;

    /// Stream `url` into `dest`, reporting transferred bytes to `progress`.
    ///
    /// Returns the number of bytes written.
    async fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        progress: &DownloadProgress,
    ) -> Result<u64, StorageError>;

    /// Unpack `archive` into `dest_dir`. Returns the number of files written.
    async fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<usize, StorageError>;

    /// Delete a single file.
    async fn remove_file(&self, path: &Path) -> Result<(), StorageError>;

    /// Delete a directory if it is empty.
    async fn remove_dir(&self, path: &Path) -> Result<(), StorageError>;

    /// Point the store at a different scratch root.
    fn set_scratch_root(&self, root: PathBuf);

    /// Remove everything beneath the scratch root.
    async fn clear_scratch_root(&self) -> Result<(), StorageError>;
}
