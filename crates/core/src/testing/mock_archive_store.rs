//! Mock archive store for testing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::downloads::DownloadProgress;
use crate::storage::{ArchiveStore, StorageError};

/// A recorded store operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    CreateScratchDir(PathBuf),
    Download { url: String, dest: PathBuf },
    Extract { archive: PathBuf, dest_dir: PathBuf },
    RemoveFile(PathBuf),
    RemoveDir(PathBuf),
    SetScratchRoot(PathBuf),
    ClearScratchRoot(PathBuf),
}

#[derive(Debug)]
struct MockStoreState {
    root: PathBuf,
    operations: Vec<StoreOp>,
    failing: HashSet<String>,
    scratch_counter: u32,
    archive_size: u64,
    files_per_archive: usize,
}

/// Mock implementation of the ArchiveStore trait.
///
/// Touches no disk. Records every operation, can fail any of them, and can
/// hold downloads open so tests observe workers mid-flight.
#[derive(Debug)]
pub struct MockArchiveStore {
    state: Mutex<MockStoreState>,
    paused: watch::Sender<bool>,
}

impl Default for MockArchiveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArchiveStore {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            state: Mutex::new(MockStoreState {
                root: PathBuf::from("/mock/unzip"),
                operations: Vec::new(),
                failing: HashSet::new(),
                scratch_counter: 0,
                archive_size: 1024,
                files_per_archive: 1,
            }),
            paused,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockStoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call to `operation` fail until cleared.
    pub fn fail_on(&self, operation: &str) {
        self.state().failing.insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// Bytes reported per download.
    pub fn set_archive_size(&self, bytes: u64) {
        self.state().archive_size = bytes;
    }

    pub fn set_files_per_archive(&self, files: usize) {
        self.state().files_per_archive = files;
    }

    /// Block downloads until [`resume_downloads`](Self::resume_downloads).
    pub fn pause_downloads(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume_downloads(&self) {
        self.paused.send_replace(false);
    }

    pub fn operations(&self) -> Vec<StoreOp> {
        self.state().operations.clone()
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.state().root.clone()
    }

    fn record(&self, op: StoreOp, operation: &str) -> bool {
        let mut state = self.state();
        state.operations.push(op);
        state.failing.contains(operation)
    }
}

fn injected(path: &Path) -> std::io::Error {
    std::io::Error::other(format!("injected failure for {}", path.display()))
}

#[async_trait]
impl ArchiveStore for MockArchiveStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_scratch_dir(&self) -> Result<PathBuf, StorageError> {
        let dir = {
            let mut state = self.state();
            state.scratch_counter += 1;
            state.root.join(format!("scratch-{}", state.scratch_counter))
        };
        if self.record(StoreOp::CreateScratchDir(dir.clone()), "create_scratch_dir") {
            return Err(StorageError::DirectoryCreationFailed {
                source: injected(&dir),
                path: dir,
            });
        }
        Ok(dir)
    }

    async fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        progress: &DownloadProgress,
    ) -> Result<u64, StorageError> {
        let mut paused = self.paused.subscribe();
        // The sender lives as long as self, so this only returns on resume.
        let _ = paused.wait_for(|paused| !*paused).await;

        let op = StoreOp::Download {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        };
        if self.record(op, "stream_download") {
            return Err(StorageError::download_failed(url, "injected failure"));
        }

        let size = self.state().archive_size;
        progress.set_total(size);
        progress.add(size);
        Ok(size)
    }

    async fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<usize, StorageError> {
        let op = StoreOp::Extract {
            archive: archive.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
        };
        if self.record(op, "extract") {
            return Err(StorageError::extraction_failed(archive, "injected failure"));
        }
        Ok(self.state().files_per_archive)
    }

    async fn remove_file(&self, path: &Path) -> Result<(), StorageError> {
        if self.record(StoreOp::RemoveFile(path.to_path_buf()), "remove_file") {
            return Err(StorageError::RemoveFailed {
                path: path.to_path_buf(),
                source: injected(path),
            });
        }
        Ok(())
    }

    async fn remove_dir(&self, path: &Path) -> Result<(), StorageError> {
        if self.record(StoreOp::RemoveDir(path.to_path_buf()), "remove_dir") {
            return Err(StorageError::RemoveFailed {
                path: path.to_path_buf(),
                source: injected(path),
            });
        }
        Ok(())
    }

    fn set_scratch_root(&self, root: PathBuf) {
        let mut state = self.state();
        state.operations.push(StoreOp::SetScratchRoot(root.clone()));
        state.root = root;
    }

    async fn clear_scratch_root(&self) -> Result<(), StorageError> {
        let root = self.scratch_root();
        if self.record(StoreOp::ClearScratchRoot(root.clone()), "clear_scratch_root") {
            return Err(StorageError::RemoveFailed {
                source: injected(&root),
                path: root,
            });
        }
        Ok(())
    }
}
