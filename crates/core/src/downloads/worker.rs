//! Per-item download pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::debrid::{DebridClient, DebridError, Item, ItemKind};
use crate::metrics;
use crate::storage::{archive_file_name, ArchiveStore, StorageError};

use super::registry::DownloadSlot;

/// Failure of one pipeline step. Every variant aborts the remaining steps.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The item kind has no link generator. No network call was made.
    #[error("unsupported item kind: {0}")]
    UnsupportedKind(String),

    #[error("failed to resolve download link: {0}")]
    Link(#[source] DebridError),

    #[error("failed to allocate scratch directory: {0}")]
    Scratch(#[source] StorageError),

    #[error("download failed: {0}")]
    Download(#[source] StorageError),

    #[error("extraction failed: {0}")]
    Extract(#[source] StorageError),

    #[error("failed to remove archive: {0}")]
    Cleanup(#[source] StorageError),
}

impl WorkerError {
    /// Pipeline step that failed, used for logs and metric labels.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::UnsupportedKind(_) | WorkerError::Link(_) => "link",
            WorkerError::Scratch(_) => "scratch",
            WorkerError::Download(_) => "download",
            WorkerError::Extract(_) => "extract",
            WorkerError::Cleanup(_) => "cleanup",
        }
    }
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub bytes_downloaded: u64,
    pub files_extracted: usize,
    /// False when neither folder nor file deletion removed the remote item.
    pub remote_removed: bool,
}

/// Materializes ready remote items into the library directory.
#[derive(Clone)]
pub struct DownloadWorker {
    debrid: Arc<dyn DebridClient>,
    store: Arc<dyn ArchiveStore>,
    target_dir: PathBuf,
}

impl DownloadWorker {
    pub fn new(
        debrid: Arc<dyn DebridClient>,
        store: Arc<dyn ArchiveStore>,
        target_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            debrid,
            store,
            target_dir: target_dir.into(),
        }
    }

    /// Run the pipeline for `item` as a detached task.
    ///
    /// There is no join handle: the task runs until it finishes on its own,
    /// and nothing cancels it.
    pub fn spawn(&self, item: Item, slot: DownloadSlot) {
        let worker = self.clone();
        tokio::spawn(async move {
            let _ = worker.run(item, slot).await;
        });
    }

    /// Run the pipeline for `item`, consuming its registry slot.
    ///
    /// The slot is released when this returns, whichever step ended the run.
    pub async fn run(
        &self,
        item: Item,
        slot: DownloadSlot,
    ) -> Result<DownloadOutcome, WorkerError> {
        let started = Instant::now();
        metrics::DOWNLOADS_STARTED.inc();
        info!(item = %item.name, id = %item.id, kind = item.kind.as_str(), "Starting download");

        let result = self.materialize(&item, &slot).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(outcome) => {
                metrics::DOWNLOADS_COMPLETED.inc();
                metrics::DOWNLOAD_DURATION
                    .with_label_values(&["success"])
                    .observe(elapsed);
                info!(
                    item = %item.name,
                    bytes = outcome.bytes_downloaded,
                    files = outcome.files_extracted,
                    "Download complete"
                );
            }
            Err(e) => {
                metrics::DOWNLOADS_FAILED
                    .with_label_values(&[e.stage()])
                    .inc();
                metrics::DOWNLOAD_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                error!(item = %item.name, stage = e.stage(), error = %e, "Download failed");
            }
        }

        drop(slot);
        result
    }

    async fn materialize(
        &self,
        item: &Item,
        slot: &DownloadSlot,
    ) -> Result<DownloadOutcome, WorkerError> {
        let url = self.resolve_link(item).await?;

        let scratch = self
            .store
            .create_scratch_dir()
            .await
            .map_err(WorkerError::Scratch)?;
        let archive = scratch.join(archive_file_name(&url));

        debug!(item = %item.name, archive = %archive.display(), "Downloading archive");
        let bytes_downloaded = self
            .store
            .stream_download(&url, &archive, slot.progress())
            .await
            .map_err(WorkerError::Download)?;
        metrics::BYTES_DOWNLOADED.inc_by(bytes_downloaded);

        debug!(item = %item.name, target = %self.target_dir.display(), "Extracting archive");
        let files_extracted = self
            .store
            .extract(&archive, &self.target_dir)
            .await
            .map_err(WorkerError::Extract)?;

        self.store
            .remove_file(&archive)
            .await
            .map_err(WorkerError::Cleanup)?;
        if let Err(e) = self.store.remove_dir(&scratch).await {
            debug!(path = %scratch.display(), error = %e, "Scratch directory left behind");
        }

        let remote_removed = self.remove_remote(item).await;

        Ok(DownloadOutcome {
            bytes_downloaded,
            files_extracted,
            remote_removed,
        })
    }

    async fn resolve_link(&self, item: &Item) -> Result<String, WorkerError> {
        let link = match item.kind {
            ItemKind::File => self.debrid.generate_file_link(&item.id).await,
            ItemKind::Folder => self.debrid.generate_folder_link(&item.id).await,
            ItemKind::Unknown => {
                return Err(WorkerError::UnsupportedKind(item.kind.as_str().to_string()))
            }
        };
        link.map_err(WorkerError::Link)
    }

    /// Delete the source item remotely: folder first, then file, whatever its
    /// recorded kind.
    async fn remove_remote(&self, item: &Item) -> bool {
        let folder_err = match self.debrid.delete_folder(&item.id).await {
            Ok(()) => return true,
            Err(e) => e,
        };
        debug!(item = %item.name, error = %folder_err, "Folder delete failed, trying file delete");

        match self.debrid.delete_file(&item.id).await {
            Ok(()) => true,
            Err(file_err) => {
                metrics::REMOTE_CLEANUP_FAILURES.inc();
                error!(
                    item = %item.name,
                    id = %item.id,
                    folder_error = %folder_err,
                    file_error = %file_err,
                    "Could not remove remote item after download"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for DownloadWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadWorker")
            .field("debrid", &self.debrid.name())
            .field("store", &self.store.name())
            .field("target_dir", &self.target_dir)
            .finish()
    }
}
