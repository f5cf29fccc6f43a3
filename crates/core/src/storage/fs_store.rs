//! File system archive store implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::StorageConfig;
use super::error::StorageError;
use super::traits::ArchiveStore;
use crate::downloads::DownloadProgress;

/// Fallback archive name when the link has no usable path segment.
const DEFAULT_ARCHIVE_NAME: &str = "download.zip";

/// Local filesystem store downloading over HTTP and unpacking zip archives.
pub struct FsArchiveStore {
    client: Client,
    root: RwLock<PathBuf>,
}

impl FsArchiveStore {
    /// Creates a new store with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            root: RwLock::new(config.unzip_dir),
        }
    }

    /// Current scratch root.
    pub fn scratch_root(&self) -> PathBuf {
        self.root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Streams the response body to `file`, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
    progress: &DownloadProgress,
) -> Result<u64, StorageError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StorageError::download_failed(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| StorageError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        bytes_written += chunk.len() as u64;
        progress.add(chunk.len() as u64);
    }

    writer.flush().await.map_err(|e| StorageError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(bytes_written)
}

/// Unpack a zip archive, skipping entries whose paths escape `dest_dir`.
fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize, StorageError> {
    let file = fs::File::open(archive_path)
        .map_err(|e| StorageError::extraction_failed(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| StorageError::extraction_failed(archive_path, e))?;

    fs::create_dir_all(dest_dir).map_err(|e| StorageError::DirectoryCreationFailed {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let mut files_written = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| StorageError::extraction_failed(archive_path, e))?;

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(entry = entry.name(), "Skipping archive entry with unsafe path");
            continue;
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| StorageError::DirectoryCreationFailed {
                path: out_path.clone(),
                source: e,
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut out = fs::File::create(&out_path).map_err(|e| StorageError::WriteFailed {
            path: out_path.clone(),
            source: e,
        })?;
        io::copy(&mut entry, &mut out).map_err(|e| StorageError::WriteFailed {
            path: out_path.clone(),
            source: e,
        })?;
        files_written += 1;
    }

    Ok(files_written)
}

/// File name for the archive behind `url`: its last path segment, decoded.
pub fn archive_file_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(&segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or(segment)
                .replace(['/', '\\'], "_")
        })
        .filter(|name| name != "." && name != "..")
        .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string())
}

#[async_trait]
impl ArchiveStore for FsArchiveStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn create_scratch_dir(&self) -> Result<PathBuf, StorageError> {
        let dir = self.scratch_root().join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::DirectoryCreationFailed {
                path: dir.clone(),
                source: e,
            })?;
        Ok(dir)
    }

    async fn stream_download(
        &self,
        url: &str,
        dest: &Path,
        progress: &DownloadProgress,
    ) -> Result<u64, StorageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::download_failed(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::download_failed(url, format!("HTTP {}", status)));
        }

        progress.reset();
        if let Some(len) = response.content_length() {
            progress.set_total(len);
        }

        let file = File::create(dest)
            .await
            .map_err(|e| StorageError::WriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;

        let result = stream_to_file(file, response, url, dest, progress).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(dest).await {
                debug!(path = %dest.display(), error = %e, "Could not remove partial download");
            }
        }
        result
    }

    async fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<usize, StorageError> {
        let archive = archive.to_path_buf();
        let dest_dir = dest_dir.to_path_buf();
        let archive_for_err = archive.clone();

        tokio::task::spawn_blocking(move || extract_zip(&archive, &dest_dir))
            .await
            .map_err(|e| StorageError::extraction_failed(archive_for_err, e))?
    }

    async fn remove_file(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| StorageError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    async fn remove_dir(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::remove_dir(path)
            .await
            .map_err(|e| StorageError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn set_scratch_root(&self, root: PathBuf) {
        *self.root.write().unwrap_or_else(PoisonError::into_inner) = root;
    }

    async fn clear_scratch_root(&self) -> Result<(), StorageError> {
        let root = self.scratch_root();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::DirectoryCreationFailed {
                path: root.clone(),
                source: e,
            })?;

        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let removal = if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            removal.map_err(|e| StorageError::RemoveFailed { path, source: e })?;
        }

        debug!(root = %root.display(), "Cleared scratch root");
        Ok(())
    }
}
