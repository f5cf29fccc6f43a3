//! Error types for local storage.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while materializing an archive locally.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to create a directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The download request failed or returned a non-success status.
    #[error("Download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Writing the downloaded archive failed.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive could not be read or unpacked.
    #[error("Failed to extract {archive}: {reason}")]
    ExtractionFailed { archive: PathBuf, reason: String },

    /// Removing a file or directory failed.
    #[error("Failed to remove {path}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn download_failed(url: &str, reason: impl ToString) -> Self {
        Self::DownloadFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction_failed(archive: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ExtractionFailed {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }
}
