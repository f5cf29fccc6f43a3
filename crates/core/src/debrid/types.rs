//! Types for debrid client operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during debrid client operations.
#[derive(Debug, Error)]
pub enum DebridError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for DebridError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DebridError::Timeout
        } else if e.is_connect() {
            DebridError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            DebridError::InvalidResponse(e.to_string())
        } else {
            DebridError::Api(e.to_string())
        }
    }
}

/// Status of a remote transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Waiting,
    Queued,
    Running,
    Seeding,
    Finished,
    Error,
    Timeout,
    Banned,
    Deleted,
    #[serde(other)]
    Unknown,
}

impl TransferStatus {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Waiting => "waiting",
            TransferStatus::Queued => "queued",
            TransferStatus::Running => "running",
            TransferStatus::Seeding => "seeding",
            TransferStatus::Finished => "finished",
            TransferStatus::Error => "error",
            TransferStatus::Timeout => "timeout",
            TransferStatus::Banned => "banned",
            TransferStatus::Deleted => "deleted",
            TransferStatus::Unknown => "unknown",
        }
    }
}

/// A remote job fetching content into cloud storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub name: String,
    pub status: TransferStatus,
    /// Service-provided status message (error reason, progress text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Progress (0.0 - 1.0), when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Source kind as reported by the service (e.g. torrent, nzb).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Transfer {
    pub fn is_errored(&self) -> bool {
        self.status == TransferStatus::Error
    }
}

/// Kind of a cloud storage entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    File,
    Folder,
    #[serde(other)]
    Unknown,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Folder => "folder",
            ItemKind::Unknown => "unknown",
        }
    }
}

/// A cloud storage entry ready for local download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            size_bytes: None,
        }
    }
}

/// Trait for debrid service backends.
#[async_trait]
pub trait DebridClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List all remote transfers.
    async fn list_transfers(&self) -> Result<Vec<Transfer>, DebridError>;

    /// Set the status of a remote transfer.
    async fn update_transfer_status(
        &self,
        transfer_id: &str,
        status: TransferStatus,
    ) -> Result<(), DebridError>;

    /// Delete a remote transfer.
    async fn delete_transfer(&self, transfer_id: &str) -> Result<(), DebridError>;

    /// List the entries of a folder (`None` lists the root).
    async fn list_folder(&self, folder_id: Option<&str>) -> Result<Vec<Item>, DebridError>;

    /// Generate a download link for a single file.
    async fn generate_file_link(&self, item_id: &str) -> Result<String, DebridError>;

    /// Generate a zipped download link for a folder.
    async fn generate_folder_link(&self, item_id: &str) -> Result<String, DebridError>;

    /// Delete a folder and its contents.
    async fn delete_folder(&self, folder_id: &str) -> Result<(), DebridError>;

    /// Delete a single file.
    async fn delete_file(&self, file_id: &str) -> Result<(), DebridError>;

    /// Resolve the id of the folder completed downloads land in.
    async fn resolve_downloads_folder_id(&self) -> Result<String, DebridError>;
}
