//! Local storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for [`FsArchiveStore`](super::FsArchiveStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Scratch root; per-download directories are created beneath it.
    pub unzip_dir: PathBuf,
    /// Connect timeout for archive downloads, in seconds. The transfer itself
    /// is not time-limited.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl StorageConfig {
    pub fn new(unzip_dir: impl Into<PathBuf>) -> Self {
        Self {
            unzip_dir: unzip_dir.into(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    30
}
