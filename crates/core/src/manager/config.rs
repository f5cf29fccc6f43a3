//! Transfer manager configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the transfer manager (`[transfers]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferManagerConfig {
    /// How often to poll the debrid service (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum number of download pipelines running at once.
    /// Ready items beyond the cap wait for a later tick.
    #[serde(default = "default_simultaneous_downloads")]
    pub simultaneous_downloads: usize,

    /// Library directory archives are extracted into.
    pub downloads_dir: PathBuf,

    /// Scratch root for downloaded archives. Cleared on startup.
    pub unzip_dir: PathBuf,
}

fn default_poll_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_simultaneous_downloads() -> usize {
    5
}

impl TransferManagerConfig {
    pub fn new(downloads_dir: impl Into<PathBuf>, unzip_dir: impl Into<PathBuf>) -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            simultaneous_downloads: default_simultaneous_downloads(),
            downloads_dir: downloads_dir.into(),
            unzip_dir: unzip_dir.into(),
        }
    }

    /// True when either directory contains the other. Clearing such a
    /// scratch root would delete library content.
    pub fn scratch_overlaps_library(&self) -> bool {
        self.unzip_dir.starts_with(&self.downloads_dir)
            || self.downloads_dir.starts_with(&self.unzip_dir)
    }
}
