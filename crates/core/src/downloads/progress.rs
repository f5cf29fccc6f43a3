//! Byte-level progress for a running download.

use std::sync::atomic::{AtomicU64, Ordering};

/// Progress sink shared between a download stream and status readers.
#[derive(Debug, Default)]
pub struct DownloadProgress {
    downloaded: AtomicU64,
    /// 0 when unknown.
    total: AtomicU64,
}

impl DownloadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bytes` more transferred.
    pub fn add(&self, bytes: u64) {
        self.downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// Forget transferred bytes (a download restarting from scratch).
    pub fn reset(&self) {
        self.downloaded.store(0, Ordering::Relaxed);
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> Option<u64> {
        match self.total.load(Ordering::Relaxed) {
            0 => None,
            total => Some(total),
        }
    }

    /// Fraction complete (0.0 - 1.0), when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total()
            .map(|total| (self.downloaded() as f64 / total as f64).min(1.0))
    }
}
