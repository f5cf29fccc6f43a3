//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Transfer manager (poll ticks, admission decisions)
//! - Download pipelines (starts, completions, failures by stage, bytes)
//! - Error recovery (errored transfers handed back to consumers)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Transfer Manager Metrics
// =============================================================================

/// Poll ticks total by result.
pub static POLL_TICKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("debridarr_poll_ticks_total", "Total transfer manager ticks"),
        &["result"], // "ok", "transfers_failed", "listing_failed"
    )
    .unwrap()
});

/// Ready items deferred because the download cap was reached.
pub static DOWNLOADS_DEFERRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "debridarr_downloads_deferred_total",
        "Ready items deferred to a later tick at capacity",
    )
    .unwrap()
});

// =============================================================================
// Download Pipeline Metrics
// =============================================================================

/// Downloads started total.
pub static DOWNLOADS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("debridarr_downloads_started_total", "Total downloads started").unwrap()
});

/// Downloads completed total.
pub static DOWNLOADS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "debridarr_downloads_completed_total",
        "Total downloads extracted into the library",
    )
    .unwrap()
});

/// Downloads failed total by pipeline stage.
pub static DOWNLOADS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("debridarr_downloads_failed_total", "Total downloads that failed"),
        &["stage"], // "link", "scratch", "download", "extract", "cleanup"
    )
    .unwrap()
});

/// Archive bytes downloaded.
pub static BYTES_DOWNLOADED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "debridarr_bytes_downloaded_total",
        "Total archive bytes downloaded",
    )
    .unwrap()
});

/// Pipeline duration in seconds.
pub static DOWNLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "debridarr_download_duration_seconds",
            "Duration of download pipelines",
        )
        .buckets(vec![
            5.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0,
        ]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Remote deletions that failed after local materialization.
pub static REMOTE_CLEANUP_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "debridarr_remote_cleanup_failures_total",
        "Remote items left behind after a successful download",
    )
    .unwrap()
});

// =============================================================================
// Recovery Metrics
// =============================================================================

/// Errored transfers matched to a consumer.
pub static TRANSFERS_RECOVERED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "debridarr_transfers_recovered_total",
            "Errored transfers matched against consumer history",
        ),
        &["consumer"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Manager
        Box::new(POLL_TICKS.clone()),
        Box::new(DOWNLOADS_DEFERRED.clone()),
        // Downloads
        Box::new(DOWNLOADS_STARTED.clone()),
        Box::new(DOWNLOADS_COMPLETED.clone()),
        Box::new(DOWNLOADS_FAILED.clone()),
        Box::new(BYTES_DOWNLOADED.clone()),
        Box::new(DOWNLOAD_DURATION.clone()),
        Box::new(REMOTE_CLEANUP_FAILURES.clone()),
        // Recovery
        Box::new(TRANSFERS_RECOVERED.clone()),
    ]
}
