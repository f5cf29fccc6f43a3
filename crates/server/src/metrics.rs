//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the debridarr server:
//! - HTTP request metrics (latency, counts)
//! - Transfer manager status (collected dynamically)
//! - Remote transfers by status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "debridarr_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("debridarr_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "debridarr_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Transfer Manager Metrics
// =============================================================================

/// Whether the poll loop is running (1) or not (0).
pub static MANAGER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "debridarr_manager_running",
        "Whether the transfer manager loop is running",
    )
    .unwrap()
});

/// Download pipelines currently in flight.
pub static DOWNLOADS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "debridarr_downloads_active",
        "Number of download pipelines in flight",
    )
    .unwrap()
});

/// Remote transfers by status, from the last listing.
pub static TRANSFERS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "debridarr_transfers_by_status",
            "Remote transfers by status in the last listing",
        ),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Transfer manager
    registry
        .register(Box::new(MANAGER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(DOWNLOADS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(TRANSFERS_BY_STATUS.clone()))
        .unwrap();

    // Core metrics (manager, pipelines, recovery)
    for metric in debridarr_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the transfer manager.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let manager = state.manager();

    let status = manager.status();
    MANAGER_RUNNING.set(if status.running { 1 } else { 0 });
    DOWNLOADS_ACTIVE.set(status.active_downloads as i64);

    TRANSFERS_BY_STATUS.reset();
    for transfer in manager.transfers().await {
        TRANSFERS_BY_STATUS
            .with_label_values(&[transfer.status.as_str()])
            .inc();
    }
}
