//! Transfer manager API handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use debridarr_core::{DownloadSnapshot, ManagerStatus, Transfer};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Last transfer listing seen by the manager
#[derive(Debug, Serialize)]
pub struct TransfersResponse {
    pub transfers: Vec<Transfer>,
    pub count: usize,
}

/// Downloads currently in flight
#[derive(Debug, Serialize)]
pub struct DownloadsResponse {
    pub downloads: Vec<DownloadSnapshot>,
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get transfer manager status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ManagerStatus> {
    Json(state.manager().status())
}

/// List remote transfers
pub async fn list_transfers(State(state): State<Arc<AppState>>) -> Json<TransfersResponse> {
    let transfers = state.manager().transfers().await;
    Json(TransfersResponse {
        count: transfers.len(),
        transfers,
    })
}

/// List in-flight downloads
pub async fn list_downloads(State(state): State<Arc<AppState>>) -> Json<DownloadsResponse> {
    let downloads = state.manager().downloads();
    Json(DownloadsResponse {
        count: downloads.len(),
        downloads,
    })
}
