//! Types for the transfer manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during a tick.
///
/// None of these stop the loop; the affected step is retried next tick.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Debrid service error.
    #[error("debrid error: {0}")]
    Debrid(#[from] crate::debrid::DebridError),

    /// Local storage error.
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// Rejected configuration change.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// What one tick observed and decided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Another tick was in progress; nothing was done.
    pub skipped: bool,
    /// False when the transfer refresh failed.
    pub transfers_refreshed: bool,
    pub transfers_seen: usize,
    /// Errored transfers handed to the recovery matcher.
    pub errored_dispatched: usize,
    /// False when the downloads folder could not be resolved or listed.
    pub items_listed: bool,
    pub items_seen: usize,
    pub admitted: usize,
    /// Items already downloading.
    pub duplicates: usize,
    /// Items left for a later tick because the cap was reached.
    pub deferred: usize,
}

/// Current status of the transfer manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerStatus {
    /// Whether the poll loop is running.
    pub running: bool,
    /// Whether a tick is in progress.
    pub busy: bool,
    /// When the last tick finished.
    pub last_updated: Option<DateTime<Utc>>,
    pub active_downloads: usize,
    pub simultaneous_downloads: usize,
    pub poll_interval_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_status_default() {
        let status = ManagerStatus::default();
        assert!(!status.running);
        assert!(!status.busy);
        assert!(status.last_updated.is_none());
        assert_eq!(status.active_downloads, 0);
    }

    #[test]
    fn test_tick_report_serialization() {
        let report = TickReport {
            transfers_refreshed: true,
            items_listed: true,
            items_seen: 3,
            admitted: 2,
            deferred: 1,
            ..Default::default()
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["admitted"], 2);
        assert_eq!(json["deferred"], 1);
        assert_eq!(json["skipped"], false);
    }

    #[test]
    fn test_error_display() {
        let err = ManagerError::Debrid(crate::debrid::DebridError::Timeout);
        assert_eq!(err.to_string(), "debrid error: Request timeout");
    }
}
