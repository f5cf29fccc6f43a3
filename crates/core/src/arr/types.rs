//! Types for library-manager consumers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur talking to a library manager.
#[derive(Debug, Error)]
pub enum ArrError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for ArrError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ArrError::Timeout
        } else if e.is_connect() {
            ArrError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            ArrError::InvalidResponse(e.to_string())
        } else {
            ArrError::Api(e.to_string())
        }
    }
}

/// A grab recorded in a library manager's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    pub source_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

/// A library manager the transfer manager can report failures to.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Display name for logging.
    fn name(&self) -> &str;

    /// Find the history record whose source title fuzzy-matches `candidate`.
    ///
    /// Returns the record id, or `None` when nothing matches.
    async fn history_contains(&self, candidate: &str) -> Result<Option<i64>, ArrError>;

    /// Mark a history record as failed, prompting the manager to look elsewhere.
    async fn mark_history_failed(&self, history_id: i64) -> Result<(), ArrError>;
}
