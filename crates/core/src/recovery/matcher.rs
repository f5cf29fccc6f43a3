//! Error recovery matcher.
//!
//! An errored transfer usually means a release a library manager grabbed
//! cannot be fetched. Finding the manager that grabbed it and marking the
//! grab failed makes that manager search for another release.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::arr::Consumer;
use crate::debrid::{DebridClient, Transfer};
use crate::metrics;

/// What the matcher did with one errored transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// No consumer's history holds the transfer name; nothing was touched.
    NoMatch,
    /// `consumer` owns the transfer. Both follow-up actions are best-effort.
    Recovered {
        consumer: String,
        history_id: i64,
        marked_failed: bool,
        transfer_deleted: bool,
    },
}

/// Finds the consumer owning an errored transfer and hands the failure back.
pub struct ErrorRecoveryMatcher {
    consumers: Vec<Arc<dyn Consumer>>,
    debrid: Arc<dyn DebridClient>,
}

impl ErrorRecoveryMatcher {
    /// Consumers are consulted in the given order; the first match wins.
    pub fn new(consumers: Vec<Arc<dyn Consumer>>, debrid: Arc<dyn DebridClient>) -> Self {
        Self { consumers, debrid }
    }

    /// Names of the consumers, in lookup order.
    pub fn consumer_names(&self) -> Vec<String> {
        self.consumers.iter().map(|c| c.name().to_string()).collect()
    }

    /// Run [`recover`](Self::recover) as a detached task.
    pub fn spawn_recover(self: &Arc<Self>, transfer: Transfer) {
        let matcher = Arc::clone(self);
        tokio::spawn(async move {
            matcher.recover(&transfer).await;
        });
    }

    pub async fn recover(&self, transfer: &Transfer) -> RecoveryOutcome {
        let Some((consumer, history_id)) = self.find_owner(&transfer.name).await else {
            debug!(transfer = %transfer.name, "No consumer owns errored transfer");
            return RecoveryOutcome::NoMatch;
        };

        info!(
            transfer = %transfer.name,
            consumer = consumer.name(),
            history_id,
            "Errored transfer matched consumer history"
        );
        metrics::TRANSFERS_RECOVERED
            .with_label_values(&[consumer.name()])
            .inc();

        let marked_failed = match consumer.mark_history_failed(history_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    consumer = consumer.name(),
                    history_id,
                    error = %e,
                    "Failed to mark history record failed"
                );
                false
            }
        };

        let transfer_deleted = match self.debrid.delete_transfer(&transfer.id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(transfer = %transfer.name, id = %transfer.id, error = %e, "Failed to delete errored transfer");
                false
            }
        };

        RecoveryOutcome::Recovered {
            consumer: consumer.name().to_string(),
            history_id,
            marked_failed,
            transfer_deleted,
        }
    }

    /// First consumer, in registration order, whose history holds `name`.
    async fn find_owner(&self, name: &str) -> Option<(&Arc<dyn Consumer>, i64)> {
        for consumer in &self.consumers {
            match consumer.history_contains(name).await {
                Ok(Some(history_id)) => return Some((consumer, history_id)),
                Ok(None) => {}
                Err(e) => {
                    warn!(consumer = consumer.name(), error = %e, "History lookup failed");
                }
            }
        }
        None
    }
}
