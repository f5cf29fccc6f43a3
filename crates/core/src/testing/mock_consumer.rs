//! Mock library manager for testing.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::arr::{names_match, ArrError, Consumer, HistoryRecord};

#[derive(Debug, Default)]
struct MockConsumerState {
    history: Vec<HistoryRecord>,
    lookups: Vec<String>,
    marked_failed: Vec<i64>,
    fail_lookups: bool,
    fail_marks: bool,
}

/// Mock implementation of the Consumer trait.
///
/// Matches names against its history with the same fuzzy rules as the real
/// clients, and records every lookup and every record marked failed.
#[derive(Debug)]
pub struct MockConsumer {
    name: String,
    state: Mutex<MockConsumerState>,
}

impl MockConsumer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MockConsumerState::default()),
        }
    }

    /// Create a consumer whose history holds the given records.
    pub fn with_history(name: impl Into<String>, history: Vec<HistoryRecord>) -> Self {
        let consumer = Self::new(name);
        consumer.state().history = history;
        consumer
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockConsumerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_history(&self, record: HistoryRecord) {
        self.state().history.push(record);
    }

    /// Make history lookups fail.
    pub fn fail_lookups(&self, fail: bool) {
        self.state().fail_lookups = fail;
    }

    /// Make marking records failed fail.
    pub fn fail_marks(&self, fail: bool) {
        self.state().fail_marks = fail;
    }

    /// Names passed to `history_contains`, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.state().lookups.clone()
    }

    /// History ids passed to `mark_history_failed`, in order.
    pub fn marked_failed(&self) -> Vec<i64> {
        self.state().marked_failed.clone()
    }
}

#[async_trait]
impl Consumer for MockConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn history_contains(&self, candidate: &str) -> Result<Option<i64>, ArrError> {
        let mut state = self.state();
        state.lookups.push(candidate.to_string());
        if state.fail_lookups {
            return Err(ArrError::ConnectionFailed("injected lookup failure".to_string()));
        }
        Ok(state
            .history
            .iter()
            .find(|record| names_match(&record.source_title, candidate))
            .map(|record| record.id))
    }

    async fn mark_history_failed(&self, history_id: i64) -> Result<(), ArrError> {
        let mut state = self.state();
        state.marked_failed.push(history_id);
        if state.fail_marks {
            return Err(ArrError::Api("injected mark failure".to_string()));
        }
        Ok(())
    }
}
