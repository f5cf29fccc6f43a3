//! Mock debrid client for testing.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::debrid::{DebridClient, DebridError, Item, Transfer, TransferStatus};

/// Id the mock reports for the downloads folder.
pub const MOCK_DOWNLOADS_FOLDER_ID: &str = "downloads-folder";

#[derive(Debug)]
struct MockDebridState {
    transfers: Vec<Transfer>,
    items: Vec<Item>,
    calls: Vec<String>,
    failing: HashSet<String>,
    next_error: Option<DebridError>,
    link_base: String,
}

/// Mock implementation of the DebridClient trait.
///
/// Provides controllable behavior for testing:
/// - Serve a fixed transfer list and downloads folder listing
/// - Record every call as `"operation:argument"`
/// - Fail specific operations, persistently or once
///
/// # Example
///
/// ```rust,ignore
/// let debrid = MockDebridClient::new();
/// debrid.set_items(vec![fixtures::folder_item("d1", "Show.S01")]);
/// debrid.fail_on("delete_folder");
///
/// // ... run a tick ...
///
/// assert!(debrid.calls().contains(&"delete_file:d1".to_string()));
/// ```
#[derive(Debug)]
pub struct MockDebridClient {
    state: Mutex<MockDebridState>,
}

impl Default for MockDebridClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDebridClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockDebridState {
                transfers: Vec::new(),
                items: Vec::new(),
                calls: Vec::new(),
                failing: HashSet::new(),
                next_error: None,
                link_base: "https://mock.debrid/zip".to_string(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockDebridState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_transfers(&self, transfers: Vec<Transfer>) {
        self.state().transfers = transfers;
    }

    /// Contents of the downloads folder.
    pub fn set_items(&self, items: Vec<Item>) {
        self.state().items = items;
    }

    pub fn items(&self) -> Vec<Item> {
        self.state().items.clone()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.state().transfers.clone()
    }

    /// Links are generated as `{base}/{item_id}.zip`.
    pub fn set_link_base(&self, base: impl Into<String>) {
        self.state().link_base = base.into();
    }

    /// Make every call to `operation` fail until cleared.
    pub fn fail_on(&self, operation: &str) {
        self.state().failing.insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// Configure the next call to fail with the given error.
    pub fn set_next_error(&self, error: DebridError) {
        self.state().next_error = Some(error);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Recorded calls to `operation`, argument only.
    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{}:", operation);
        self.state()
            .calls
            .iter()
            .filter_map(|call| call.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Record the call and return an injected error, if any.
    fn record(&self, operation: &str, argument: &str) -> Result<(), DebridError> {
        let mut state = self.state();
        state.calls.push(format!("{}:{}", operation, argument));
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        if state.failing.contains(operation) {
            return Err(DebridError::Api(format!("injected {} failure", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl DebridClient for MockDebridClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_transfers(&self) -> Result<Vec<Transfer>, DebridError> {
        self.record("list_transfers", "")?;
        Ok(self.state().transfers.clone())
    }

    async fn update_transfer_status(
        &self,
        transfer_id: &str,
        status: TransferStatus,
    ) -> Result<(), DebridError> {
        self.record("update_transfer_status", transfer_id)?;
        if let Some(transfer) = self
            .state()
            .transfers
            .iter_mut()
            .find(|t| t.id == transfer_id)
        {
            transfer.status = status;
        }
        Ok(())
    }

    async fn delete_transfer(&self, transfer_id: &str) -> Result<(), DebridError> {
        self.record("delete_transfer", transfer_id)?;
        self.state().transfers.retain(|t| t.id != transfer_id);
        Ok(())
    }

    async fn list_folder(&self, folder_id: Option<&str>) -> Result<Vec<Item>, DebridError> {
        self.record("list_folder", folder_id.unwrap_or(""))?;
        Ok(self.state().items.clone())
    }

    async fn generate_file_link(&self, item_id: &str) -> Result<String, DebridError> {
        self.record("generate_file_link", item_id)?;
        Ok(format!("{}/{}.zip", self.state().link_base, item_id))
    }

    async fn generate_folder_link(&self, item_id: &str) -> Result<String, DebridError> {
        self.record("generate_folder_link", item_id)?;
        Ok(format!("{}/{}.zip", self.state().link_base, item_id))
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), DebridError> {
        self.record("delete_folder", folder_id)?;
        self.state().items.retain(|i| i.id != folder_id);
        Ok(())
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), DebridError> {
        self.record("delete_file", file_id)?;
        self.state().items.retain(|i| i.id != file_id);
        Ok(())
    }

    async fn resolve_downloads_folder_id(&self) -> Result<String, DebridError> {
        self.record("resolve_downloads_folder_id", "")?;
        Ok(MOCK_DOWNLOADS_FOLDER_ID.to_string())
    }
}
