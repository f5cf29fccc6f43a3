use std::sync::Arc;
use debridarr_core::{Config, SanitizedConfig, TransferManager};

/// Shared application state
pub struct AppState {
    config: Config,
    manager: Arc<TransferManager>,
}

impl AppState {
    pub fn new(config: Config, manager: Arc<TransferManager>) -> Self {
        Self { config, manager }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn manager(&self) -> &TransferManager {
        self.manager.as_ref()
    }
}
