//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator the
//! transfer manager talks to, so the control loop and pipelines can be
//! exercised without a debrid account, library managers or disk I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! use debridarr_core::testing::{fixtures, MockArchiveStore, MockConsumer, MockDebridClient};
//!
//! let debrid = MockDebridClient::new();
//! let store = MockArchiveStore::new();
//! let sonarr = MockConsumer::with_history("sonarr", vec![fixtures::history_record(1, "Show.S01")]);
//!
//! // Configure mock responses
//! debrid.set_items(vec![fixtures::folder_item("d1", "Show.S01")]);
//! store.fail_on("extract");
//! ```

mod mock_archive_store;
mod mock_consumer;
mod mock_debrid;

pub use mock_archive_store::{MockArchiveStore, StoreOp};
pub use mock_consumer::MockConsumer;
pub use mock_debrid::{MockDebridClient, MOCK_DOWNLOADS_FOLDER_ID};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::{Cursor, Write};

    use crate::arr::HistoryRecord;
    use crate::debrid::{Item, ItemKind, Transfer, TransferStatus};

    /// Create a remote transfer with the given status.
    pub fn transfer(id: &str, name: &str, status: TransferStatus) -> Transfer {
        Transfer {
            id: id.to_string(),
            name: name.to_string(),
            status,
            message: None,
            progress: None,
            kind: None,
        }
    }

    /// Create an errored remote transfer.
    pub fn errored_transfer(id: &str, name: &str) -> Transfer {
        let mut transfer = transfer(id, name, TransferStatus::Error);
        transfer.message = Some("Could not add torrent".to_string());
        transfer
    }

    pub fn folder_item(id: &str, name: &str) -> Item {
        Item::new(id, name, ItemKind::Folder)
    }

    pub fn file_item(id: &str, name: &str) -> Item {
        let mut item = Item::new(id, name, ItemKind::File);
        item.size_bytes = Some(1024 * 1024 * 700); // 700 MB
        item
    }

    /// An item whose kind the pipeline cannot handle.
    pub fn unknown_item(id: &str, name: &str) -> Item {
        Item::new(id, name, ItemKind::Unknown)
    }

    /// Create a grabbed history record.
    pub fn history_record(id: i64, source_title: &str) -> HistoryRecord {
        HistoryRecord {
            id,
            source_title: source_title.to_string(),
            event_type: Some("grabbed".to_string()),
        }
    }

    /// Build an in-memory zip archive holding `entries` (path, contents).
    pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
