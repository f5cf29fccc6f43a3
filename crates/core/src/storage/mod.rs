//! Local storage for downloaded archives.
//!
//! This module provides the `ArchiveStore` trait and a local filesystem
//! implementation covering everything the download pipeline does on disk:
//!
//! - Allocating a scratch directory per download under the scratch root
//! - Streaming a remote archive into it with progress reporting
//! - Extracting the archive into the library directory
//! - Removing the archive afterwards
//! - Clearing leftovers from the scratch root

mod config;
mod error;
mod fs_store;
mod traits;

pub use config::StorageConfig;
pub use error::StorageError;
pub use fs_store::{archive_file_name, FsArchiveStore};
pub use traits::ArchiveStore;
