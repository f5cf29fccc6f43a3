//! Transfer manager: the polling loop tying the debrid service, the library
//! managers and local storage together.
//!
//! Each tick runs on the loop task, in order:
//! - **Refresh**: replace the transfer snapshot from the debrid service
//! - **Recover**: hand every errored transfer to the recovery matcher (detached)
//! - **Admit**: list the downloads folder and start a worker per admitted item (detached)

mod config;
mod runner;
mod types;

pub use config::TransferManagerConfig;
pub use runner::TransferManager;
pub use types::{ManagerError, ManagerStatus, TickReport};
