//! Local materialization of ready remote items.
//!
//! - [`DownloadRegistry`] admits items atomically (dedup by name, bounded
//!   by the configured cap) and hands out [`DownloadSlot`]s.
//! - [`DownloadWorker`] runs one item's pipeline in the background and
//!   gives its slot back on every exit path.

mod progress;
mod registry;
mod worker;

pub use progress::DownloadProgress;
pub use registry::{Admission, DownloadDetails, DownloadRegistry, DownloadSlot, DownloadSnapshot};
pub use worker::{DownloadOutcome, DownloadWorker, WorkerError};
