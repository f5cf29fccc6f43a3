//! Library managers (Sonarr, Radarr, Lidarr) that consume completed downloads.
//!
//! The transfer manager only needs two things from a consumer: whether its
//! grab history contains a given release name, and a way to mark a history
//! record as failed so the manager searches for a replacement.

mod client;
pub mod fuzzy;
mod types;

pub use client::ArrClient;
pub use fuzzy::{names_match, normalize};
pub use types::*;
