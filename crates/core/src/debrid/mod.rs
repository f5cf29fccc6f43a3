//! Debrid service abstraction.
//!
//! This module provides a `DebridClient` trait for the remote cloud-download
//! service: listing and deleting transfers, browsing the cloud folder tree,
//! generating download links and removing items once materialized locally.

mod premiumize;
mod types;

pub use premiumize::PremiumizeClient;
pub use types::*;
