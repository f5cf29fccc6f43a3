//! Reconciliation of errored remote transfers with library manager history.

mod matcher;

pub use matcher::{ErrorRecoveryMatcher, RecoveryOutcome};
