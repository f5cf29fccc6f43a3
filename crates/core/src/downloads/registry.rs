//! Registry of in-flight downloads with atomic admission control.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use super::progress::DownloadProgress;

/// One in-flight local materialization.
#[derive(Debug, Clone)]
pub struct DownloadDetails {
    /// Distinguishes successive admissions under the same name.
    pub id: Uuid,
    pub name: String,
    pub added_at: DateTime<Utc>,
    pub progress: Arc<DownloadProgress>,
}

/// Point-in-time view of a download, safe to hand to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadSnapshot {
    pub name: String,
    pub added_at: DateTime<Utc>,
    pub downloaded_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Fraction complete, when the total is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl From<&DownloadDetails> for DownloadSnapshot {
    fn from(details: &DownloadDetails) -> Self {
        Self {
            name: details.name.clone(),
            added_at: details.added_at,
            downloaded_bytes: details.progress.downloaded(),
            total_bytes: details.progress.total(),
            progress: details.progress.fraction(),
        }
    }
}

/// Outcome of an admission attempt.
#[derive(Debug)]
pub enum Admission {
    /// Entry created; the slot releases it when dropped.
    Admitted(DownloadSlot),
    /// An entry with this name already exists.
    Duplicate,
    /// The registry is full.
    AtCapacity,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

#[derive(Debug)]
struct RegistryInner {
    capacity: AtomicUsize,
    entries: Mutex<HashMap<String, DownloadDetails>>,
}

/// Mapping of item name to in-flight download, keyed for deduplication.
///
/// The map is only reachable through atomic operations: admission checks for
/// a duplicate, checks capacity and inserts under a single lock. Cloning the
/// registry yields another handle to the same map.
#[derive(Debug, Clone)]
pub struct DownloadRegistry {
    inner: Arc<RegistryInner>,
}

impl DownloadRegistry {
    /// Create a registry admitting at most `capacity` concurrent downloads.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                capacity: AtomicUsize::new(capacity),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity.load(Ordering::SeqCst)
    }

    /// Change the cap. Running downloads above a lowered cap are not evicted.
    pub fn set_capacity(&self, capacity: usize) {
        self.inner.capacity.store(capacity, Ordering::SeqCst);
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, DownloadDetails>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit `name` if it is not already downloading and a slot is free.
    pub fn try_admit(&self, name: &str) -> Admission {
        let mut entries = self.entries();

        if entries.contains_key(name) {
            return Admission::Duplicate;
        }
        if entries.len() >= self.capacity() {
            return Admission::AtCapacity;
        }

        let details = DownloadDetails {
            id: Uuid::new_v4(),
            name: name.to_string(),
            added_at: Utc::now(),
            progress: Arc::new(DownloadProgress::new()),
        };
        let slot = DownloadSlot {
            registry: self.clone(),
            name: details.name.clone(),
            id: details.id,
            progress: Arc::clone(&details.progress),
        };
        entries.insert(details.name.clone(), details);

        Admission::Admitted(slot)
    }

    /// Remove the entry for `name`. Returns whether one was present.
    pub fn release(&self, name: &str) -> bool {
        self.entries().remove(name).is_some()
    }

    /// Remove the entry for `name` only if it is still the admission `id`.
    fn release_admission(&self, name: &str, id: Uuid) -> bool {
        let mut entries = self.entries();
        match entries.get(name) {
            Some(details) if details.id == id => {
                entries.remove(name);
                true
            }
            _ => false,
        }
    }

    pub fn count(&self) -> usize {
        self.entries().len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().contains_key(name)
    }

    /// Copy of all in-flight downloads, oldest first.
    pub fn snapshot(&self) -> Vec<DownloadSnapshot> {
        let mut snapshots: Vec<DownloadSnapshot> =
            self.entries().values().map(DownloadSnapshot::from).collect();
        snapshots.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.name.cmp(&b.name)));
        snapshots
    }
}

/// Ownership of one registry entry.
///
/// Dropping the slot removes the entry it was issued for, exactly once, on
/// every exit path of the owning task.
#[derive(Debug)]
pub struct DownloadSlot {
    registry: DownloadRegistry,
    name: String,
    id: Uuid,
    progress: Arc<DownloadProgress>,
}

impl DownloadSlot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn progress(&self) -> &Arc<DownloadProgress> {
        &self.progress
    }
}

impl Drop for DownloadSlot {
    fn drop(&mut self) {
        if self.registry.release_admission(&self.name, self.id) {
            trace!(name = %self.name, "Released download slot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn admit(registry: &DownloadRegistry, name: &str) -> DownloadSlot {
        match registry.try_admit(name) {
            Admission::Admitted(slot) => slot,
            other => panic!("Expected admission for {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_admit_and_release_on_drop() {
        let registry = DownloadRegistry::new(2);
        let slot = admit(&registry, "Show.S01");
        assert_eq!(registry.count(), 1);
        assert!(registry.contains("Show.S01"));
        assert_eq!(slot.name(), "Show.S01");

        drop(slot);
        assert_eq!(registry.count(), 0);
        assert!(!registry.contains("Show.S01"));
    }

    #[test]
    fn test_duplicate_rejected_regardless_of_capacity() {
        let registry = DownloadRegistry::new(5);
        let _slot = admit(&registry, "Album X");
        assert!(matches!(registry.try_admit("Album X"), Admission::Duplicate));
        assert_eq!(registry.count(), 1);

        let full = DownloadRegistry::new(1);
        let _slot = admit(&full, "Album X");
        assert!(matches!(full.try_admit("Album X"), Admission::Duplicate));
    }

    #[test]
    fn test_capacity_enforced_until_release() {
        let registry = DownloadRegistry::new(2);
        let first = admit(&registry, "a");
        let _second = admit(&registry, "b");

        assert!(matches!(registry.try_admit("c"), Admission::AtCapacity));
        assert_eq!(registry.count(), 2);

        drop(first);
        assert!(registry.try_admit("c").is_admitted());
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = DownloadRegistry::new(1);
        let slot = admit(&registry, "a");
        assert!(registry.release("a"));
        assert!(!registry.release("a"));
        drop(slot);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_stale_slot_does_not_evict_newer_admission() {
        let registry = DownloadRegistry::new(2);
        let stale = admit(&registry, "a");
        registry.release("a");

        let fresh = admit(&registry, "a");
        drop(stale);
        assert!(registry.contains("a"));

        drop(fresh);
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_concurrent_admission_same_name_admits_once() {
        let registry = DownloadRegistry::new(8);
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.try_admit("Album X")
                })
            })
            .collect();

        let outcomes: Vec<Admission> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let admitted = outcomes.iter().filter(|a| a.is_admitted()).count();
        assert_eq!(admitted, 1);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_concurrent_admission_never_exceeds_capacity() {
        let registry = DownloadRegistry::new(3);
        let barrier = Arc::new(Barrier::new(20));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let registry = registry.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.try_admit(&format!("item-{}", i))
                })
            })
            .collect();

        let outcomes: Vec<Admission> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let admitted = outcomes.iter().filter(|a| a.is_admitted()).count();
        assert_eq!(admitted, 3);
        assert_eq!(registry.count(), 3);
    }

    #[test]
    fn test_lowered_capacity_blocks_new_admissions() {
        let registry = DownloadRegistry::new(3);
        let _a = admit(&registry, "a");
        let _b = admit(&registry, "b");
        registry.set_capacity(1);
        assert!(matches!(registry.try_admit("c"), Admission::AtCapacity));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_snapshot_reports_progress() {
        let registry = DownloadRegistry::new(2);
        let slot = admit(&registry, "Show.S01");
        slot.progress().set_total(1000);
        slot.progress().add(250);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "Show.S01");
        assert_eq!(snapshot[0].downloaded_bytes, 250);
        assert_eq!(snapshot[0].total_bytes, Some(1000));
        assert_eq!(snapshot[0].progress, Some(0.25));
    }

    #[test]
    fn test_snapshot_without_total_has_no_progress() {
        let registry = DownloadRegistry::new(1);
        let slot = admit(&registry, "Album X");
        slot.progress().add(10);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].total_bytes, None);
        assert_eq!(snapshot[0].progress, None);

        let json = serde_json::to_value(&snapshot[0]).unwrap();
        assert!(json.get("progress").is_none());
    }
}
