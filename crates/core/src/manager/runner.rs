//! Transfer manager implementation.
//!
//! One loop task drives the ticks. Recovery attempts and download pipelines
//! are spawned detached: the loop never waits on them and stopping the loop
//! does not cancel them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock as SyncRwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::arr::Consumer;
use crate::debrid::{DebridClient, Item, Transfer};
use crate::downloads::{Admission, DownloadRegistry, DownloadSnapshot, DownloadWorker};
use crate::metrics;
use crate::recovery::ErrorRecoveryMatcher;
use crate::storage::ArchiveStore;

use super::config::TransferManagerConfig;
use super::types::{ManagerError, ManagerStatus, TickReport};

/// State shared between the manager handle and its loop task.
struct ManagerShared {
    config: SyncRwLock<TransferManagerConfig>,
    debrid: Arc<dyn DebridClient>,
    store: Arc<dyn ArchiveStore>,
    matcher: Arc<ErrorRecoveryMatcher>,
    registry: DownloadRegistry,

    /// Last transfer listing. Readers get copies.
    transfers: RwLock<Vec<Transfer>>,
    downloads_folder_id: Mutex<Option<String>>,
    busy: AtomicBool,
    last_updated: SyncRwLock<Option<DateTime<Utc>>>,
}

/// Clears the busy flag when a tick ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ManagerShared {
    fn config(&self) -> TransferManagerConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn tick(&self) -> TickReport {
        if self.busy.swap(true, Ordering::SeqCst) {
            debug!("Tick already in progress, skipping");
            return TickReport {
                skipped: true,
                ..Default::default()
            };
        }
        let _busy = BusyGuard(&self.busy);

        let mut report = TickReport::default();

        match self.refresh_transfers().await {
            Ok(transfers) => {
                report.transfers_refreshed = true;
                report.transfers_seen = transfers.len();
                for transfer in transfers.into_iter().filter(Transfer::is_errored) {
                    debug!(transfer = %transfer.name, id = %transfer.id, "Dispatching errored transfer");
                    self.matcher.spawn_recover(transfer);
                    report.errored_dispatched += 1;
                }
            }
            Err(e) => error!(error = %e, "Failed to refresh transfers"),
        }

        match self.list_ready_items().await {
            Ok(items) => {
                report.items_listed = true;
                report.items_seen = items.len();
                self.admit_items(items, &mut report);
            }
            Err(e) => error!(error = %e, "Failed to list downloads folder"),
        }

        *self
            .last_updated
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());

        let result = match (report.transfers_refreshed, report.items_listed) {
            (true, true) => "ok",
            (false, _) => "transfers_failed",
            (true, false) => "listing_failed",
        };
        metrics::POLL_TICKS.with_label_values(&[result]).inc();

        trace!(?report, "Tick finished");
        report
    }

    async fn refresh_transfers(&self) -> Result<Vec<Transfer>, ManagerError> {
        let transfers = self.debrid.list_transfers().await?;
        *self.transfers.write().await = transfers.clone();
        Ok(transfers)
    }

    async fn downloads_folder_id(&self) -> Result<String, ManagerError> {
        let mut cached = self.downloads_folder_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let id = self.debrid.resolve_downloads_folder_id().await?;
        info!(folder_id = %id, "Resolved downloads folder");
        *cached = Some(id.clone());
        Ok(id)
    }

    async fn list_ready_items(&self) -> Result<Vec<Item>, ManagerError> {
        let folder_id = self.downloads_folder_id().await?;
        Ok(self.debrid.list_folder(Some(&folder_id)).await?)
    }

    /// Admit items in listing order until the cap is reached.
    fn admit_items(&self, items: Vec<Item>, report: &mut TickReport) {
        let worker = DownloadWorker::new(
            Arc::clone(&self.debrid),
            Arc::clone(&self.store),
            self.config().downloads_dir,
        );

        let total = items.len();
        for (index, item) in items.into_iter().enumerate() {
            match self.registry.try_admit(&item.name) {
                Admission::Admitted(slot) => {
                    report.admitted += 1;
                    worker.spawn(item, slot);
                }
                Admission::Duplicate => {
                    trace!(item = %item.name, "Already downloading");
                    report.duplicates += 1;
                }
                Admission::AtCapacity => {
                    report.deferred = total - index;
                    metrics::DOWNLOADS_DEFERRED.inc_by(report.deferred as u64);
                    debug!(
                        deferred = report.deferred,
                        capacity = self.registry.capacity(),
                        "Download cap reached"
                    );
                    break;
                }
            }
        }
    }
}

/// The transfer manager - polls the debrid service and starts downloads.
pub struct TransferManager {
    shared: Arc<ManagerShared>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TransferManager {
    /// Create a new manager. `consumers` are consulted in order when
    /// recovering errored transfers.
    pub fn new(
        config: TransferManagerConfig,
        debrid: Arc<dyn DebridClient>,
        consumers: Vec<Arc<dyn Consumer>>,
        store: Arc<dyn ArchiveStore>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = DownloadRegistry::new(config.simultaneous_downloads);
        let matcher = Arc::new(ErrorRecoveryMatcher::new(consumers, Arc::clone(&debrid)));

        Self {
            shared: Arc::new(ManagerShared {
                config: SyncRwLock::new(config),
                debrid,
                store,
                matcher,
                registry,
                transfers: RwLock::new(Vec::new()),
                downloads_folder_id: Mutex::new(None),
                busy: AtomicBool::new(false),
                last_updated: SyncRwLock::new(None),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Handle to the in-flight download registry.
    pub fn registry(&self) -> &DownloadRegistry {
        &self.shared.registry
    }

    /// Clear the scratch root and start the poll loop.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Transfer manager already running");
            return;
        }

        info!(
            consumers = ?self.shared.matcher.consumer_names(),
            "Starting transfer manager"
        );

        if let Err(e) = self.clear_scratch_root().await {
            error!(error = %e, "Failed to clear scratch directory");
        }

        self.spawn_poll_loop();
    }

    /// Stop the poll loop after its current tick.
    ///
    /// Running downloads and recovery attempts are left to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Transfer manager not running");
            return;
        }

        info!("Stopping transfer manager");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn spawn_poll_loop(&self) {
        let shared = Arc::clone(&self.shared);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Poll loop started");
            while running.load(Ordering::Relaxed) {
                shared.tick().await;

                let interval = Duration::from_millis(shared.config().poll_interval_ms);
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Poll loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            info!("Poll loop stopped");
        });
    }

    /// Run one iteration of the loop: refresh transfers, dispatch errored
    /// ones for recovery, admit ready items.
    pub async fn tick(&self) -> TickReport {
        self.shared.tick().await
    }

    pub fn status(&self) -> ManagerStatus {
        ManagerStatus {
            running: self.is_running(),
            busy: self.shared.busy.load(Ordering::Relaxed),
            last_updated: *self
                .shared
                .last_updated
                .read()
                .unwrap_or_else(PoisonError::into_inner),
            active_downloads: self.shared.registry.count(),
            simultaneous_downloads: self.shared.registry.capacity(),
            poll_interval_ms: self.shared.config().poll_interval_ms,
        }
    }

    /// Copy of the last transfer listing.
    pub async fn transfers(&self) -> Vec<Transfer> {
        self.shared.transfers.read().await.clone()
    }

    /// In-flight downloads, oldest first.
    pub fn downloads(&self) -> Vec<DownloadSnapshot> {
        self.shared.registry.snapshot()
    }

    pub fn config(&self) -> TransferManagerConfig {
        self.shared.config()
    }

    /// Remove leftovers of earlier runs from the scratch root.
    pub async fn clear_scratch_root(&self) -> Result<(), ManagerError> {
        self.shared.store.clear_scratch_root().await?;
        Ok(())
    }

    /// Apply a new configuration.
    ///
    /// The cap and poll interval take effect on the next tick. A changed
    /// scratch root is cleared before use.
    pub async fn config_updated(
        &self,
        old: &TransferManagerConfig,
        new: &TransferManagerConfig,
    ) -> Result<(), ManagerError> {
        if new.scratch_overlaps_library() {
            return Err(ManagerError::InvalidConfig(
                "unzip_dir and downloads_dir must not contain each other".to_string(),
            ));
        }

        *self
            .shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = new.clone();

        if old.simultaneous_downloads != new.simultaneous_downloads {
            info!(
                from = old.simultaneous_downloads,
                to = new.simultaneous_downloads,
                "Download cap changed"
            );
            self.shared.registry.set_capacity(new.simultaneous_downloads);
        }

        if old.unzip_dir != new.unzip_dir {
            info!(unzip_dir = %new.unzip_dir.display(), "Scratch directory changed");
            self.shared.store.set_scratch_root(new.unzip_dir.clone());
            self.clear_scratch_root().await?;
        }

        Ok(())
    }
}
